mod health;
mod records;

pub use health::{describe_schema, health_check, root, test_database, DiagnosticResponse};
pub use records::{create_record, list_records, CreatedResponse, ListQuery};

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::schema::{Disaster, Donation, SchemaRegistry, Volunteer};
use crate::store::DocumentStore;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// `None` when no usable store URL was configured
    pub store: Option<Arc<dyn DocumentStore>>,
    pub registry: Arc<SchemaRegistry>,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, store: Option<Arc<dyn DocumentStore>>) -> Self {
        Self {
            store,
            registry: Arc::new(SchemaRegistry::new(config.validation_mode)),
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> Result<&Arc<dyn DocumentStore>> {
        self.store.as_ref().ok_or_else(|| ApiError::StoreUnavailable {
            cause: "no database connection".to_string(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/", get(root))
        .route("/test", get(test_database))
        .route("/health", get(health_check))
        .route("/schema", get(describe_schema))
        .route(
            "/api/disasters",
            post(create_record::<Disaster>).get(list_records::<Disaster>),
        )
        .route(
            "/api/donations",
            post(create_record::<Donation>).get(list_records::<Donation>),
        )
        .route(
            "/api/volunteers",
            post(create_record::<Volunteer>).get(list_records::<Volunteer>),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValidationMode;
    use crate::store::{Document, MemoryDocumentStore};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::util::ServiceExt;

    fn memory_app() -> Router {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new("relief"));
        router(AppState::new(Config::default(), Some(store)))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Counts writes and fails every one of them
    struct BrokenStore {
        writes: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }

        async fn create_document(&self, collection: &str, _document: Document) -> Result<Document> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::Persistence {
                collection: collection.to_string(),
                cause: "disk full".to_string(),
            })
        }

        async fn get_documents(
            &self,
            _collection: &str,
            _filter: &Document,
            _limit: u32,
        ) -> Result<Vec<Document>> {
            Ok(Vec::new())
        }

        async fn list_collections(&self) -> Result<Vec<String>> {
            Err(ApiError::QueryFailed {
                collection: "information_schema.columns".to_string(),
                cause: "permission denied".to_string(),
            })
        }

        async fn ping(&self) -> Result<()> {
            Err(ApiError::StoreUnavailable {
                cause: "down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_root_endpoint() {
        let app = memory_app();
        let (status, body) = send(&app, get_request("/")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Bayanihan Relief API Running");
    }

    #[tokio::test]
    async fn test_donation_create_then_list() {
        let app = memory_app();

        let (status, created) = send(
            &app,
            post_json(
                "/api/donations",
                json!({"name": "Ana", "email": "a@x.com", "type": "money", "amount": 50}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["message"], "Donation received. Thank you!");
        let id = created["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        let (status, listed) = send(&app, get_request("/api/donations")).await;
        assert_eq!(status, StatusCode::OK);

        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["id"], id.as_str());
        assert_eq!(listed[0]["amount"].as_f64(), Some(50.0));
        assert_eq!(listed[0]["name"], "Ana");
        assert_eq!(listed[0]["type"], "money");
        assert!(listed[0].get("_id").is_none());
    }

    #[tokio::test]
    async fn test_volunteer_missing_name_rejected() {
        let app = memory_app();

        let (status, body) = send(
            &app,
            post_json("/api/volunteers", json!({"email": "v@x.com", "skills": ["first aid"]})),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.get("id").is_none());
        assert_eq!(body["violations"][0]["field"], "name");
        assert_eq!(body["violations"][0]["kind"], "missing");

        let (_, listed) = send(&app, get_request("/api/volunteers")).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn test_disaster_defaults_visible_in_listing() {
        let app = memory_app();

        let (status, created) = send(
            &app,
            post_json(
                "/api/disasters",
                json!({
                    "title": "Typhoon Carina",
                    "description": "Flooding in Metro Manila",
                    "location": "Marikina",
                    "severity": "critical"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["message"], "Disaster created");

        let (_, listed) = send(&app, get_request("/api/disasters")).await;
        assert_eq!(listed[0]["status"], "ongoing");
        assert!(listed[0]["date"].is_string());
        assert_eq!(listed[0]["id"], created["id"]);
    }

    #[tokio::test]
    async fn test_listing_limit() {
        let app = memory_app();

        for i in 0..4 {
            let (status, _) = send(
                &app,
                post_json(
                    "/api/volunteers",
                    json!({"name": format!("V{}", i), "email": "v@x.com"}),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, listed) = send(&app, get_request("/api/volunteers?limit=2")).await;
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["name"], "V0");

        let (_, listed) = send(&app, get_request("/api/volunteers?limit=0")).await;
        assert_eq!(listed, json!([]));

        let (status, body) = send(&app, get_request("/api/volunteers?limit=-3")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["violations"][0]["field"], "limit");

        let (status, body) = send(&app, get_request("/api/volunteers?limit=many")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_empty_listing_is_not_an_error() {
        let app = memory_app();
        let (status, body) = send(&app, get_request("/api/disasters")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let app = memory_app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/donations")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\": "))
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["violations"][0]["kind"], "invalid_body");
    }

    #[tokio::test]
    async fn test_without_store() {
        let app = router(AppState::new(Config::default(), None));

        let (status, body) = send(
            &app,
            post_json("/api/donations", json!({"name": "Ana", "email": "a@x.com", "type": "food"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "store_unavailable");

        let (status, _) = send(&app, get_request("/api/donations")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = send(&app, get_request("/test")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["backend"], "✅ Running");
        assert_eq!(body["connection_status"], "Not Connected");
        assert_eq!(body["database_url"], "❌ Not Set");
        assert_eq!(body["database_name"], "❌ Not Set");

        let (_, body) = send(&app, get_request("/health")).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["store_connected"], false);
    }

    #[tokio::test]
    async fn test_diagnostics_with_memory_store() {
        let config = Config {
            database_url: Some("memory://".to_string()),
            database_url_from_env: true,
            ..Config::default()
        };
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::default());
        let app = router(AppState::new(config, Some(store)));

        send(
            &app,
            post_json("/api/volunteers", json!({"name": "Jo", "email": "j@x.com"})),
        )
        .await;

        let (status, body) = send(&app, get_request("/test")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "✅ Connected & Working");
        assert_eq!(body["connection_status"], "Connected");
        assert_eq!(body["database_url"], "✅ Set");
        assert_eq!(body["collections"], json!(["volunteer"]));

        let (_, body) = send(&app, get_request("/health")).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unreachable_database_reported_per_request() {
        let config = Config::from_lookup(|key| match key {
            "DB_HOST" => Some("127.0.0.1".to_string()),
            "DB_PORT" => Some("1".to_string()),
            _ => None,
        })
        .unwrap();
        let store = crate::store::connect(&config).await;
        assert!(store.is_some());
        let app = router(AppState::new(config, store));

        let (status, body) = send(
            &app,
            post_json("/api/donations", json!({"name": "Ana", "email": "a@x.com", "type": "food"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "store_unavailable");

        let (status, body) = send(&app, get_request("/test")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connection_status"], "Not Connected");
        assert!(body["database"].as_str().unwrap().starts_with("❌ Error: "));
        // Assembled from DB_* parts, so DATABASE_URL itself is unset
        assert_eq!(body["database_url"], "❌ Not Set");

        let (_, body) = send(&app, get_request("/health")).await;
        assert_eq!(body["store_connected"], false);
    }

    #[tokio::test]
    async fn test_store_failures_surface_immediately() {
        let store = Arc::new(BrokenStore {
            writes: AtomicUsize::new(0),
        });
        let app = router(AppState::new(
            Config::default(),
            Some(store.clone() as Arc<dyn DocumentStore>),
        ));

        // Invalid input never reaches the store
        let (status, _) = send(&app, post_json("/api/donations", json!({"name": "Ana"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);

        let (status, body) = send(
            &app,
            post_json("/api/donations", json!({"name": "Ana", "email": "a@x.com", "type": "food"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "persistence_failed");
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);

        let (_, body) = send(&app, get_request("/test")).await;
        let database = body["database"].as_str().unwrap();
        assert!(database.starts_with("⚠️  Connected but Error: "));
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_unknown_severity() {
        let config = Config {
            validation_mode: ValidationMode::Strict,
            ..Config::default()
        };
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::default());
        let app = router(AppState::new(config, Some(store)));

        let (status, body) = send(
            &app,
            post_json(
                "/api/disasters",
                json!({
                    "title": "Quake",
                    "description": "M6.8",
                    "location": "Davao",
                    "severity": "apocalyptic"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["violations"][0]["kind"], "not_allowed");
    }

    #[tokio::test]
    async fn test_schema_listing() {
        let app = memory_app();
        let (status, body) = send(&app, get_request("/schema")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records"][2]["name"], "Volunteer");
        assert_eq!(body["records"][2]["fields"][3]["type"], "string_list");
    }

    #[tokio::test]
    async fn test_cors_preflight_allowed() {
        let app = memory_app();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/donations")
            .header(header::ORIGIN, "https://relief.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }
}
