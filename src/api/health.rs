//! Service endpoints
//!
//! - GET /       - banner
//! - GET /test   - store diagnostics
//! - GET /health - liveness for load balancers
//! - GET /schema - record schema listing

use crate::api::AppState;
use crate::error::ApiError;
use crate::schema::RegistryInfo;
use axum::{extract::State, Json};
use serde::Serialize;

/// Collections listed by the diagnostic endpoint at most
const DIAGNOSTIC_COLLECTION_LIMIT: usize = 10;

/// Store error text shown by the diagnostic endpoint at most
const DIAGNOSTIC_ERROR_CHARS: usize = 50;

#[derive(Serialize)]
pub struct RootResponse {
    message: String,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Bayanihan Relief API Running".to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct DiagnosticResponse {
    pub backend: String,
    pub database: String,
    pub database_url: String,
    pub database_name: String,
    pub connection_status: String,
    pub collections: Vec<String>,
}

/// Reports store connectivity. Never fails: problems are described in the body.
pub async fn test_database(State(state): State<AppState>) -> Json<DiagnosticResponse> {
    let mut response = DiagnosticResponse {
        backend: "✅ Running".to_string(),
        database: "❌ Not Available".to_string(),
        database_url: set_marker(state.config.database_url_from_env),
        database_name: set_marker(state.config.database_name.is_some()),
        connection_status: "Not Connected".to_string(),
        collections: Vec::new(),
    };

    match &state.store {
        Some(store) => {
            response.database = "✅ Available".to_string();
            response.connection_status = "Connected".to_string();

            match store.list_collections().await {
                Ok(mut collections) => {
                    collections.truncate(DIAGNOSTIC_COLLECTION_LIMIT);
                    response.collections = collections;
                    response.database = "✅ Connected & Working".to_string();
                }
                Err(ApiError::StoreUnavailable { cause }) => {
                    response.connection_status = "Not Connected".to_string();
                    response.database = format!("❌ Error: {}", truncate_cause(&cause));
                }
                Err(e) => {
                    response.database =
                        format!("⚠️  Connected but Error: {}", truncate_cause(&e.to_string()));
                }
            }
        }
        None => {
            response.database = "⚠️  Available but not initialized".to_string();
        }
    }

    Json(response)
}

fn truncate_cause(cause: &str) -> String {
    cause.chars().take(DIAGNOSTIC_ERROR_CHARS).collect()
}

fn set_marker(is_set: bool) -> String {
    if is_set {
        "✅ Set".to_string()
    } else {
        "❌ Not Set".to_string()
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    store_connected: bool,
    uptime_seconds: u64,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_connected = match &state.store {
        Some(store) => store.ping().await.is_ok(),
        None => false,
    };

    Json(HealthResponse {
        status: if store_connected {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        store_connected,
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

pub async fn describe_schema(State(state): State<AppState>) -> Json<RegistryInfo> {
    Json(state.registry.describe())
}
