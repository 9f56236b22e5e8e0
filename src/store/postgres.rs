//! PostgreSQL document store
//!
//! Each collection is a table of JSONB documents:
//!
//! ```sql
//! CREATE TABLE "<collection>" (
//!     seq        BIGSERIAL PRIMARY KEY,      -- insertion order
//!     _id        TEXT NOT NULL UNIQUE,       -- store-generated identifier
//!     doc        JSONB NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL
//! )
//! ```
//!
//! Tables are created on first insert. Reading a collection that has no
//! table yet yields no documents.

use super::{Document, DocumentStore, RAW_ID_FIELD};
use crate::error::{describe_pg_error, ApiError, Result};
use async_trait::async_trait;
use dashmap::DashSet;
use deadpool_postgres::{Config as PoolConfig, Object, Pool, Runtime};
use serde_json::Value;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::NoTls;
use tracing::{debug, info, warn};

pub struct PgDocumentStore {
    pool: Pool,
    database: String,
    /// Collections whose table is known to exist
    ensured: DashSet<String>,
}

impl PgDocumentStore {
    /// Build the store without touching the network. Connections are opened
    /// by the pool on demand, so a database that comes up later is picked up.
    pub fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = create_pool(database_url, max_connections)?;

        Ok(Self {
            pool,
            database: database_name(database_url),
            ensured: DashSet::new(),
        })
    }

    /// Build the store and ping it once. An unreachable database is logged,
    /// not returned: every later call retries through the pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let store = Self::new(database_url, max_connections)?;

        match store.ping().await {
            Ok(()) => info!("Connected to PostgreSQL database: {}", store.database),
            Err(e) => warn!(
                "PostgreSQL database '{}' not reachable yet, retrying per request: {}",
                store.database, e
            ),
        }

        Ok(store)
    }

    async fn client(&self) -> Result<Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    async fn ensure_collection(&self, client: &Object, collection: &str) -> Result<()> {
        if self.ensured.contains(collection) {
            return Ok(());
        }

        match client.batch_execute(&create_collection_sql(collection)).await {
            Ok(()) => {}
            // Another request created the table between our check and our DDL
            Err(e) if lost_create_race(e.code()) => {
                debug!("Collection {} created concurrently", collection);
            }
            Err(e) => {
                return Err(ApiError::Persistence {
                    collection: collection.to_string(),
                    cause: format!("Failed to create collection: {}", describe_pg_error(&e)),
                })
            }
        }

        self.ensured.insert(collection.to_string());
        debug!("Ensured collection table: {}", collection);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn name(&self) -> &str {
        &self.database
    }

    async fn create_document(&self, collection: &str, mut document: Document) -> Result<Document> {
        check_collection_name(collection)?;

        let client = self.client().await?;
        self.ensure_collection(&client, collection).await?;

        let body = Value::Object(document.clone());
        let row = client
            .query_one(&insert_sql(collection), &[&body])
            .await
            .map_err(|e| ApiError::Persistence {
                collection: collection.to_string(),
                cause: describe_pg_error(&e),
            })?;

        let id: String = row.get(0);
        document.insert(RAW_ID_FIELD.to_string(), Value::String(id));

        Ok(document)
    }

    async fn get_documents(
        &self,
        collection: &str,
        filter: &Document,
        limit: u32,
    ) -> Result<Vec<Document>> {
        check_collection_name(collection)?;

        let client = self.client().await?;

        let filter = Value::Object(filter.clone());
        let limit = i64::from(limit);
        let rows = match client.query(&select_sql(collection), &[&filter, &limit]).await {
            Ok(rows) => rows,
            Err(e) if e.code() == Some(&SqlState::UNDEFINED_TABLE) => return Ok(Vec::new()),
            Err(e) => {
                return Err(ApiError::QueryFailed {
                    collection: collection.to_string(),
                    cause: describe_pg_error(&e),
                })
            }
        };

        Ok(rows
            .iter()
            .map(|row| {
                let id: String = row.get(0);
                let body: Value = row.get(1);
                let mut document = match body {
                    Value::Object(map) => map,
                    other => {
                        let mut map = Document::new();
                        map.insert("value".to_string(), other);
                        map
                    }
                };
                document.insert(RAW_ID_FIELD.to_string(), Value::String(id));
                document
            })
            .collect())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let client = self.client().await?;

        let rows = client
            .query(LIST_COLLECTIONS_SQL, &[])
            .await
            .map_err(|e| ApiError::QueryFailed {
                collection: "information_schema.columns".to_string(),
                cause: describe_pg_error(&e),
            })?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn ping(&self) -> Result<()> {
        let client = self.client().await?;
        client
            .execute("SELECT 1", &[])
            .await
            .map_err(|e| ApiError::StoreUnavailable {
                cause: format!("Ping failed: {}", describe_pg_error(&e)),
            })?;
        Ok(())
    }
}

const LIST_COLLECTIONS_SQL: &str = "SELECT table_name::text FROM information_schema.columns \
     WHERE table_schema = current_schema() AND column_name = 'doc' AND data_type = 'jsonb' \
     ORDER BY table_name";

fn create_collection_sql(collection: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" (\
         seq BIGSERIAL PRIMARY KEY, \
         _id TEXT NOT NULL UNIQUE DEFAULT gen_random_uuid()::text, \
         doc JSONB NOT NULL, \
         created_at TIMESTAMPTZ NOT NULL DEFAULT now())",
        collection
    )
}

fn insert_sql(collection: &str) -> String {
    format!("INSERT INTO \"{}\" (doc) VALUES ($1) RETURNING _id", collection)
}

// Containment: for scalar filter values this is top-level equality
fn select_sql(collection: &str) -> String {
    format!(
        "SELECT _id, doc FROM \"{}\" WHERE doc @> $1 ORDER BY seq LIMIT $2",
        collection
    )
}

/// `CREATE TABLE IF NOT EXISTS` is not atomic: concurrent creators of the
/// same table fail on the catalog instead of skipping.
fn lost_create_race(code: Option<&SqlState>) -> bool {
    code == Some(&SqlState::DUPLICATE_TABLE) || code == Some(&SqlState::UNIQUE_VIOLATION)
}

fn database_name(database_url: &str) -> String {
    database_url
        .parse::<tokio_postgres::Config>()
        .ok()
        .and_then(|cfg| {
            cfg.get_dbname()
                .or_else(|| cfg.get_user())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "postgres".to_string())
}

fn check_collection_name(collection: &str) -> Result<()> {
    if is_valid_identifier(collection) {
        Ok(())
    } else {
        Err(ApiError::InvalidRequest {
            message: format!("Invalid collection name: {}", collection),
        })
    }
}

fn create_pool(database_url: &str, max_size: u32) -> Result<Pool> {
    let mut cfg = PoolConfig::new();
    cfg.url = Some(database_url.to_string());

    cfg.pool = Some(deadpool_postgres::PoolConfig {
        max_size: max_size as usize,
        timeouts: deadpool_postgres::Timeouts {
            wait: Some(Duration::from_secs(5)),
            create: Some(Duration::from_secs(5)),
            recycle: Some(Duration::from_secs(5)),
        },
        ..Default::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| ApiError::StoreUnavailable {
            cause: format!("Failed to create pool: {}", e),
        })
}

fn is_valid_identifier(name: &str) -> bool {
    if name.is_empty() || name.len() > 63 {
        return false;
    }

    match name.chars().next() {
        Some(first) if first.is_ascii_lowercase() || first == '_' => {}
        _ => return false,
    }

    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
