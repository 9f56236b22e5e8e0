//! Document Store
//!
//! The only boundary between validated records and persistent storage.
//! Backends:
//! - [`PgDocumentStore`]: PostgreSQL, one JSONB table per collection
//! - [`MemoryDocumentStore`]: process-local, for development and tests

mod memory;
mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// A stored or to-be-stored record
pub type Document = Map<String, Value>;

/// Identifier field as the store writes it
pub const RAW_ID_FIELD: &str = "_id";

/// Identifier field as callers see it
pub const PUBLIC_ID_FIELD: &str = "id";

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the database backing this store
    fn name(&self) -> &str;

    /// Insert `document` into `collection`; returns it with [`RAW_ID_FIELD`] set
    async fn create_document(&self, collection: &str, document: Document) -> Result<Document>;

    /// At most `limit` documents whose top-level keys equal those in `filter`,
    /// in insertion order. A collection that was never written is empty.
    async fn get_documents(
        &self,
        collection: &str,
        filter: &Document,
        limit: u32,
    ) -> Result<Vec<Document>>;

    /// Collections created so far, sorted by name
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Check that the store answers
    async fn ping(&self) -> Result<()>;
}

/// Rename the raw identifier to the public one, stringifying it.
///
/// This is the only transformation applied between storage and response.
pub fn reshape_identifier(mut document: Document) -> Document {
    if let Some(raw_id) = document.remove(RAW_ID_FIELD) {
        let id = match raw_id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        document.insert(PUBLIC_ID_FIELD.to_string(), Value::String(id));
    }
    document
}

/// Stringified identifier of a freshly created document
pub fn document_id(document: &Document) -> Option<String> {
    document.get(RAW_ID_FIELD).map(|id| match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// True when every key in `filter` has an equal value in `document`
pub fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

/// Open the store named by the config.
///
/// A missing or unusable URL is reported and yields `None`; the server still
/// starts and store-backed endpoints answer "unavailable". An unreachable
/// database still yields a store, which reconnects on later requests.
pub async fn connect(config: &Config) -> Option<Arc<dyn DocumentStore>> {
    if config.uses_memory_store() {
        info!("Using in-memory document store");
        let name = config.database_name.as_deref().unwrap_or("memory");
        return Some(Arc::new(MemoryDocumentStore::new(name)));
    }

    let url = match config.resolved_database_url() {
        Ok(Some(url)) => url,
        Ok(None) => {
            warn!("DATABASE_URL not set; starting without a document store");
            return None;
        }
        Err(e) => {
            warn!("Ignoring document store configuration: {}", e);
            return None;
        }
    };

    match PgDocumentStore::connect(&url, config.max_connections).await {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            warn!("Invalid document store configuration: {}", e);
            None
        }
    }
}
