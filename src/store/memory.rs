//! In-memory document store for development and testing

use super::{matches_filter, Document, DocumentStore, RAW_ID_FIELD};
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

/// Collections are kept as append-only vectors, so listing order is
/// insertion order.
pub struct MemoryDocumentStore {
    name: String,
    collections: DashMap<String, Vec<Document>>,
}

impl MemoryDocumentStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collections: DashMap::new(),
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_document(&self, collection: &str, mut document: Document) -> Result<Document> {
        let id = Uuid::new_v4().to_string();
        document.insert(RAW_ID_FIELD.to_string(), Value::String(id));

        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());

        Ok(document)
    }

    async fn get_documents(
        &self,
        collection: &str,
        filter: &Document,
        limit: u32,
    ) -> Result<Vec<Document>> {
        let Some(documents) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(documents
            .iter()
            .filter(|doc| matches_filter(doc, filter))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
