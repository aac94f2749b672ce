//! Document store interface and implementations
//!
//! This module defines the contract for the hosted document database, with an
//! in-memory implementation backing local runs and tests. Documents are plain
//! JSON field maps keyed by collection and id.

use crate::error::{MarketplaceError, Result};
use crate::types::Document;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Collection holding user profiles, keyed by user id
pub const USERS_COLLECTION: &str = "users";

/// Collection holding service listings, keyed by the owning user's id
pub const SERVICES_COLLECTION: &str = "services";

/// Trait for document store operations
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id, or `None` if absent
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Write a full document, creating or replacing it
    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<()>;

    /// Merge fields into an existing document; fails if the document is absent
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()>;

    /// Find documents whose `field` equals `value`
    async fn query(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Document>>;
}

/// In-memory document store implementation
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, HashMap<String, Document>>>,
}

impl InMemoryDocumentStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection (for tests and diagnostics)
    pub fn document_count(&self, collection: &str) -> Result<usize> {
        let collections = self
            .collections
            .read()
            .map_err(|_| MarketplaceError::Internal {
                message: "Failed to acquire collections read lock".to_string(),
            })?;

        Ok(collections.get(collection).map_or(0, HashMap::len))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| MarketplaceError::Internal {
                message: "Failed to acquire collections read lock".to_string(),
            })?;

        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| MarketplaceError::Internal {
                message: "Failed to acquire collections write lock".to_string(),
            })?;

        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);

        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| MarketplaceError::Internal {
                message: "Failed to acquire collections write lock".to_string(),
            })?;

        let document = collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
            .ok_or_else(|| MarketplaceError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        for (field, value) in fields {
            document.insert(field, value);
        }

        Ok(())
    }

    async fn query(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| MarketplaceError::Internal {
                message: "Failed to acquire collections read lock".to_string(),
            })?;

        let matches = collections
            .get(collection)
            .map(|documents| {
                documents
                    .values()
                    .filter(|document| document.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(matches)
    }
}
