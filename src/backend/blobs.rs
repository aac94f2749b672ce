//! Blob store interface and implementations
//!
//! This module defines the contract for hosted blob storage: uploads return an
//! opaque key which resolves to a public URL.

use crate::error::{MarketplaceError, Result};
use crate::types::BlobKey;
use crate::utils::generate_blob_key;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for blob storage operations
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob and return its key
    async fn put(&self, bytes: Vec<u8>) -> Result<BlobKey>;

    /// Resolve a stored blob's public URL
    async fn resolve_url(&self, key: BlobKey) -> Result<String>;
}

/// In-memory blob store implementation
#[derive(Debug)]
pub struct InMemoryBlobStore {
    base_url: String,
    blobs: RwLock<HashMap<BlobKey, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create an in-memory store resolving URLs under `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored blobs (for tests and diagnostics)
    pub fn blob_count(&self) -> Result<usize> {
        let blobs = self.blobs.read().map_err(|_| MarketplaceError::Internal {
            message: "Failed to acquire blobs read lock".to_string(),
        })?;

        Ok(blobs.len())
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new("https://blobs.invalid")
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<BlobKey> {
        let mut blobs = self.blobs.write().map_err(|_| MarketplaceError::Internal {
            message: "Failed to acquire blobs write lock".to_string(),
        })?;

        let key = generate_blob_key();
        blobs.insert(key, bytes);

        Ok(key)
    }

    async fn resolve_url(&self, key: BlobKey) -> Result<String> {
        let blobs = self.blobs.read().map_err(|_| MarketplaceError::Internal {
            message: "Failed to acquire blobs read lock".to_string(),
        })?;

        if !blobs.contains_key(&key) {
            return Err(MarketplaceError::BlobNotFound {
                key: key.to_string(),
            }
            .into());
        }

        Ok(format!("{}/{}", self.base_url, key))
    }
}
