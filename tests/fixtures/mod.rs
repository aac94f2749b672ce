//! Test fixtures and mock implementations for integration testing

use async_trait::async_trait;
use market_stall::backend::auth::InMemoryAuthGateway;
use market_stall::backend::blobs::InMemoryBlobStore;
use market_stall::backend::documents::{DocumentStore, InMemoryDocumentStore};
use market_stall::error::{MarketplaceError, Result};
use market_stall::session::SessionManager;
use market_stall::types::Document;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Integration test setup that creates a complete client system
pub fn create_test_system() -> (
    SessionManager,
    Arc<InMemoryAuthGateway>,
    Arc<InMemoryDocumentStore>,
    Arc<InMemoryBlobStore>,
) {
    let auth = Arc::new(InMemoryAuthGateway::new());
    let documents = Arc::new(InMemoryDocumentStore::new());
    let blobs = Arc::new(InMemoryBlobStore::new("https://blobs.test"));

    let manager = SessionManager::new(auth.clone(), documents.clone(), blobs.clone());

    (manager, auth, documents, blobs)
}

/// Document store wrapper that injects write failures on demand
///
/// Reads always pass through; writes fail while `fail_writes` is set,
/// simulating a backend outage mid-operation.
pub struct FlakyDocumentStore {
    inner: Arc<InMemoryDocumentStore>,
    fail_writes: AtomicBool,
    write_attempts: AtomicU64,
}

impl FlakyDocumentStore {
    pub fn new(inner: Arc<InMemoryDocumentStore>) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            write_attempts: AtomicU64::new(0),
        }
    }

    /// Toggle write failures
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of writes attempted, including failed ones (for testing)
    pub fn write_attempts(&self) -> u64 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MarketplaceError::Transport {
                message: "simulated backend outage".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<()> {
        self.check_write()?;
        self.inner.set(collection, id, document).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        self.check_write()?;
        self.inner.update(collection, id, fields).await
    }

    async fn query(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Document>> {
        self.inner.query(collection, field, value).await
    }
}
