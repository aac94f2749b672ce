//! Per-entity write locks
//!
//! Upserts are read-modify-write sequences against the document store; an
//! async mutex per entity key keeps two operations on the same entity from
//! interleaving between the read and the write. Operations on different
//! entities proceed independently.

use crate::error::{MarketplaceError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of async locks keyed by entity id
#[derive(Debug, Default)]
pub struct EntityLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl EntityLocks {
    /// Create an empty lock registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting while another operation holds it
    ///
    /// The returned guard must be held across the whole read-modify-write
    /// span it protects.
    pub async fn acquire(&self, key: &str) -> Result<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| MarketplaceError::Internal {
                message: "Failed to acquire lock registry".to_string(),
            })?;

            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        Ok(lock.lock_owned().await)
    }
}
