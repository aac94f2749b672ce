//! Account authentication gateway
//!
//! This module defines the contract for the hosted authentication service:
//! account creation, credential sign-in, sign-out, and the identity persisted
//! between process runs.

use crate::error::{MarketplaceError, Result};
use crate::types::UserId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Trait for authentication gateway operations
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Create a new account and sign it in, returning the assigned identity
    async fn create_account(&self, email: &str, password: &str) -> Result<UserId>;

    /// Sign in with credentials, returning the authenticated identity
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserId>;

    /// Sign out the current identity
    async fn sign_out(&self) -> Result<()>;

    /// Get the currently signed-in identity, if any
    async fn current_identity(&self) -> Result<Option<UserId>>;
}

#[derive(Debug, Clone)]
struct AccountRecord {
    user_id: UserId,
    password: String,
}

/// In-memory authentication gateway implementation
#[derive(Debug, Default)]
pub struct InMemoryAuthGateway {
    accounts: RwLock<HashMap<String, AccountRecord>>,
    current: RwLock<Option<UserId>>,
}

impl InMemoryAuthGateway {
    /// Create an empty in-memory gateway
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered accounts (for tests and diagnostics)
    pub fn account_count(&self) -> Result<usize> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| MarketplaceError::Internal {
                message: "Failed to acquire accounts read lock".to_string(),
            })?;

        Ok(accounts.len())
    }
}

#[async_trait]
impl AuthGateway for InMemoryAuthGateway {
    async fn create_account(&self, email: &str, password: &str) -> Result<UserId> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| MarketplaceError::Internal {
                message: "Failed to acquire accounts write lock".to_string(),
            })?;

        if accounts.contains_key(email) {
            return Err(MarketplaceError::Auth {
                message: format!("An account already exists for {email}"),
            }
            .into());
        }

        let user_id = Uuid::new_v4().to_string();
        accounts.insert(
            email.to_string(),
            AccountRecord {
                user_id: user_id.clone(),
                password: password.to_string(),
            },
        );
        drop(accounts);

        let mut current = self.current.write().map_err(|_| MarketplaceError::Internal {
            message: "Failed to acquire identity write lock".to_string(),
        })?;
        *current = Some(user_id.clone());

        Ok(user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserId> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| MarketplaceError::Internal {
                message: "Failed to acquire accounts read lock".to_string(),
            })?;

        let record = accounts
            .get(email)
            .filter(|record| record.password == password)
            .ok_or_else(|| MarketplaceError::Auth {
                message: "Invalid email or password".to_string(),
            })?;
        let user_id = record.user_id.clone();
        drop(accounts);

        let mut current = self.current.write().map_err(|_| MarketplaceError::Internal {
            message: "Failed to acquire identity write lock".to_string(),
        })?;
        *current = Some(user_id.clone());

        Ok(user_id)
    }

    async fn sign_out(&self) -> Result<()> {
        let mut current = self.current.write().map_err(|_| MarketplaceError::Internal {
            message: "Failed to acquire identity write lock".to_string(),
        })?;
        *current = None;
        Ok(())
    }

    async fn current_identity(&self) -> Result<Option<UserId>> {
        let current = self.current.read().map_err(|_| MarketplaceError::Internal {
            message: "Failed to acquire identity read lock".to_string(),
        })?;

        Ok(current.clone())
    }
}

/// Mock authentication gateway for testing
pub struct MockAuthGateway {
    deny_all: bool,
    identity: RwLock<Option<UserId>>,
}

impl MockAuthGateway {
    /// Create a mock gateway that rejects every credential operation
    pub fn deny_all() -> Self {
        Self {
            deny_all: true,
            identity: RwLock::new(None),
        }
    }

    /// Create a mock gateway already signed in as `user_id`
    pub fn with_identity(user_id: impl Into<UserId>) -> Self {
        Self {
            deny_all: false,
            identity: RwLock::new(Some(user_id.into())),
        }
    }
}

#[async_trait]
impl AuthGateway for MockAuthGateway {
    async fn create_account(&self, _email: &str, _password: &str) -> Result<UserId> {
        if self.deny_all {
            return Err(MarketplaceError::Auth {
                message: "Account creation rejected".to_string(),
            }
            .into());
        }

        let user_id = Uuid::new_v4().to_string();
        if let Ok(mut identity) = self.identity.write() {
            *identity = Some(user_id.clone());
        }
        Ok(user_id)
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<UserId> {
        if self.deny_all {
            return Err(MarketplaceError::Auth {
                message: "Sign-in rejected".to_string(),
            }
            .into());
        }

        let identity = self
            .identity
            .read()
            .map(|identity| identity.clone())
            .unwrap_or_default();
        identity.ok_or_else(|| {
            MarketplaceError::Auth {
                message: "No identity configured".to_string(),
            }
            .into()
        })
    }

    async fn sign_out(&self) -> Result<()> {
        if let Ok(mut identity) = self.identity.write() {
            *identity = None;
        }
        Ok(())
    }

    async fn current_identity(&self) -> Result<Option<UserId>> {
        Ok(self
            .identity
            .read()
            .map(|identity| identity.clone())
            .unwrap_or_default())
    }
}
