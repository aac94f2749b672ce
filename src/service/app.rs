//! Main application state and wiring
//!
//! This module contains the AppState that assembles configuration, the
//! backend collaborators, and the session manager, and performs the session
//! restore at process start.

use crate::backend::auth::{AuthGateway, InMemoryAuthGateway};
use crate::backend::blobs::{BlobStore, InMemoryBlobStore};
use crate::backend::documents::{DocumentStore, InMemoryDocumentStore};
use crate::config::AppConfig;
use crate::error::Result;
use crate::session::SessionManager;
use std::sync::Arc;
use tracing::info;

/// Main application state containing the wired client components
pub struct AppState {
    /// Application configuration
    config: AppConfig,
    /// The session manager over the configured backend
    session: SessionManager,
}

impl AppState {
    /// Initialize the application over in-memory backend collaborators
    ///
    /// Hosts integrating a real backend inject their own gateways through
    /// [`AppState::with_backends`].
    pub fn new(config: AppConfig) -> Self {
        let auth = Arc::new(InMemoryAuthGateway::new());
        let documents = Arc::new(InMemoryDocumentStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new(config.backend.blob_base_url.clone()));
        Self::with_backends(config, auth, documents, blobs)
    }

    /// Initialize the application over injected backend collaborators
    pub fn with_backends(
        config: AppConfig,
        auth: Arc<dyn AuthGateway>,
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        info!(
            "Initializing marketplace client - service: {}",
            config.service.name
        );

        let session = SessionManager::with_notification_capacity(
            auth,
            documents,
            blobs,
            config.session.notification_capacity,
        );

        Self { config, session }
    }

    /// Rebuild any persisted session from the backend
    ///
    /// Returns whether a signed-in identity was restored.
    pub async fn start(&self) -> Result<bool> {
        info!("Restoring session state from backend");
        self.session.restore().await
    }

    /// The application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The session manager
    pub fn session(&self) -> &SessionManager {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::auth::MockAuthGateway;

    #[tokio::test]
    async fn test_fresh_start_is_signed_out() {
        let app = AppState::new(AppConfig::default());

        let restored = app.start().await.unwrap();

        assert!(!restored);
        assert!(!app.session().snapshot().unwrap().signed_in);
    }

    #[tokio::test]
    async fn test_start_reports_restore_failure() {
        // A persisted identity with no profile document behind it.
        let app = AppState::with_backends(
            AppConfig::default(),
            Arc::new(MockAuthGateway::with_identity("user-1")),
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(InMemoryBlobStore::default()),
        );

        let result = app.start().await;

        assert!(result.is_err());
        let notifications = app.session().drain_notifications();
        assert_eq!(notifications.len(), 1);
    }
}
