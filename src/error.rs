//! Error types for the marketplace client
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific marketplace scenarios
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("Missing required field: {field}")]
    Validation { field: String },

    #[error("Handle already taken: {handle}")]
    HandleTaken { handle: String },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Blob not found: {key}")]
    BlobNotFound { key: String },

    #[error("Backend call failed: {message}")]
    Transport { message: String },

    #[error("Internal session error: {message}")]
    Internal { message: String },
}
