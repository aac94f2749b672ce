//! Market Stall - client for a two-sided services marketplace
//!
//! This crate provides the session state machine, profile and listing upsert
//! logic, and the backend collaborator contracts (authentication, document
//! store, blob storage) for a services marketplace application.

pub mod backend;
pub mod config;
pub mod error;
pub mod nav;
pub mod service;
pub mod session;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MarketplaceError, Result};
pub use types::*;

// Re-export key components
pub use backend::{AuthGateway, BlobStore, DocumentStore};
pub use session::{SessionManager, SessionState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
