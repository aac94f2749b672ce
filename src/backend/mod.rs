//! Backend collaborators for the hosted platform
//!
//! This module defines the three external services the client delegates to:
//! account authentication, the document store, and blob storage. Each contract
//! ships an in-memory implementation that stands in for the hosted backend in
//! local runs and tests.

pub mod auth;
pub mod blobs;
pub mod documents;

// Re-export commonly used types
pub use auth::{AuthGateway, InMemoryAuthGateway, MockAuthGateway};
pub use blobs::{BlobStore, InMemoryBlobStore};
pub use documents::{DocumentStore, InMemoryDocumentStore, SERVICES_COLLECTION, USERS_COLLECTION};
