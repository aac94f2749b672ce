//! Service layer for the marketplace client
//!
//! This module contains the application state that wires configuration, the
//! backend collaborators, and the session manager together.

pub mod app;

pub use app::AppState;
