//! Utility functions for the marketplace client

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique listing ID
pub fn generate_listing_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new unique blob key
pub fn generate_blob_key() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Check whether a required input field is blank
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
