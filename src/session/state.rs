//! Observable session state

use crate::types::{ServiceListing, UserProfile};

/// Snapshot of the session visible to the presentation layer
///
/// At most one profile and one listing is held at a time; aggregation over
/// many users or listings is the backend's concern.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Whether an identity is currently signed in
    pub signed_in: bool,
    /// Whether a backend operation is in flight
    pub busy: bool,
    /// Profile of the signed-in user, once loaded
    pub profile: Option<UserProfile>,
    /// The signed-in user's listing, once loaded or published
    pub listing: Option<ServiceListing>,
}

/// Statistics about session operations
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Total accounts created through this session
    pub sign_ups: u64,
    /// Total successful credential sign-ins
    pub sign_ins: u64,
    /// Total sign-outs
    pub sign_outs: u64,
    /// Total profile documents written
    pub profile_writes: u64,
    /// Total listing documents written
    pub listing_writes: u64,
    /// Total blobs uploaded
    pub uploads: u64,
    /// Total failed operations
    pub failures: u64,
}
