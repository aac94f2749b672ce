//! Session manager implementation
//!
//! This module provides the core SessionManager that owns the observable
//! session state and performs every backend-facing operation: account signup
//! and sign-in, profile and listing upserts, image uploads, and the session
//! restore performed at process start.

use crate::backend::auth::AuthGateway;
use crate::backend::blobs::BlobStore;
use crate::backend::documents::{DocumentStore, SERVICES_COLLECTION, USERS_COLLECTION};
use crate::error::{MarketplaceError, Result};
use crate::session::locks::EntityLocks;
use crate::session::notifications::{Notification, NotificationQueue};
use crate::session::state::{SessionState, SessionStats};
use crate::types::{
    Document, ListingId, ListingPatch, ProfilePatch, ServiceListing, UserId, UserProfile,
};
use crate::utils::is_blank;
use serde_json::Value;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

fn profile_key(user_id: &str) -> String {
    format!("user/{user_id}")
}

fn listing_key(user_id: &str) -> String {
    format!("listing/{user_id}")
}

/// The main session manager
///
/// Every operation follows the same span: set the busy flag, run the backend
/// calls, clear the flag, and on failure convert the error into exactly one
/// pending notification.
#[derive(Clone)]
pub struct SessionManager {
    /// Authentication gateway
    auth: Arc<dyn AuthGateway>,
    /// Document store holding profiles and listings
    documents: Arc<dyn DocumentStore>,
    /// Blob storage for uploaded images
    blobs: Arc<dyn BlobStore>,
    /// Observable session state
    state: Arc<RwLock<SessionState>>,
    /// Pending one-shot notifications
    notifications: Arc<NotificationQueue>,
    /// Per-entity write locks guarding read-modify-write spans
    entity_locks: Arc<EntityLocks>,
    /// Operation counters
    stats: Arc<RwLock<SessionStats>>,
}

impl SessionManager {
    /// Create a new session manager over the given backend collaborators
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self::with_notification_capacity(auth, documents, blobs, 64)
    }

    /// Create a session manager with a custom notification queue capacity
    pub fn with_notification_capacity(
        auth: Arc<dyn AuthGateway>,
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        capacity: usize,
    ) -> Self {
        Self {
            auth,
            documents,
            blobs,
            state: Arc::new(RwLock::new(SessionState::default())),
            notifications: Arc::new(NotificationQueue::new(capacity)),
            entity_locks: Arc::new(EntityLocks::new()),
            stats: Arc::new(RwLock::new(SessionStats::default())),
        }
    }

    /// Get a copy of the current session state
    pub fn snapshot(&self) -> Result<SessionState> {
        Ok(self.state_read()?.clone())
    }

    /// Get a copy of the operation counters
    pub fn stats(&self) -> Result<SessionStats> {
        Ok(self
            .stats
            .read()
            .map_err(|_| MarketplaceError::Internal {
                message: "Failed to acquire stats lock".to_string(),
            })?
            .clone())
    }

    /// Take every pending notification (one-shot delivery)
    pub fn drain_notifications(&self) -> Vec<Notification> {
        self.notifications.drain()
    }

    /// Rebuild the session from the backend at process start
    ///
    /// Returns whether a persisted identity was found.
    pub async fn restore(&self) -> Result<bool> {
        match self.auth.current_identity().await? {
            Some(user_id) => {
                info!("Restoring session - user_id: '{user_id}'");
                self.state_write()?.signed_in = true;
                self.load_profile(&user_id).await?;
                Ok(true)
            }
            None => {
                debug!("No persisted identity, starting signed out");
                self.state_write()?.signed_in = false;
                Ok(false)
            }
        }
    }

    /// Sign up a new user with a unique handle
    ///
    /// Blank fields are rejected before any backend call. A taken handle
    /// aborts before the account is created.
    pub async fn sign_up(&self, handle: &str, email: &str, password: &str) -> Result<UserId> {
        for (field, value) in [("handle", handle), ("email", email), ("password", password)] {
            if is_blank(value) {
                warn!("Signup rejected - blank field: {field}");
                self.notifications.push("Please fill in all the fields");
                self.record(|stats| stats.failures += 1);
                return Err(MarketplaceError::Validation {
                    field: field.to_string(),
                }
                .into());
            }
        }

        info!("Processing signup - handle: '{handle}'");
        self.set_busy(true)?;
        let result = self.sign_up_backend(handle, email, password).await;
        self.set_busy(false)?;

        match result {
            Ok(user_id) => {
                self.record(|stats| stats.sign_ups += 1);
                info!("Signup completed - handle: '{handle}', user_id: '{user_id}'");
                Ok(user_id)
            }
            Err(error) => {
                let context = match error.downcast_ref::<MarketplaceError>() {
                    Some(MarketplaceError::HandleTaken { .. }) => "",
                    _ => "Signup failed",
                };
                self.report_failure(context, &error);
                Err(error)
            }
        }
    }

    async fn sign_up_backend(&self, handle: &str, email: &str, password: &str) -> Result<UserId> {
        let matches = self
            .documents
            .query(
                USERS_COLLECTION,
                "handle",
                &Value::String(handle.to_string()),
            )
            .await?;
        if !matches.is_empty() {
            return Err(MarketplaceError::HandleTaken {
                handle: handle.to_string(),
            }
            .into());
        }

        let user_id = self.auth.create_account(email, password).await?;
        debug!("Account created - user_id: '{user_id}'");
        self.state_write()?.signed_in = true;

        self.write_profile(&user_id, ProfilePatch::with_handle(handle))
            .await?;

        Ok(user_id)
    }

    /// Sign in with credentials and load the matching profile
    pub async fn log_in(&self, email: &str, password: &str) -> Result<UserProfile> {
        info!("Processing login - email: '{email}'");
        self.set_busy(true)?;
        let result = async {
            let user_id = self.auth.sign_in(email, password).await?;
            self.state_write()?.signed_in = true;
            self.fetch_profile(&user_id).await
        }
        .await;
        self.set_busy(false)?;

        match result {
            Ok(profile) => {
                self.record(|stats| stats.sign_ins += 1);
                info!("Login completed - user_id: '{}'", profile.user_id);
                Ok(profile)
            }
            Err(error) => {
                self.report_failure("Login failed", &error);
                Err(error)
            }
        }
    }

    /// Sign out and clear local session state
    ///
    /// Local state is cleared regardless of whether the backend sign-out
    /// succeeds.
    pub async fn log_out(&self) -> Result<()> {
        info!("Signing out");
        let sign_out_result = self.auth.sign_out().await;

        {
            let mut state = self.state_write()?;
            state.signed_in = false;
            state.busy = false;
            state.profile = None;
            state.listing = None;
        }

        if let Err(error) = sign_out_result {
            warn!("Backend sign-out failed: {error}");
        }

        self.record(|stats| stats.sign_outs += 1);
        self.notifications.push("Logged out");
        Ok(())
    }

    /// Load a profile by user id into the session
    pub async fn load_profile(&self, user_id: &str) -> Result<UserProfile> {
        debug!("Loading profile - user_id: '{user_id}'");
        self.set_busy(true)?;
        let result = self.fetch_profile(user_id).await;
        self.set_busy(false)?;

        match result {
            Ok(profile) => Ok(profile),
            Err(error) => {
                self.report_failure("cannot get user data", &error);
                Err(error)
            }
        }
    }

    /// Load a listing by its owner's user id into the session
    pub async fn load_listing(&self, user_id: &str) -> Result<ServiceListing> {
        debug!("Loading listing - user_id: '{user_id}'");
        self.set_busy(true)?;
        let result = self.fetch_listing(user_id).await;
        self.set_busy(false)?;

        match result {
            Ok(listing) => Ok(listing),
            Err(error) => {
                self.report_failure("cannot get service data", &error);
                Err(error)
            }
        }
    }

    /// Merge a patch over the current profile and persist it
    ///
    /// Creates the profile document if absent, updates it otherwise.
    pub async fn upsert_profile(&self, patch: ProfilePatch) -> Result<UserProfile> {
        let user_id = match self.require_identity().await {
            Ok(user_id) => user_id,
            Err(error) => {
                self.report_failure("Profile update failed", &error);
                return Err(error);
            }
        };

        info!("Upserting profile - user_id: '{user_id}'");
        self.set_busy(true)?;
        let result = self.write_profile(&user_id, patch).await;
        self.set_busy(false)?;

        match result {
            Ok(profile) => {
                debug!("Profile persisted - user_id: '{user_id}'");
                Ok(profile)
            }
            Err(error) => {
                self.report_failure("Profile update failed", &error);
                Err(error)
            }
        }
    }

    /// Merge a patch over the current listing and persist it
    ///
    /// The listing document is keyed by the owning user's id; each user has
    /// at most one published listing.
    pub async fn upsert_listing(&self, patch: ListingPatch) -> Result<ServiceListing> {
        let user_id = match self.require_identity().await {
            Ok(user_id) => user_id,
            Err(error) => {
                self.report_failure("Service update failed", &error);
                return Err(error);
            }
        };

        info!("Upserting listing - user_id: '{user_id}'");
        self.set_busy(true)?;
        let result = self.write_listing(&user_id, patch).await;
        self.set_busy(false)?;

        match result {
            Ok(listing) => {
                debug!(
                    "Listing persisted - user_id: '{user_id}', listing_id: {}",
                    listing.listing_id
                );
                Ok(listing)
            }
            Err(error) => {
                self.report_failure("Service update failed", &error);
                Err(error)
            }
        }
    }

    /// Upload an image and resolve its public URL
    pub async fn upload_image(&self, bytes: Vec<u8>) -> Result<String> {
        info!("Uploading image - {} bytes", bytes.len());
        self.set_busy(true)?;
        let result = async {
            let key = self.blobs.put(bytes).await?;
            self.blobs.resolve_url(key).await
        }
        .await;
        self.set_busy(false)?;

        match result {
            Ok(url) => {
                self.record(|stats| stats.uploads += 1);
                debug!("Image stored - url: '{url}'");
                Ok(url)
            }
            Err(error) => {
                self.report_failure("Image upload failed", &error);
                Err(error)
            }
        }
    }

    /// Upload an image and store its URL on the profile
    pub async fn upload_profile_image(&self, bytes: Vec<u8>) -> Result<UserProfile> {
        let url = self.upload_image(bytes).await?;
        self.upsert_profile(ProfilePatch {
            avatar_url: Some(url),
            ..Default::default()
        })
        .await
    }

    /// Upload an image and store its URL on the listing
    pub async fn upload_listing_image(&self, bytes: Vec<u8>) -> Result<ServiceListing> {
        let url = self.upload_image(bytes).await?;
        self.upsert_listing(ListingPatch {
            image_url: Some(url),
            ..Default::default()
        })
        .await
    }

    async fn require_identity(&self) -> Result<UserId> {
        self.auth
            .current_identity()
            .await?
            .ok_or_else(|| {
                MarketplaceError::Auth {
                    message: "No signed-in user".to_string(),
                }
                .into()
            })
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile> {
        let document = self
            .documents
            .get(USERS_COLLECTION, user_id)
            .await?
            .ok_or_else(|| MarketplaceError::NotFound {
                collection: USERS_COLLECTION.to_string(),
                id: user_id.to_string(),
            })?;

        let profile = UserProfile::from_document(&document)?;
        self.state_write()?.profile = Some(profile.clone());
        Ok(profile)
    }

    async fn fetch_listing(&self, user_id: &str) -> Result<ServiceListing> {
        let document = self
            .documents
            .get(SERVICES_COLLECTION, user_id)
            .await?
            .ok_or_else(|| MarketplaceError::NotFound {
                collection: SERVICES_COLLECTION.to_string(),
                id: user_id.to_string(),
            })?;

        let listing = ServiceListing::from_document(&document)?;
        self.state_write()?.listing = Some(listing.clone());
        Ok(listing)
    }

    /// Merge, then create-or-update the profile document
    ///
    /// The whole read-modify-write span runs under the user's entity lock.
    async fn write_profile(&self, user_id: &UserId, patch: ProfilePatch) -> Result<UserProfile> {
        let _guard = self.entity_locks.acquire(&profile_key(user_id)).await?;

        let current = self.state_read()?.profile.clone();
        let merged = patch.apply_over(current.as_ref(), user_id);
        let document = merged.to_document()?;

        let existing = self.documents.get(USERS_COLLECTION, user_id).await?;
        let profile = if existing.is_some() {
            self.documents
                .update(USERS_COLLECTION, user_id, document)
                .await?;
            self.state_write()?.profile = Some(merged.clone());
            merged
        } else {
            self.documents
                .set(USERS_COLLECTION, user_id, document)
                .await?;
            self.fetch_profile(user_id).await?
        };

        self.record(|stats| stats.profile_writes += 1);
        Ok(profile)
    }

    /// Merge, then create-or-update the listing document keyed by `user_id`
    async fn write_listing(&self, user_id: &UserId, patch: ListingPatch) -> Result<ServiceListing> {
        let _guard = self.entity_locks.acquire(&listing_key(user_id)).await?;

        let (current, owner) = {
            let state = self.state_read()?;
            (state.listing.clone(), state.profile.clone())
        };
        let owner = owner.unwrap_or_else(|| UserProfile::new(user_id.clone()));
        let merged = patch.apply_over(current.as_ref(), &owner);
        let document = merged.to_document()?;

        let existing = self.documents.get(SERVICES_COLLECTION, user_id).await?;
        let listing = if existing.is_some() {
            self.documents
                .update(SERVICES_COLLECTION, user_id, document)
                .await?;
            self.state_write()?.listing = Some(merged.clone());
            merged
        } else {
            self.documents
                .set(SERVICES_COLLECTION, user_id, document)
                .await?;
            let stored = self.fetch_listing(user_id).await?;
            self.index_listing(user_id, stored.listing_id).await?;
            stored
        };

        self.record(|stats| stats.listing_writes += 1);
        Ok(listing)
    }

    /// Record a newly created listing on the owner's profile
    async fn index_listing(&self, user_id: &UserId, listing_id: ListingId) -> Result<()> {
        let _guard = self.entity_locks.acquire(&profile_key(user_id)).await?;

        let mut profile = match self.state_read()?.profile.clone() {
            Some(profile) => profile,
            None => return Ok(()),
        };
        if profile.listings.contains(&listing_id) {
            return Ok(());
        }
        profile.listings.push(listing_id);

        let mut fields = Document::new();
        fields.insert(
            "listings".to_string(),
            serde_json::to_value(&profile.listings).map_err(|e| MarketplaceError::Internal {
                message: format!("Failed to serialize listing index: {e}"),
            })?,
        );
        self.documents
            .update(USERS_COLLECTION, user_id, fields)
            .await?;

        self.state_write()?.profile = Some(profile);
        Ok(())
    }

    fn set_busy(&self, busy: bool) -> Result<()> {
        self.state_write()?.busy = busy;
        Ok(())
    }

    /// Convert a failure into a log line, a failure count, and exactly one
    /// pending notification
    fn report_failure(&self, context: &str, error: &anyhow::Error) {
        let message = if context.is_empty() {
            error.to_string()
        } else {
            format!("{context}: {error}")
        };
        warn!("{message}");
        self.notifications.push(message);
        self.record(|stats| stats.failures += 1);
    }

    fn record(&self, update: impl FnOnce(&mut SessionStats)) {
        if let Ok(mut stats) = self.stats.write() {
            update(&mut stats);
        }
    }

    fn state_read(&self) -> Result<RwLockReadGuard<'_, SessionState>> {
        self.state.read().map_err(|_| {
            MarketplaceError::Internal {
                message: "Failed to acquire state read lock".to_string(),
            }
            .into()
        })
    }

    fn state_write(&self) -> Result<RwLockWriteGuard<'_, SessionState>> {
        self.state.write().map_err(|_| {
            MarketplaceError::Internal {
                message: "Failed to acquire state write lock".to_string(),
            }
            .into()
        })
    }
}
