//! Common types used throughout the marketplace client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{MarketplaceError, Result};
use crate::utils::{current_timestamp, generate_listing_id};

/// Unique identifier for user accounts, assigned by the auth gateway
pub type UserId = String;

/// Unique identifier for service listings
pub type ListingId = Uuid;

/// Unique identifier for stored blobs
pub type BlobKey = Uuid;

/// Field map persisted in a document-store collection
pub type Document = serde_json::Map<String, Value>;

/// Role tags a user can carry on their profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Provider,
    Client,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Provider => write!(f, "provider"),
            Role::Client => write!(f, "client"),
        }
    }
}

/// Profile of a marketplace user
///
/// Every field other than the identity may be absent until first set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub listings: Vec<ListingId>,
}

impl UserProfile {
    /// Create an empty profile for a freshly created account
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    /// Serialize into a document-store field map
    pub fn to_document(&self) -> Result<Document> {
        to_document(self)
    }

    /// Deserialize from a document-store field map
    pub fn from_document(document: &Document) -> Result<Self> {
        from_document(document)
    }
}

/// A published service listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceListing {
    pub listing_id: ListingId,
    pub owner_id: UserId,
    #[serde(default)]
    pub owner_handle: Option<String>,
    #[serde(default)]
    pub owner_avatar_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ServiceListing {
    /// Serialize into a document-store field map
    pub fn to_document(&self) -> Result<Document> {
        to_document(self)
    }

    /// Deserialize from a document-store field map
    pub fn from_document(document: &Document) -> Result<Self> {
        from_document(document)
    }
}

/// Partial profile update; unset fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub handle: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub roles: Option<Vec<Role>>,
}

impl ProfilePatch {
    /// Patch that only sets the handle (used when a new account is provisioned)
    pub fn with_handle(handle: impl Into<String>) -> Self {
        Self {
            handle: Some(handle.into()),
            ..Default::default()
        }
    }

    /// Merge this patch over the last-known profile
    ///
    /// Unset patch fields fall back to the current value; the listing index
    /// is carried over untouched.
    pub fn apply_over(&self, current: Option<&UserProfile>, user_id: &UserId) -> UserProfile {
        UserProfile {
            user_id: user_id.clone(),
            name: self
                .name
                .clone()
                .or_else(|| current.and_then(|p| p.name.clone())),
            handle: self
                .handle
                .clone()
                .or_else(|| current.and_then(|p| p.handle.clone())),
            avatar_url: self
                .avatar_url
                .clone()
                .or_else(|| current.and_then(|p| p.avatar_url.clone())),
            bio: self
                .bio
                .clone()
                .or_else(|| current.and_then(|p| p.bio.clone())),
            roles: self
                .roles
                .clone()
                .unwrap_or_else(|| current.map(|p| p.roles.clone()).unwrap_or_default()),
            listings: current.map(|p| p.listings.clone()).unwrap_or_default(),
        }
    }
}

/// Partial listing update; unset fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct ListingPatch {
    pub image_url: Option<String>,
    pub description: Option<String>,
}

impl ListingPatch {
    /// Merge this patch over the last-known listing owned by `owner`
    ///
    /// The listing identity and creation timestamp are fixed the first time
    /// a listing is built and preserved by every later merge. Owner display
    /// fields refresh from the profile, falling back to the stored listing
    /// when the profile has not set them.
    pub fn apply_over(
        &self,
        current: Option<&ServiceListing>,
        owner: &UserProfile,
    ) -> ServiceListing {
        ServiceListing {
            listing_id: current
                .map(|l| l.listing_id)
                .unwrap_or_else(generate_listing_id),
            owner_id: owner.user_id.clone(),
            owner_handle: owner
                .handle
                .clone()
                .or_else(|| current.and_then(|l| l.owner_handle.clone())),
            owner_avatar_url: owner
                .avatar_url
                .clone()
                .or_else(|| current.and_then(|l| l.owner_avatar_url.clone())),
            image_url: self
                .image_url
                .clone()
                .or_else(|| current.and_then(|l| l.image_url.clone())),
            description: self
                .description
                .clone()
                .or_else(|| current.and_then(|l| l.description.clone())),
            created_at: current.map(|l| l.created_at).unwrap_or_else(current_timestamp),
        }
    }
}

fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(MarketplaceError::Internal {
            message: format!("expected a document object, got {other}"),
        }
        .into()),
        Err(e) => Err(MarketplaceError::Internal {
            message: format!("Failed to serialize document: {e}"),
        }
        .into()),
    }
}

fn from_document<T: serde::de::DeserializeOwned>(document: &Document) -> Result<T> {
    serde_json::from_value(Value::Object(document.clone())).map_err(|e| {
        MarketplaceError::Transport {
            message: format!("Malformed stored document: {e}"),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn profile_with(name: &str, handle: &str) -> UserProfile {
        UserProfile {
            user_id: "user-1".to_string(),
            name: Some(name.to_string()),
            handle: Some(handle.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_patch_merges_over_current_profile() {
        let current = profile_with("A", "alice");
        let patch = ProfilePatch {
            bio: Some("new bio".to_string()),
            ..Default::default()
        };

        let merged = patch.apply_over(Some(&current), &current.user_id);

        assert_eq!(merged.name.as_deref(), Some("A"));
        assert_eq!(merged.handle.as_deref(), Some("alice"));
        assert_eq!(merged.bio.as_deref(), Some("new bio"));
    }

    #[test]
    fn test_patch_over_empty_profile() {
        let patch = ProfilePatch::with_handle("alice");
        let merged = patch.apply_over(None, &"user-1".to_string());

        assert_eq!(merged.user_id, "user-1");
        assert_eq!(merged.handle.as_deref(), Some("alice"));
        assert!(merged.name.is_none());
        assert!(merged.listings.is_empty());
    }

    #[test]
    fn test_listing_identity_fixed_at_creation() {
        let owner = profile_with("A", "alice");
        let created = ListingPatch {
            description: Some("tutoring".to_string()),
            ..Default::default()
        }
        .apply_over(None, &owner);

        let updated = ListingPatch {
            image_url: Some("https://blobs/1".to_string()),
            ..Default::default()
        }
        .apply_over(Some(&created), &owner);

        assert_eq!(updated.listing_id, created.listing_id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.description.as_deref(), Some("tutoring"));
        assert_eq!(updated.image_url.as_deref(), Some("https://blobs/1"));
    }

    #[test]
    fn test_listing_owner_fields_follow_profile() {
        let mut owner = profile_with("A", "alice");
        owner.avatar_url = Some("https://blobs/avatar".to_string());

        let listing = ListingPatch::default().apply_over(None, &owner);

        assert_eq!(listing.owner_id, "user-1");
        assert_eq!(listing.owner_handle.as_deref(), Some("alice"));
        assert_eq!(listing.owner_avatar_url.as_deref(), Some("https://blobs/avatar"));
    }

    #[test]
    fn test_profile_document_round_trip() {
        let mut profile = profile_with("A", "alice");
        profile.roles = vec![Role::Provider];

        let document = profile.to_document().unwrap();
        assert_eq!(
            document.get("handle").and_then(|v| v.as_str()),
            Some("alice")
        );

        let restored = UserProfile::from_document(&document).unwrap();
        assert_eq!(restored, profile);
    }

    #[test]
    fn test_profile_from_sparse_document() {
        let mut document = Document::new();
        document.insert("user_id".to_string(), Value::String("user-1".to_string()));

        let profile = UserProfile::from_document(&document).unwrap();
        assert_eq!(profile.user_id, "user-1");
        assert!(profile.handle.is_none());
        assert!(profile.roles.is_empty());
    }

    proptest! {
        #[test]
        fn patch_preserves_unset_fields(
            name in proptest::option::of("[a-z]{1,8}"),
            handle in proptest::option::of("[a-z]{1,8}"),
            bio in proptest::option::of("[a-z]{1,12}"),
            new_bio in "[a-z]{1,12}",
        ) {
            let current = UserProfile {
                user_id: "user-1".to_string(),
                name: name.clone(),
                handle: handle.clone(),
                bio,
                ..Default::default()
            };
            let patch = ProfilePatch {
                bio: Some(new_bio.clone()),
                ..Default::default()
            };

            let merged = patch.apply_over(Some(&current), &current.user_id);

            prop_assert_eq!(merged.name, name);
            prop_assert_eq!(merged.handle, handle);
            prop_assert_eq!(merged.bio, Some(new_bio));
        }
    }
}
