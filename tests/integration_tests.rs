//! Integration tests for the marketplace client
//!
//! These tests validate the entire system working together, including:
//! - Complete signup, login, upsert, upload, and logout workflows
//! - Merge-preserves-rest upsert semantics against the stored documents
//! - Concurrent upsert serialization (no lost updates)
//! - Failure surfacing through one-shot notifications

mod fixtures;

use market_stall::backend::auth::InMemoryAuthGateway;
use market_stall::backend::blobs::InMemoryBlobStore;
use market_stall::backend::documents::{DocumentStore, SERVICES_COLLECTION, USERS_COLLECTION};
use market_stall::session::SessionManager;
use market_stall::types::{ListingPatch, ProfilePatch};
use serde_json::json;
use std::sync::Arc;

use fixtures::{create_test_system, FlakyDocumentStore};

#[tokio::test]
async fn test_complete_marketplace_workflow() {
    let (manager, _auth, documents, blobs) = create_test_system();

    // Step 1: sign up with a unique handle.
    let user_id = manager.sign_up("alice", "a@x.com", "pw1").await.unwrap();
    assert!(manager.snapshot().unwrap().signed_in);
    assert_eq!(documents.document_count(USERS_COLLECTION).unwrap(), 1);

    // Step 2: fill out the profile.
    manager
        .upsert_profile(ProfilePatch {
            name: Some("Alice".to_string()),
            bio: Some("Math tutor".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    // Step 3: publish a listing; it lands keyed by the owner.
    let listing = manager
        .upsert_listing(ListingPatch {
            description: Some("Algebra tutoring".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(listing.owner_id, user_id);
    assert_eq!(listing.owner_handle.as_deref(), Some("alice"));
    assert!(documents
        .get(SERVICES_COLLECTION, &user_id)
        .await
        .unwrap()
        .is_some());

    // Step 4: attach a listing image through the blob store.
    let updated = manager.upload_listing_image(vec![0xFF, 0xD8]).await.unwrap();
    assert!(updated
        .image_url
        .as_deref()
        .unwrap()
        .starts_with("https://blobs.test/"));
    assert_eq!(updated.listing_id, listing.listing_id);
    assert_eq!(blobs.blob_count().unwrap(), 1);

    // Step 5: sign out; local state is gone, backend documents remain.
    manager.log_out().await.unwrap();
    let state = manager.snapshot().unwrap();
    assert!(!state.signed_in);
    assert!(state.profile.is_none());
    assert!(state.listing.is_none());
    assert_eq!(documents.document_count(USERS_COLLECTION).unwrap(), 1);
    assert_eq!(documents.document_count(SERVICES_COLLECTION).unwrap(), 1);

    let messages: Vec<String> = manager
        .drain_notifications()
        .into_iter()
        .map(|n| n.message)
        .collect();
    assert_eq!(messages, vec!["Logged out"]);
}

#[tokio::test]
async fn test_signup_persists_profile_on_empty_backend() {
    let (manager, _, documents, _) = create_test_system();

    let user_id = manager.sign_up("alice", "a@x.com", "pw1").await.unwrap();

    let stored = documents
        .get(USERS_COLLECTION, &user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("user_id"), Some(&json!(user_id)));
    assert_eq!(stored.get("handle"), Some(&json!("alice")));
    assert!(manager.snapshot().unwrap().signed_in);
}

#[tokio::test]
async fn test_upsert_preserves_previously_set_fields() {
    let (manager, _, documents, _) = create_test_system();
    let user_id = manager.sign_up("alice", "a@x.com", "pw1").await.unwrap();
    manager
        .upsert_profile(ProfilePatch {
            name: Some("A".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    manager
        .upsert_profile(ProfilePatch {
            bio: Some("new bio".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let stored = documents
        .get(USERS_COLLECTION, &user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("name"), Some(&json!("A")));
    assert_eq!(stored.get("handle"), Some(&json!("alice")));
    assert_eq!(stored.get("bio"), Some(&json!("new bio")));
}

#[tokio::test]
async fn test_duplicate_handle_across_sessions() {
    let (first, auth, documents, blobs) = create_test_system();
    first.sign_up("alice", "a@x.com", "pw1").await.unwrap();
    first.log_out().await.unwrap();

    // A second client over the same backend tries to claim the handle.
    let second = SessionManager::new(auth.clone(), documents.clone(), blobs.clone());
    let result = second.sign_up("alice", "b@x.com", "pw2").await;

    assert!(result.is_err());
    assert!(!second.snapshot().unwrap().signed_in);
    assert_eq!(auth.account_count().unwrap(), 1);
    assert_eq!(documents.document_count(USERS_COLLECTION).unwrap(), 1);

    let notifications = second.drain_notifications();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].message.contains("alice"));
    // One-shot delivery: a second drain returns nothing.
    assert!(second.drain_notifications().is_empty());
}

#[tokio::test]
async fn test_login_from_fresh_session_loads_profile() {
    let (first, auth, documents, blobs) = create_test_system();
    first.sign_up("alice", "a@x.com", "pw1").await.unwrap();
    first.log_out().await.unwrap();

    let second = SessionManager::new(auth, documents, blobs);
    let profile = second.log_in("a@x.com", "pw1").await.unwrap();

    assert_eq!(profile.handle.as_deref(), Some("alice"));
    assert!(second.snapshot().unwrap().signed_in);
}

#[tokio::test]
async fn test_restore_rebuilds_session_from_backend() {
    let (first, auth, documents, blobs) = create_test_system();
    first.sign_up("alice", "a@x.com", "pw1").await.unwrap();

    // A new process over the same backend: the gateway still holds the
    // signed-in identity, so restore rebuilds the session.
    let second = SessionManager::new(auth, documents, blobs);
    let restored = second.restore().await.unwrap();

    assert!(restored);
    let state = second.snapshot().unwrap();
    assert!(state.signed_in);
    assert_eq!(state.profile.unwrap().handle.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_concurrent_upserts_both_land() {
    let (manager, _, documents, _) = create_test_system();
    let user_id = manager.sign_up("alice", "a@x.com", "pw1").await.unwrap();

    let m1 = manager.clone();
    let m2 = manager.clone();
    let (r1, r2) = futures::future::join(
        m1.upsert_profile(ProfilePatch {
            name: Some("Alice".to_string()),
            ..Default::default()
        }),
        m2.upsert_profile(ProfilePatch {
            bio: Some("Math tutor".to_string()),
            ..Default::default()
        }),
    )
    .await;

    r1.unwrap();
    r2.unwrap();

    // Whichever order the per-user lock granted, neither write was lost.
    let stored = documents
        .get(USERS_COLLECTION, &user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("name"), Some(&json!("Alice")));
    assert_eq!(stored.get("bio"), Some(&json!("Math tutor")));
    assert_eq!(stored.get("handle"), Some(&json!("alice")));
}

#[tokio::test]
async fn test_transport_failure_clears_busy_and_notifies_once() {
    let auth = Arc::new(InMemoryAuthGateway::new());
    let inner = Arc::new(market_stall::backend::documents::InMemoryDocumentStore::new());
    let flaky = Arc::new(FlakyDocumentStore::new(inner));
    let blobs = Arc::new(InMemoryBlobStore::new("https://blobs.test"));
    let manager = SessionManager::new(auth, flaky.clone(), blobs);

    manager.sign_up("alice", "a@x.com", "pw1").await.unwrap();
    manager.drain_notifications();

    flaky.set_fail_writes(true);
    let attempts_before = flaky.write_attempts();
    let result = manager
        .upsert_profile(ProfilePatch {
            bio: Some("unreachable".to_string()),
            ..Default::default()
        })
        .await;

    assert!(result.is_err());
    // One write was attempted and no retry followed.
    assert_eq!(flaky.write_attempts(), attempts_before + 1);

    let state = manager.snapshot().unwrap();
    assert!(!state.busy);
    // The in-memory profile kept its pre-failure value.
    assert!(state.profile.unwrap().bio.is_none());

    let notifications = manager.drain_notifications();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].message.starts_with("Profile update failed"));

    // The backend recovers and the same patch goes through.
    flaky.set_fail_writes(false);
    let profile = manager
        .upsert_profile(ProfilePatch {
            bio: Some("reachable".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(profile.bio.as_deref(), Some("reachable"));
}

#[tokio::test]
async fn test_failed_operations_count_in_stats() {
    let (manager, _, _, _) = create_test_system();

    let _ = manager.sign_up("", "", "").await;
    let _ = manager.log_in("nobody@x.com", "pw").await;

    let stats = manager.stats().unwrap();
    assert_eq!(stats.failures, 2);
    assert_eq!(stats.sign_ups, 0);
    assert_eq!(stats.sign_ins, 0);
}
