//! Short links and API keys issued through authenticated sessions.

mod common;

use std::{collections::HashSet, sync::Arc, time::Duration};

use shorty::{
    ids::Alphabet, FaultMode, FaultyStore, ManualClock, Namespace, StatusCode, Storage,
};
use tokio_util::sync::CancellationToken;

// =============================================================================
// Short links
// =============================================================================

#[tokio::test]
async fn test_shorten_resolve_and_count_views() {
    let (app, _, clock) = common::app();
    let cancel = CancellationToken::new();
    let account = app
        .accounts
        .register("alice", common::PASSWORD, &cancel)
        .await
        .unwrap();
    let issued = app.accounts.login("alice", common::PASSWORD).await.unwrap();

    let (link, fresh) = app
        .shorten(&issued.token, "https://example.com/a/long/path?q=1", &cancel)
        .await
        .unwrap();
    assert_eq!(link.code.len(), 8);
    assert!(link.code.chars().all(|c| Alphabet::alphanumeric().contains(c)));
    assert_eq!(link.user_id, account.id);
    assert_eq!(link.view_count, 0);
    assert!(fresh.expires_at() > issued.expires_at());

    clock.advance(Duration::from_secs(1));
    for expected in 1..=3 {
        let resolved = app.links.resolve(&link.code).await.unwrap();
        assert_eq!(resolved.original_url, "https://example.com/a/long/path?q=1");
        assert_eq!(resolved.view_count, expected);
    }
    let stats = app.links.stats(&link.code).await.unwrap();
    assert_eq!(stats.view_count, 3);
    assert_eq!(stats.created_at, common::T0);
}

#[tokio::test]
async fn test_codes_are_unique() {
    let (app, store, _) = common::app();
    let cancel = CancellationToken::new();
    let account = app
        .accounts
        .register("bob", common::PASSWORD, &cancel)
        .await
        .unwrap();

    let mut codes = HashSet::new();
    for i in 0..50 {
        let link = app
            .links
            .shorten(&account.id, &format!("https://example.com/{i}"), &cancel)
            .await
            .unwrap();
        assert!(codes.insert(link.code));
    }
    assert_eq!(store.count_prefix("urlcode:"), 50);
}

#[tokio::test]
async fn test_shorten_requires_valid_token_and_url() {
    let (app, _, _) = common::app();
    let cancel = CancellationToken::new();
    app.accounts
        .register("carol", common::PASSWORD, &cancel)
        .await
        .unwrap();
    let issued = app.accounts.login("carol", common::PASSWORD).await.unwrap();

    let err = app
        .shorten("bogus", "https://example.com", &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::InvalidToken);

    let err = app
        .shorten(&issued.token, "ftp://example.com", &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::InvalidUrl);
}

#[tokio::test]
async fn test_unknown_code_not_found() {
    let (app, _, _) = common::app();
    let err = app.links.resolve("nothere1").await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NotFound);
}

#[tokio::test]
async fn test_shorten_on_saturated_namespace() {
    let store = Arc::new(FaultyStore::new(FaultMode::Passthrough));
    let app = common::app_with(store.clone(), Arc::new(ManualClock::new(common::T0)));
    let cancel = CancellationToken::new();
    let account = app
        .accounts
        .register("dave", common::PASSWORD, &cancel)
        .await
        .unwrap();

    store.set_mode(FaultMode::AlwaysExists);
    let err = app
        .links
        .shorten(&account.id, "https://example.com", &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::AllocationExhausted);
    assert_eq!(store.inner().count_prefix("urlcode:"), 0);
}

// =============================================================================
// API keys
// =============================================================================

#[tokio::test]
async fn test_issue_verify_revoke() {
    let (app, store, _) = common::app();
    let cancel = CancellationToken::new();
    let account = app
        .accounts
        .register("erin", common::PASSWORD, &cancel)
        .await
        .unwrap();
    let issued = app.accounts.login("erin", common::PASSWORD).await.unwrap();

    let (key, _) = app.issue_api_key(&issued.token, &cancel).await.unwrap();
    assert_eq!(key.key.owner_id, account.id);
    assert_eq!(key.key.id.len(), 16);
    let plaintext = key.plaintext.expose().to_string();
    assert!(plaintext.starts_with(&format!("{}.", key.key.id)));

    // Only the hash is stored.
    let stored = store
        .hash_get_all(&Namespace::api_key().key(&key.key.id))
        .await
        .unwrap()
        .unwrap();
    let secret = plaintext.split_once('.').unwrap().1;
    assert!(stored.values().all(|v| !v.contains(secret)));

    let verified = app.api_keys.verify(&plaintext).await.unwrap();
    assert_eq!(verified.id, key.key.id);

    assert!(!app.api_keys.revoke("someone-else", &key.key.id).await.unwrap());
    assert!(app.api_keys.revoke(&account.id, &key.key.id).await.unwrap());
    let err = app.api_keys.verify(&plaintext).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::AuthFailed);
}

#[tokio::test]
async fn test_tampered_keys_rejected() {
    let (app, _, _) = common::app();
    let cancel = CancellationToken::new();
    let account = app
        .accounts
        .register("frank", common::PASSWORD, &cancel)
        .await
        .unwrap();
    let issued = app.api_keys.issue(&account.id, &cancel).await.unwrap();
    let plaintext = issued.plaintext.expose();
    let (id, secret) = plaintext.split_once('.').unwrap();

    let candidates = [
        String::new(),
        id.to_string(),
        format!("{id}."),
        format!(".{secret}"),
        format!("{id}.{secret}x"),
        format!("0000000000000000.{secret}"),
    ];
    for candidate in candidates {
        let err = app.api_keys.verify(&candidate).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::AuthFailed, "{candidate:?}");
    }
}
