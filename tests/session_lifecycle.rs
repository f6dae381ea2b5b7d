//! Session token lifecycle against a live account: issue, slide, expire
//! and invalidation by account changes.

mod common;

use std::{sync::Arc, time::Duration};

use shorty::{App, InMemoryStore, ManualClock, Secret, StatusCode};
use tokio_util::sync::CancellationToken;

const TTL: Duration = Duration::from_secs(30 * 60);

// =============================================================================
// Invalidation by account changes
// =============================================================================

#[tokio::test]
async fn test_password_change_invalidates_earlier_tokens() {
    let (app, _, clock) = common::app();
    let cancel = CancellationToken::new();
    app.accounts
        .register("alice", common::PASSWORD, &cancel)
        .await
        .unwrap();

    // t0: log in
    let first = app.accounts.login("alice", common::PASSWORD).await.unwrap();
    assert_eq!(first.claims.iat, common::T0);

    // t0 + 5s: password change bumps updated_at
    clock.advance(Duration::from_secs(5));
    app.accounts
        .change_password(&first.token, common::PASSWORD, "N3wPassword", &cancel)
        .await
        .unwrap();

    // t0 + 10s: the old token is rejected, a new login works
    clock.advance(Duration::from_secs(5));
    let err = app
        .accounts
        .authenticate(&first.token, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::TokenInvalidated);

    let second = app.accounts.login("alice", "N3wPassword").await.unwrap();
    let (session, _) = app
        .accounts
        .authenticate(&second.token, &cancel)
        .await
        .unwrap();
    assert_eq!(session.account.username, "alice");
    // One past the change, so tokens from that millisecond are older.
    assert_eq!(session.account.updated_at, common::T0 + 5_001);
}

#[tokio::test]
async fn test_change_within_one_millisecond_of_issue() {
    let (app, _, _) = common::app();
    let cancel = CancellationToken::new();
    app.accounts
        .register("hank", common::PASSWORD, &cancel)
        .await
        .unwrap();

    // Clock frozen at t0 for the whole test.
    let first = app.accounts.login("hank", common::PASSWORD).await.unwrap();
    let (_, refreshed) = app
        .accounts
        .authenticate(&first.token, &cancel)
        .await
        .unwrap();
    assert!(refreshed.claims.iat <= common::T0);

    app.accounts
        .change_password(&first.token, common::PASSWORD, "N3wPassword", &cancel)
        .await
        .unwrap();

    for token in [&first.token, &refreshed.token] {
        let err = app
            .accounts
            .authenticate(token, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::TokenInvalidated);
    }

    let renamed_from = app.accounts.login("hank", "N3wPassword").await.unwrap();
    let renamed = app
        .accounts
        .change_username(&renamed_from.token, "N3wPassword", "henry", &cancel)
        .await
        .unwrap();
    let err = app
        .accounts
        .authenticate(&renamed_from.token, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.class(), shorty_error::ErrorClass::Auth);
    assert!(app
        .accounts
        .authenticate(&renamed.token, &cancel)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_every_outstanding_token_dies_with_password_change() {
    let (app, _, clock) = common::app();
    let cancel = CancellationToken::new();
    app.accounts
        .register("alice", common::PASSWORD, &cancel)
        .await
        .unwrap();

    let mut tokens = Vec::new();
    for _ in 0..3 {
        tokens.push(app.accounts.login("alice", common::PASSWORD).await.unwrap());
        clock.advance(Duration::from_secs(1));
    }
    app.accounts
        .change_password(&tokens[2].token, common::PASSWORD, "N3wPassword", &cancel)
        .await
        .unwrap();
    clock.advance(Duration::from_secs(1));

    for issued in &tokens {
        let err = app
            .accounts
            .authenticate(&issued.token, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::TokenInvalidated);
    }
}

#[tokio::test]
async fn test_rename_invalidates_and_returns_fresh_token() {
    let (app, _, clock) = common::app();
    let cancel = CancellationToken::new();
    app.accounts
        .register("alice", common::PASSWORD, &cancel)
        .await
        .unwrap();
    let old = app.accounts.login("alice", common::PASSWORD).await.unwrap();

    clock.advance(Duration::from_secs(5));
    let fresh = app
        .accounts
        .change_username(&old.token, common::PASSWORD, "alicia", &cancel)
        .await
        .unwrap();
    assert_eq!(fresh.claims.sub, "alicia");

    clock.advance(Duration::from_secs(5));
    let err = app
        .accounts
        .authenticate(&old.token, &cancel)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err.status_code(),
            StatusCode::InvalidToken | StatusCode::TokenInvalidated
        ),
        "{err}"
    );

    let (session, _) = app
        .accounts
        .authenticate(&fresh.token, &cancel)
        .await
        .unwrap();
    assert_eq!(session.account.username, "alicia");

    let err = app
        .accounts
        .login("alice", common::PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::InvalidCredentials);
    assert!(app.accounts.login("alicia", common::PASSWORD).await.is_ok());
}

// =============================================================================
// Sliding expiry
// =============================================================================

#[tokio::test]
async fn test_refresh_extends_expiry() {
    let (app, _, clock) = common::app();
    let cancel = CancellationToken::new();
    app.accounts
        .register("bob", common::PASSWORD, &cancel)
        .await
        .unwrap();
    let issued = app.accounts.login("bob", common::PASSWORD).await.unwrap();
    assert_eq!(issued.expires_at(), common::T0 + TTL.as_millis() as i64);

    clock.advance(Duration::from_secs(20 * 60));
    let (_, refreshed) = app
        .accounts
        .authenticate(&issued.token, &cancel)
        .await
        .unwrap();
    assert!(refreshed.expires_at() > issued.expires_at());
    assert_ne!(refreshed.claims.jti, issued.claims.jti);

    // Past the first expiry, inside the second.
    clock.advance(Duration::from_secs(20 * 60));
    let err = app
        .accounts
        .authenticate(&issued.token, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::TokenExpired);
    assert!(app
        .accounts
        .authenticate(&refreshed.token, &cancel)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_refresh_in_same_millisecond_still_moves_expiry() {
    let (app, _, _) = common::app();
    let cancel = CancellationToken::new();
    app.accounts
        .register("carol", common::PASSWORD, &cancel)
        .await
        .unwrap();
    let issued = app.accounts.login("carol", common::PASSWORD).await.unwrap();

    let (_, refreshed) = app
        .accounts
        .authenticate(&issued.token, &cancel)
        .await
        .unwrap();
    assert!(refreshed.expires_at() > issued.expires_at());
}

#[tokio::test]
async fn test_expiry_is_exclusive() {
    let (app, _, clock) = common::app();
    let cancel = CancellationToken::new();
    app.accounts
        .register("dave", common::PASSWORD, &cancel)
        .await
        .unwrap();
    let issued = app.accounts.login("dave", common::PASSWORD).await.unwrap();

    clock.set(issued.expires_at() - 1);
    assert!(app
        .accounts
        .authenticate(&issued.token, &cancel)
        .await
        .is_ok());

    clock.set(issued.expires_at());
    let err = app
        .accounts
        .authenticate(&issued.token, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::TokenExpired);
}

// =============================================================================
// Rejected tokens
// =============================================================================

#[tokio::test]
async fn test_garbage_and_foreign_tokens_rejected() {
    let (app, _, _) = common::app();
    let cancel = CancellationToken::new();
    app.accounts
        .register("erin", common::PASSWORD, &cancel)
        .await
        .unwrap();
    let issued = app.accounts.login("erin", common::PASSWORD).await.unwrap();

    let err = app
        .accounts
        .authenticate("not-a-token", &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::InvalidToken);

    // Same account name, different signing secret.
    let mut secrets = common::secrets();
    secrets.signing_secret = Secret::new("another-secret");
    let other = App::new(
        &common::settings(),
        secrets,
        Arc::new(InMemoryStore::new()),
        Arc::new(ManualClock::new(common::T0)),
    )
    .unwrap();
    other
        .accounts
        .register("erin", common::PASSWORD, &cancel)
        .await
        .unwrap();
    let err = other
        .accounts
        .authenticate(&issued.token, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::InvalidToken);
}

#[tokio::test]
async fn test_deleted_account_token_rejected() {
    let (app, _, _) = common::app();
    let cancel = CancellationToken::new();
    let account = app
        .accounts
        .register("frank", common::PASSWORD, &cancel)
        .await
        .unwrap();
    let issued = app.accounts.login("frank", common::PASSWORD).await.unwrap();

    assert!(app.accounts.accounts().delete(&account).await.unwrap());
    let err = app
        .accounts
        .authenticate(&issued.token, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::InvalidToken);
}

#[tokio::test]
async fn test_cancelled_validation() {
    let (app, _, _) = common::app();
    let cancel = CancellationToken::new();
    app.accounts
        .register("gina", common::PASSWORD, &cancel)
        .await
        .unwrap();
    let issued = app.accounts.login("gina", common::PASSWORD).await.unwrap();

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let err = app
        .accounts
        .authenticate(&issued.token, &cancelled)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::Cancelled);
}
