use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use sha2::Sha256;
use shorty_error::{bail, AuthError, ResultExt, ShortyResult, StatusCode, StorageError};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::{Secret, TokenClaims};
use crate::{
    accounts::Account,
    clock::{Millis, SharedClock},
};

/// Source of the live account state a token is checked against.
#[async_trait]
pub trait AccountLookup: Send + Sync + 'static {
    /// `None` if no account has this username.
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, StorageError>;
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub signing_secret: Secret,
    pub ttl: Duration,
}

/// Signed token plus the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

/// Outcome of a successful validation.
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub claims: TokenClaims,
    pub account: Account,
}

/// Issues, validates and slides HMAC-SHA256 signed session tokens.
///
/// A token is valid while its signature verifies, `now < exp`, and it was
/// issued no earlier than the account's `updated_at`. The last rule is
/// re-derived on every validation from the live account, so changing a
/// password or username invalidates every earlier token without a
/// revocation list.
pub struct SessionTokenService<L> {
    key: Hmac<Sha256>,
    ttl_ms: Millis,
    lookup: Arc<L>,
    clock: SharedClock,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl TokenConfig {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

    pub fn with_secret(signing_secret: Secret) -> Self {
        Self {
            signing_secret,
            ttl: Self::DEFAULT_TTL,
        }
    }

    pub fn ttl(
        mut self,
        ttl: Duration,
    ) -> Self {
        self.ttl = ttl;
        self
    }
}

impl IssuedToken {
    pub fn expires_at(&self) -> Millis {
        self.claims.exp
    }
}

impl<L: AccountLookup> SessionTokenService<L> {
    pub fn new(
        config: TokenConfig,
        lookup: Arc<L>,
        clock: SharedClock,
    ) -> Result<Self, AuthError> {
        if config.signing_secret.is_empty() {
            return Err(AuthError::SigningFailed {
                reason: "empty signing secret".to_string(),
            });
        }
        let ttl_ms = Millis::try_from(config.ttl.as_millis()).unwrap_or(Millis::MAX);
        if ttl_ms <= 0 {
            return Err(AuthError::SigningFailed {
                reason: "token TTL must be positive".to_string(),
            });
        }
        let key = Hmac::<Sha256>::new_from_slice(config.signing_secret.as_bytes()).map_err(|e| {
            AuthError::SigningFailed {
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            key,
            ttl_ms,
            lookup,
            clock,
        })
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms as u64)
    }

    /// New token for `username`, valid from now for one TTL.
    pub fn issue(
        &self,
        username: &str,
    ) -> Result<IssuedToken, AuthError> {
        self.issue_not_before(username, Millis::MIN)
    }

    /// Like [`Self::issue`], but `iat` is at least `not_before`. Pass the
    /// account's `updated_at` so a token issued right after a change is not
    /// older than the change.
    pub fn issue_not_before(
        &self,
        username: &str,
        not_before: Millis,
    ) -> Result<IssuedToken, AuthError> {
        let iat = self.clock.now_millis().max(not_before);
        self.sign(username, iat, iat.saturating_add(self.ttl_ms))
    }

    /// Checks signature and claim shape only. No expiry or account check.
    pub fn decode(
        &self,
        token: &str,
    ) -> Result<TokenClaims, AuthError> {
        let claims: TokenClaims = token.verify_with_key(&self.key).map_err(|e| match e {
            jwt::Error::InvalidSignature
            | jwt::Error::RustCryptoMac(_)
            | jwt::Error::AlgorithmMismatch(..) => AuthError::SignatureInvalid,
            other => AuthError::MalformedClaims {
                reason: other.to_string(),
            },
        })?;
        claims.check()?;
        Ok(claims)
    }

    /// Full validation against the live account.
    pub async fn validate(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> ShortyResult<ValidatedSession> {
        let claims = self.decode(token)?;
        if claims.is_expired_at(self.clock.now_millis()) {
            debug!(jti = %claims.jti, "token expired");
            bail!(AuthError::TokenExpired);
        }

        let account = tokio::select! {
            biased;
            _ = cancel.cancelled() => bail!(StatusCode::Cancelled, "token validation cancelled"),
            res = self.lookup.find_by_username(&claims.sub) => {
                res.context("look up token account")?
            }
        };
        let Some(account) = account else {
            debug!(jti = %claims.jti, "token refers to a missing account");
            bail!(AuthError::AccountNotFound {
                username: claims.sub,
            });
        };
        if claims.predates(account.updated_at) {
            debug!(jti = %claims.jti, user_id = %account.id, "token predates account change");
            bail!(AuthError::TokenInvalidated {
                username: claims.sub,
            });
        }

        Ok(ValidatedSession { claims, account })
    }

    /// Token for the same subject whose expiry is strictly later than the
    /// one of `claims`. `iat` never moves past `max(now, claims.iat)`.
    pub fn refresh(
        &self,
        claims: &TokenClaims,
    ) -> Result<IssuedToken, AuthError> {
        let iat = self.clock.now_millis().max(claims.iat);
        let exp = iat
            .saturating_add(self.ttl_ms)
            .max(claims.exp.saturating_add(1));
        self.sign(&claims.sub, iat, exp)
    }

    /// Validates `token` and slides its expiry window.
    pub async fn validate_and_refresh(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> ShortyResult<(ValidatedSession, IssuedToken)> {
        let session = self.validate(token, cancel).await?;
        let fresh = self.refresh(&session.claims)?;
        Ok((session, fresh))
    }

    fn sign(
        &self,
        username: &str,
        iat: Millis,
        exp: Millis,
    ) -> Result<IssuedToken, AuthError> {
        let claims = TokenClaims {
            sub: username.to_string(),
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
        };
        let token = (&claims)
            .sign_with_key(&self.key)
            .map_err(|e| AuthError::SigningFailed {
                reason: e.to_string(),
            })?;
        Ok(IssuedToken { token, claims })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls for SessionTokenService
////////////////////////////////////////////////////////////////////////////////

impl<L> fmt::Debug for SessionTokenService<L> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SessionTokenService")
            .field("ttl_ms", &self.ttl_ms)
            .finish_non_exhaustive()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use parking_lot::RwLock;

    use super::*;
    use crate::clock::{Clock, ManualClock};

    const T0: Millis = 1_700_000_000_000;

    #[derive(Default)]
    struct Accounts(RwLock<HashMap<String, Account>>);

    impl Accounts {
        fn put(
            &self,
            username: &str,
            updated_at: Millis,
        ) {
            let account = Account {
                id: "1".into(),
                username: username.into(),
                password_hash: "h".into(),
                created_at: T0 - 1_000,
                updated_at,
            };
            self.0.write().insert(username.into(), account);
        }
    }

    #[async_trait]
    impl AccountLookup for Accounts {
        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<Account>, StorageError> {
            Ok(self.0.read().get(username).cloned())
        }
    }

    fn setup() -> (
        SessionTokenService<Accounts>,
        Arc<Accounts>,
        Arc<ManualClock>,
    ) {
        let accounts = Arc::new(Accounts::default());
        accounts.put("alice", T0 - 1_000);
        let clock = Arc::new(ManualClock::new(T0));
        let service = SessionTokenService::new(
            TokenConfig::with_secret(Secret::new("signing-secret")),
            accounts.clone(),
            clock.clone(),
        )
        .unwrap();
        (service, accounts, clock)
    }

    fn code_of(err: &shorty_error::StackError) -> StatusCode {
        err.status_code()
    }

    #[tokio::test]
    async fn test_issue_and_validate() {
        let (service, _, _) = setup();
        let issued = service.issue("alice").unwrap();
        assert_eq!(issued.claims.iat, T0);
        assert_eq!(issued.expires_at(), T0 + 30 * 60 * 1000);

        let session = service
            .validate(&issued.token, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(session.claims, issued.claims);
        assert_eq!(session.account.username, "alice");
    }

    #[tokio::test]
    async fn test_mutation_invalidates_earlier_tokens() {
        let (service, accounts, clock) = setup();
        let issued = service.issue("alice").unwrap();

        clock.advance(Duration::from_secs(5));
        accounts.put("alice", clock.now_millis());

        clock.advance(Duration::from_secs(5));
        let err = service
            .validate(&issued.token, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(code_of(&err), StatusCode::TokenInvalidated);
        assert!(matches!(
            err.downcast_ref::<AuthError>(),
            Some(AuthError::TokenInvalidated { .. })
        ));

        // A token issued after the change is fine.
        let fresh = service.issue("alice").unwrap();
        assert!(service
            .validate(&fresh.token, &CancellationToken::new())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_refresh_extends_expiry() {
        let (service, _, clock) = setup();
        let issued = service.issue("alice").unwrap();

        clock.advance(Duration::from_secs(60));
        let (_, fresh) = service
            .validate_and_refresh(&issued.token, &CancellationToken::new())
            .await
            .unwrap();
        assert!(fresh.expires_at() > issued.expires_at());
        assert_eq!(fresh.claims.iat, T0 + 60_000);
        assert_ne!(fresh.claims.jti, issued.claims.jti);
    }

    #[tokio::test]
    async fn test_refresh_within_same_millisecond_is_still_later() {
        let (service, _, _) = setup();
        let issued = service.issue("alice").unwrap();
        let (_, fresh) = service
            .validate_and_refresh(&issued.token, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(fresh.expires_at(), issued.expires_at() + 1);
        assert_eq!(fresh.claims.iat, T0);
    }

    #[tokio::test]
    async fn test_refreshed_token_dies_with_change_in_same_millisecond() {
        let (service, accounts, clock) = setup();
        let issued = service.issue("alice").unwrap();
        let (_, fresh) = service
            .validate_and_refresh(&issued.token, &CancellationToken::new())
            .await
            .unwrap();

        // Mutation stamped the way the account service does it.
        accounts.put("alice", clock.now_millis().max(T0 - 1_000) + 1);

        for token in [&issued.token, &fresh.token] {
            let err = service
                .validate(token, &CancellationToken::new())
                .await
                .unwrap_err();
            assert_eq!(code_of(&err), StatusCode::TokenInvalidated);
        }

        let after = service.issue_not_before("alice", T0 + 1).unwrap();
        assert_eq!(after.claims.iat, T0 + 1);
        assert!(service
            .validate(&after.token, &CancellationToken::new())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_expired() {
        let (service, _, clock) = setup();
        let issued = service.issue("alice").unwrap();
        clock.advance(TokenConfig::DEFAULT_TTL);

        let err = service
            .validate(&issued.token, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(code_of(&err), StatusCode::TokenExpired);
    }

    #[tokio::test]
    async fn test_wrong_key_and_tampering_look_the_same() {
        let (service, accounts, clock) = setup();
        let other = SessionTokenService::new(
            TokenConfig::with_secret(Secret::new("another-secret")),
            accounts,
            clock,
        )
        .unwrap();

        let foreign = other.issue("alice").unwrap();
        assert!(matches!(
            service.decode(&foreign.token),
            Err(AuthError::SignatureInvalid)
        ));

        let issued = service.issue("alice").unwrap();
        let parts: Vec<&str> = issued.token.split('.').collect();
        let mut forged = issued.claims.clone();
        forged.sub = "mallory".into();
        let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{}.{forged}.{}", parts[0], parts[2]);
        assert!(matches!(
            service.decode(&tampered),
            Err(AuthError::SignatureInvalid)
        ));
    }

    #[tokio::test]
    async fn test_garbage_is_malformed() {
        let (service, _, _) = setup();
        for token in ["", "abc", "a.b", "a.b.c.d"] {
            let err = service.decode(token).unwrap_err();
            assert!(
                matches!(
                    err,
                    AuthError::MalformedClaims { .. } | AuthError::SignatureInvalid
                ),
                "{token}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_deleted_account() {
        let (service, accounts, _) = setup();
        let issued = service.issue("alice").unwrap();
        accounts.0.write().clear();

        let err = service
            .validate(&issued.token, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthError>(),
            Some(AuthError::AccountNotFound { .. })
        ));
        assert_eq!(err.status_code().http_status(), 401);
    }

    #[tokio::test]
    async fn test_cancelled_validation() {
        let (service, _, _) = setup();
        let issued = service.issue("alice").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service.validate(&issued.token, &cancel).await.unwrap_err();
        assert_eq!(code_of(&err), StatusCode::Cancelled);
    }

    #[test]
    fn test_empty_secret_rejected() {
        let accounts = Arc::new(Accounts::default());
        let clock = Arc::new(ManualClock::new(T0));
        assert!(SessionTokenService::new(
            TokenConfig::with_secret(Secret::new("")),
            accounts,
            clock,
        )
        .is_err());
    }
}
