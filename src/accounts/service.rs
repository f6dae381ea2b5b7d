use std::sync::Arc;

use shorty_error::{bail, AuthError, ConflictError, ResultExt, ShortyResult, ValidationError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Account, AccountStore};
use crate::{
    auth::{
        ensure_password_changed, validate_password, validate_username, CredentialManager,
        IssuedToken, SessionTokenService, ValidatedSession,
    },
    clock::{Millis, SharedClock},
    engine::Storage,
    ids::{IdentifierAllocator, Namespace},
};

/// Token service checking against the account store.
pub type AccountTokens<S> = SessionTokenService<AccountStore<S>>;

/// Registration, login and the authenticated account mutations.
pub struct AccountService<S> {
    accounts: AccountStore<S>,
    allocator: Arc<IdentifierAllocator<S>>,
    credentials: CredentialManager,
    tokens: Arc<AccountTokens<S>>,
    clock: SharedClock,
    /// Verified against when the username is unknown, so both login
    /// failures cost one hash verification.
    decoy_hash: String,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl<S: Storage> AccountService<S> {
    pub fn new(
        accounts: AccountStore<S>,
        allocator: Arc<IdentifierAllocator<S>>,
        credentials: CredentialManager,
        tokens: Arc<AccountTokens<S>>,
        clock: SharedClock,
    ) -> Result<Self, AuthError> {
        let decoy_hash = credentials.hash("decoy-Passw0rd")?;
        Ok(Self {
            accounts,
            allocator,
            credentials,
            tokens,
            clock,
            decoy_hash,
        })
    }

    pub fn accounts(&self) -> &AccountStore<S> {
        &self.accounts
    }

    pub fn tokens(&self) -> &Arc<AccountTokens<S>> {
        &self.tokens
    }

    /// Creates an account.
    ///
    /// The record is written create-only under a fresh id, then the username
    /// is claimed with set-if-absent. Losing that claim removes the record
    /// again, so of two concurrent registrations of one name exactly one
    /// account survives.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> ShortyResult<Account> {
        validate_username(username)?;
        validate_password(password)?;

        if self
            .accounts
            .username_exists(username)
            .await
            .context("check username")?
        {
            bail!(ConflictError::UsernameTaken {
                username: username.to_string(),
            });
        }

        let hash = self
            .credentials
            .hash_blocking(password.to_string())
            .await?;
        let now = self.clock.now_millis();

        let accounts = self.accounts.clone();
        let id = self
            .allocator
            .allocate_and_claim(&Namespace::user(), cancel, |id| {
                let accounts = accounts.clone();
                let account = Account::new(id, username.to_string(), hash.clone(), now);
                async move { accounts.create(&account).await }
            })
            .await
            .context("allocate user id")?;

        let reserved = self
            .accounts
            .reserve_username(username, &id)
            .await
            .context("reserve username");
        match reserved {
            Ok(true) => {}
            Ok(false) => {
                self.accounts
                    .delete_record(&id)
                    .await
                    .context("roll back account record")?;
                debug!(user_id = %id, "username claimed concurrently");
                bail!(ConflictError::UsernameTaken {
                    username: username.to_string(),
                });
            }
            Err(err) => {
                if let Err(rollback) = self.accounts.delete_record(&id).await {
                    warn!(user_id = %id, error = %rollback, "failed to roll back account record");
                }
                return Err(err);
            }
        }

        info!(user_id = %id, "account registered");
        Ok(Account::new(id, username.to_string(), hash, now))
    }

    /// Checks credentials and issues a token.
    ///
    /// Unknown usernames and wrong passwords fail identically. A hash made
    /// with outdated parameters is replaced on success.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> ShortyResult<IssuedToken> {
        let account = self
            .accounts
            .find_by_username(username)
            .await
            .context("load account")?;

        let Some(account) = account else {
            self.credentials
                .verify_blocking(password.to_string(), self.decoy_hash.clone())
                .await;
            bail!(AuthError::InvalidCredentials);
        };
        if !self
            .credentials
            .verify_blocking(password.to_string(), account.password_hash.clone())
            .await
        {
            debug!(user_id = %account.id, "wrong password");
            bail!(AuthError::InvalidCredentials);
        }

        if self.credentials.needs_rehash(&account.password_hash) {
            self.upgrade_hash(&account, password).await;
        }

        let issued = self
            .tokens
            .issue_not_before(&account.username, account.updated_at)?;
        info!(user_id = %account.id, "login succeeded");
        Ok(issued)
    }

    /// Validates `token` against the live account and returns the session
    /// together with its sliding replacement.
    pub async fn authenticate(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> ShortyResult<(ValidatedSession, IssuedToken)> {
        self.tokens.validate_and_refresh(token, cancel).await
    }

    /// Replaces the password. Every token issued before the change,
    /// including `token`, stops validating.
    pub async fn change_password(
        &self,
        token: &str,
        current: &str,
        new: &str,
        cancel: &CancellationToken,
    ) -> ShortyResult<()> {
        let session = self.tokens.validate(token, cancel).await?;
        let changed_at = self.change_stamp(&session);
        let account = session.account;
        if !self
            .credentials
            .verify_blocking(current.to_string(), account.password_hash.clone())
            .await
        {
            bail!(AuthError::InvalidCredentials);
        }
        validate_password(new)?;
        ensure_password_changed(current, new)?;

        let hash = self.credentials.hash_blocking(new.to_string()).await?;
        let updated = self
            .accounts
            .update_password(&account.id, &hash, changed_at)
            .await
            .context("store password")?;
        if !updated {
            bail!(AuthError::AccountNotFound {
                username: account.username,
            });
        }

        info!(user_id = %account.id, "password changed");
        Ok(())
    }

    /// Renames the account. Earlier tokens stop validating; the returned
    /// token is issued for the new name. The old name becomes free.
    pub async fn change_username(
        &self,
        token: &str,
        password: &str,
        new_username: &str,
        cancel: &CancellationToken,
    ) -> ShortyResult<IssuedToken> {
        let session = self.tokens.validate(token, cancel).await?;
        let changed_at = self.change_stamp(&session);
        let account = session.account;
        if !self
            .credentials
            .verify_blocking(password.to_string(), account.password_hash.clone())
            .await
        {
            bail!(AuthError::InvalidCredentials);
        }
        validate_username(new_username)?;
        if new_username == account.username {
            bail!(ValidationError::UsernameUnchanged);
        }

        if !self
            .accounts
            .reserve_username(new_username, &account.id)
            .await
            .context("reserve username")?
        {
            bail!(ConflictError::UsernameTaken {
                username: new_username.to_string(),
            });
        }

        let updated = self
            .accounts
            .update_username(&account.id, new_username, changed_at)
            .await
            .context("store username");
        match updated {
            Ok(true) => {}
            Ok(false) => {
                self.release_quietly(new_username, &account.id).await;
                bail!(AuthError::AccountNotFound {
                    username: account.username,
                });
            }
            Err(err) => {
                self.release_quietly(new_username, &account.id).await;
                return Err(err);
            }
        }
        self.accounts
            .release_username(&account.username, &account.id)
            .await
            .context("release old username")?;

        let issued = self.tokens.issue_not_before(new_username, changed_at)?;
        info!(user_id = %account.id, "username changed");
        Ok(issued)
    }

    /// `updated_at` for a mutation made through `session`.
    ///
    /// Tokens carry millisecond `iat`s that never exceed
    /// `max(now, updated_at)`, so one past that is later than every token
    /// issued so far, including ones from the current millisecond.
    fn change_stamp(
        &self,
        session: &ValidatedSession,
    ) -> Millis {
        self.clock
            .now_millis()
            .max(session.account.updated_at)
            .max(session.claims.iat)
            .saturating_add(1)
    }

    async fn upgrade_hash(
        &self,
        account: &Account,
        password: &str,
    ) {
        let result = match self.credentials.hash_blocking(password.to_string()).await {
            Ok(hash) => self
                .accounts
                .upgrade_password_hash(&account.id, &hash)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match result {
            Ok(_) => debug!(user_id = %account.id, "password hash upgraded"),
            Err(error) => warn!(user_id = %account.id, %error, "password hash upgrade failed"),
        }
    }

    async fn release_quietly(
        &self,
        username: &str,
        id: &str,
    ) {
        if let Err(error) = self.accounts.release_username(username, id).await {
            warn!(user_id = %id, %error, "failed to release username reservation");
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
