//! Wires the components into one application over a [`Storage`] backend.

use std::sync::Arc;

use shorty_error::ShortyResult;
use tokio_util::sync::CancellationToken;

use crate::{
    accounts::{AccountService, AccountStore},
    apikeys::{ApiKeyService, IssuedApiKey},
    auth::{CredentialManager, IssuedToken, SessionTokenService},
    clock::SharedClock,
    config::{Secrets, Settings},
    engine::Storage,
    ids::{AllocatorConfig, IdentifierAllocator, Namespace},
    links::{LinkService, ShortLink},
    ratelimit::RateLimiter,
};

pub struct App<S> {
    pub accounts: AccountService<S>,
    pub links: LinkService<S>,
    pub api_keys: ApiKeyService<S>,
    pub limiter: RateLimiter,
}

impl<S: Storage> App<S> {
    pub fn new(
        settings: &Settings,
        secrets: Secrets,
        store: Arc<S>,
        clock: SharedClock,
    ) -> ShortyResult<Self> {
        let allocator = Arc::new(
            IdentifierAllocator::new(store.clone(), AllocatorConfig::default())
                .with_namespace(Namespace::user(), settings.ids.user.clone())
                .with_namespace(Namespace::api_key(), settings.ids.apikey.clone())
                .with_namespace(Namespace::url_code(), settings.ids.urlcode.clone()),
        );
        let credentials = CredentialManager::new(secrets.pepper, settings.auth.hashing.clone())?;
        let account_store = AccountStore::new(store.clone());
        let tokens = Arc::new(SessionTokenService::new(
            settings.auth.token_config(secrets.signing_secret),
            Arc::new(account_store.clone()),
            clock.clone(),
        )?);

        Ok(Self {
            accounts: AccountService::new(
                account_store,
                allocator.clone(),
                credentials.clone(),
                tokens,
                clock.clone(),
            )?,
            links: LinkService::new(store.clone(), allocator.clone(), clock.clone()),
            api_keys: ApiKeyService::new(store, allocator, credentials, clock),
            limiter: RateLimiter::new(settings.rate_limit)?,
        })
    }

    /// Global admission check run before every request.
    pub fn admit(&self) -> ShortyResult<()> {
        Ok(self.limiter.check()?)
    }

    /// Shortens `url` for the token's owner.
    pub async fn shorten(
        &self,
        token: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> ShortyResult<(ShortLink, IssuedToken)> {
        let (session, fresh) = self.accounts.authenticate(token, cancel).await?;
        let link = self
            .links
            .shorten(&session.account.id, url, cancel)
            .await?;
        Ok((link, fresh))
    }

    /// Issues an API key for the token's owner.
    pub async fn issue_api_key(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> ShortyResult<(IssuedApiKey, IssuedToken)> {
        let (session, fresh) = self.accounts.authenticate(token, cancel).await?;
        let key = self.api_keys.issue(&session.account.id, cancel).await?;
        Ok((key, fresh))
    }
}
