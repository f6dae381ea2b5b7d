use std::sync::Arc;

use shorty_error::{bail, ResultExt, ShortyResult, StatusCode, ValidationError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{field, ShortLink};
use crate::{
    auth::validate_url,
    clock::SharedClock,
    engine::Storage,
    ids::{IdentifierAllocator, Namespace},
};

/// Creates and resolves short links stored at `urlcode:<code>`.
pub struct LinkService<S> {
    store: Arc<S>,
    allocator: Arc<IdentifierAllocator<S>>,
    clock: SharedClock,
}

impl<S: Storage> LinkService<S> {
    pub fn new(
        store: Arc<S>,
        allocator: Arc<IdentifierAllocator<S>>,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            allocator,
            clock,
        }
    }

    /// Stores `url` under a fresh random code owned by `user_id`.
    pub async fn shorten(
        &self,
        user_id: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> ShortyResult<ShortLink> {
        validate_url(url)?;

        let namespace = Namespace::url_code();
        let now = self.clock.now_millis();
        let store = self.store.clone();
        let code = self
            .allocator
            .allocate_and_claim(&namespace, cancel, |code| {
                let store = store.clone();
                let key = namespace.key(&code);
                let link = ShortLink::new(code, url.to_string(), user_id.to_string(), now);
                async move { store.hash_set_nx(&key, link.to_fields()).await }
            })
            .await
            .context("allocate short code")?;

        info!(user_id, %code, "short link created");
        Ok(ShortLink::new(
            code,
            url.to_string(),
            user_id.to_string(),
            now,
        ))
    }

    /// Looks the link up and counts the visit.
    pub async fn resolve(
        &self,
        code: &str,
    ) -> ShortyResult<ShortLink> {
        let mut link = self.load(code).await?;
        let key = Namespace::url_code().key(code);
        let Some(views) = self
            .store
            .hash_incr_by(&key, field::VIEW_COUNT, 1)
            .await
            .context("count view")?
        else {
            // Deleted after the load.
            bail!(StatusCode::NotFound, "short link not found: {}", code);
        };
        link.view_count = views;
        debug!(%code, views = link.view_count, "short link resolved");
        Ok(link)
    }

    /// Looks the link up without counting a visit.
    pub async fn stats(
        &self,
        code: &str,
    ) -> ShortyResult<ShortLink> {
        self.load(code).await
    }

    async fn load(
        &self,
        code: &str,
    ) -> ShortyResult<ShortLink> {
        if code.is_empty() || code.contains(':') || code.chars().any(char::is_whitespace) {
            bail!(ValidationError::InvalidArgument {
                reason: format!("malformed short code '{code}'"),
            });
        }
        let key = Namespace::url_code().key(code);
        let Some(fields) = self
            .store
            .hash_get_all(&key)
            .await
            .context("load short link")?
        else {
            bail!(StatusCode::NotFound, "short link not found: {}", code);
        };
        Ok(ShortLink::from_fields(&key, &fields)?)
    }
}
