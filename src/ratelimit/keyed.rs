use std::{hash::Hash, time::Duration};

use dashmap::DashMap;
use shorty_error::{RateLimitError, ValidationError};
use tokio::time::Instant;
use tracing::debug;

use super::{BucketState, RateLimitConfig};

/// One token bucket per key, all with the same configuration.
///
/// Buckets are created full on first use. Call [`Self::evict_idle`]
/// periodically to drop buckets of clients that went away.
#[derive(Debug)]
pub struct KeyedRateLimiter<K = String>
where
    K: Eq + Hash,
{
    config: RateLimitConfig,
    buckets: DashMap<K, BucketState>,
}

impl<K> KeyedRateLimiter<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(config: RateLimitConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            config,
            buckets: DashMap::new(),
        })
    }

    pub fn allow(
        &self,
        key: &K,
    ) -> bool {
        self.check(key).is_ok()
    }

    pub fn check(
        &self,
        key: &K,
    ) -> Result<(), RateLimitError> {
        let mut bucket = self
            .buckets
            .entry(key.clone())
            .or_insert_with(|| BucketState::new(self.config));
        bucket
            .try_acquire()
            .map_err(|retry_after| RateLimitError { retry_after })
    }

    /// Drops buckets untouched for at least `older_than`. Returns how many
    /// were removed.
    pub fn evict_idle(
        &self,
        older_than: Duration,
    ) -> usize {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill()) < older_than);
        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            debug!(removed, "evicted idle rate limit buckets");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
