use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use parking_lot::Mutex;
use serde::Deserialize;
use shorty_error::{RateLimitError, ValidationError};
use tokio::time::Instant;
use tracing::warn;

/// Sustained rate (tokens per second) and burst capacity of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub rate: f64,
    pub burst: u32,
}

#[derive(Debug)]
pub(crate) struct BucketState {
    tokens: f64,
    last_refill: Instant,
    config: RateLimitConfig,
}

/// Single shared token bucket.
///
/// The mutex is held only for the O(1) refill-and-consume step.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<BucketState>,
    allowed: AtomicU64,
    rejected: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub allowed: u64,
    pub rejected: u64,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl RateLimitConfig {
    pub fn new(
        rate: f64,
        burst: u32,
    ) -> Result<Self, ValidationError> {
        let config = Self { rate, burst };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(ValidationError::InvalidArgument {
                reason: format!("rate must be a positive number, got {}", self.rate),
            });
        }
        if self.burst == 0 {
            return Err(ValidationError::InvalidArgument {
                reason: "burst must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl BucketState {
    /// Starts full.
    pub(crate) fn new(config: RateLimitConfig) -> Self {
        Self {
            tokens: f64::from(config.burst),
            last_refill: Instant::now(),
            config,
        }
    }

    /// Consumes one token, or returns the wait until one is available.
    pub(crate) fn try_acquire(&mut self) -> Result<(), Duration> {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_refill);
        let refill = elapsed.as_secs_f64() * self.config.rate;
        self.tokens = (self.tokens + refill).min(f64::from(self.config.burst));
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(deficit / self.config.rate))
        }
    }

    pub(crate) fn last_refill(&self) -> Instant {
        self.last_refill
    }
}

impl RateLimiter {
    /// Fails on a config that [`RateLimitConfig::validate`] rejects, since a
    /// zero rate has no finite retry hint.
    pub fn new(config: RateLimitConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            bucket: Mutex::new(BucketState::new(config)),
            allowed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        })
    }

    /// Consumes a token if one is available. Never waits.
    pub fn allow(&self) -> bool {
        self.check().is_ok()
    }

    /// Like [`Self::allow`], with the time until a token is available on
    /// rejection.
    pub fn check(&self) -> Result<(), RateLimitError> {
        let result = self.bucket.lock().try_acquire();
        match result {
            Ok(()) => {
                self.allowed.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(retry_after) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(retry_after_ms = retry_after.as_millis() as u64, "request rate limited");
                Err(RateLimitError { retry_after })
            }
        }
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            allowed: self.allowed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate: 10.0,
            burst: 20,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
