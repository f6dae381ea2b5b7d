use std::{fmt, time::Duration};

use crate::{ErrorExt, StatusCode};

/// Admission rejected by a token bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitError {
    /// Time until the bucket holds a whole token again.
    pub retry_after: Duration,
}

impl fmt::Display for RateLimitError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "Rate limit exceeded, retry after {}ms",
            self.retry_after.as_millis()
        )
    }
}

impl std::error::Error for RateLimitError {}

impl ErrorExt for RateLimitError {
    fn status_code(&self) -> StatusCode {
        StatusCode::RateLimited
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn client_message(&self) -> String {
        // Round up so a client never retries too early.
        let secs = self.retry_after.as_millis().div_ceil(1000).max(1);
        format!("Too many requests, retry after {secs}s")
    }
}
