//! Token-bucket admission control.
//!
//! [`RateLimiter`] is the single process-wide bucket checked before every
//! operation. It is coarse: one busy client can starve the others.
//! [`KeyedRateLimiter`] runs the same algorithm with one bucket per explicit
//! key (client id, address, account) for per-client fairness.

pub mod bucket;
pub mod keyed;

pub use bucket::*;
pub use keyed::*;
