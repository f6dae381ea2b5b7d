//! Identifiers unique within a namespace.
//!
//! Two strategies share one entry point, [`IdentifierAllocator::allocate`]:
//! a sequential counter and random draws checked against the store. The
//! output of the random strategy is only probably free: callers finish with
//! a create-only write, which [`IdentifierAllocator::allocate_and_claim`]
//! wraps in a bounded retry.

pub mod allocator;
pub mod alphabet;
pub mod namespace;

pub use allocator::*;
pub use alphabet::*;
pub use namespace::*;
