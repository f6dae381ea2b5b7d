//! Key-value store abstraction the core talks to.
//!
//! - `storage`: the async [`Storage`] trait with the primitives the core
//!   consumes (get/set/set-if-absent/incr/exists/hash operations/del).
//! - `memory`: [`InMemoryStore`], a `DashMap` backed implementation with lazy
//!   TTL expiry.
//! - `faulty`: `FaultyStore`, a wrapper that injects collisions and outages.
//!   Built for tests and with the `testing` feature.
//! - `value`: the [`Value`] kinds a key can hold.

#[cfg(any(test, feature = "testing"))]
pub mod faulty;
pub mod memory;
pub mod storage;
pub mod value;

#[cfg(any(test, feature = "testing"))]
pub use faulty::*;
pub use memory::*;
pub use storage::*;
pub use value::*;
