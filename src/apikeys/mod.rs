//! API keys of the form `<id>.<secret>`.
//!
//! Only a hash of the secret is stored. The plaintext key is handed out
//! once, when it is issued.

pub mod service;

pub use service::*;
