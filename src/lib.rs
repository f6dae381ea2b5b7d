//! Accounts, session tokens and short identifiers over a key-value store.
//!
//! Registration hashes a peppered password and stores the account under an
//! identifier from the [`ids`] allocator. Login issues a signed session
//! token that stays valid only while the account is unchanged since the
//! token was issued. The same allocator hands out short link codes and API
//! key ids.

/// Wiring of all services over one store.
pub mod app;
/// Account records, the store adapter and account flows.
pub mod accounts;
/// API keys: issuance and verification.
pub mod apikeys;
/// Passwords, session tokens, token transport and input validation.
pub mod auth;
/// Console command parsing and execution.
pub mod cli;
/// Time source for stored timestamps and token claims.
pub mod clock;
/// Settings and process secrets.
pub mod config;
/// Key-value storage abstraction and the in-memory backend.
pub mod engine;
/// Identifier allocation per namespace.
pub mod ids;
/// Short links and their view counters.
pub mod links;
/// Logging setup (filters, formats, sinks).
pub mod logging;
/// Token-bucket admission control.
pub mod ratelimit;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

pub use accounts::{Account, AccountService, AccountStore};
pub use apikeys::{ApiKey, ApiKeyService, IssuedApiKey};
pub use app::App;
pub use auth::{
    AccountLookup, CredentialManager, HashingConfig, IssuedToken, PasswordAlgorithm, Secret,
    SessionTokenService, TokenClaims, TokenConfig, ValidatedSession,
};
pub use clock::{Clock, ManualClock, Millis, SharedClock, SystemClock};
pub use config::{ConfigError, Secrets, Settings};
#[cfg(any(test, feature = "testing"))]
pub use engine::{FaultMode, FaultyStore};
pub use engine::{HashFields, InMemoryStore, Storage, Value};
pub use ids::{Alphabet, AllocatorConfig, IdentifierAllocator, Namespace, Strategy};
pub use links::{LinkService, ShortLink};
pub use ratelimit::{KeyedRateLimiter, RateLimitConfig, RateLimiter};
pub use shorty_error::{ShortyResult, StackError, StatusCode};
