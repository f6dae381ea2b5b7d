//! Credentials and session tokens.
//!
//! [`CredentialManager`] turns passwords into peppered, salted hashes and
//! checks them back. [`SessionTokenService`] issues signed tokens whose
//! validity is re-derived from the live account on every request.

pub mod claims;
pub mod password;
pub mod secret;
pub mod tokens;
pub mod transport;
pub mod validation;

pub use claims::*;
pub use password::*;
pub use secret::*;
pub use tokens::*;
pub use validation::*;
