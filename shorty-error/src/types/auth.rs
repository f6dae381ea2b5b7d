use std::fmt;

use crate::{ErrorExt, StatusCode};

/// Authentication failures: bad credentials and every way a session token
/// can stop being usable.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Unknown username or wrong password. The two cases are never told apart.
    InvalidCredentials,
    /// Token signature does not verify. Tampering and a wrong key look the same.
    SignatureInvalid,
    /// `now >= exp`.
    TokenExpired,
    /// Token does not decode, or a required claim is missing or inconsistent.
    MalformedClaims { reason: String },
    /// The token is structurally valid but names an account that is gone.
    AccountNotFound { username: String },
    /// The account was mutated after the token was issued.
    TokenInvalidated { username: String },
    /// No token was presented.
    MissingToken,
    /// API key does not match any stored key, or its secret is wrong.
    InvalidApiKey,
    /// Hashing algorithm or entropy failure.
    HashingFailed { reason: String },
    /// Token signing failure.
    SigningFailed { reason: String },
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls for AuthError
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for AuthError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::SignatureInvalid => write!(f, "Token signature is invalid"),
            Self::TokenExpired => write!(f, "Token expired"),
            Self::MalformedClaims { reason } => write!(f, "Malformed token claims: {reason}"),
            Self::AccountNotFound { username } => {
                write!(f, "Token refers to a missing account: {username}")
            }
            Self::TokenInvalidated { username } => {
                write!(f, "Token invalidated by a change to account {username}")
            }
            Self::MissingToken => write!(f, "Authentication token required"),
            Self::InvalidApiKey => write!(f, "Invalid API key"),
            Self::HashingFailed { reason } => write!(f, "Password hashing failed: {reason}"),
            Self::SigningFailed { reason } => write!(f, "Token signing failed: {reason}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl ErrorExt for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials => StatusCode::InvalidCredentials,
            Self::SignatureInvalid | Self::MalformedClaims { .. } | Self::AccountNotFound { .. } => {
                StatusCode::InvalidToken
            }
            Self::TokenExpired => StatusCode::TokenExpired,
            Self::TokenInvalidated { .. } => StatusCode::TokenInvalidated,
            Self::MissingToken => StatusCode::Unauthorized,
            Self::InvalidApiKey => StatusCode::AuthFailed,
            Self::HashingFailed { .. } => StatusCode::PasswordHashFailed,
            Self::SigningFailed { .. } => StatusCode::SigningFailed,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "invalid username or password".to_string(),
            Self::SignatureInvalid | Self::MalformedClaims { .. } | Self::AccountNotFound { .. } => {
                "Invalid authentication token".to_string()
            }
            Self::TokenExpired => "Session has expired, please log in again".to_string(),
            Self::TokenInvalidated { .. } => {
                "Session is no longer valid, please log in again".to_string()
            }
            Self::MissingToken => "Authentication token required".to_string(),
            Self::InvalidApiKey => "Invalid API key".to_string(),
            Self::HashingFailed { .. } | Self::SigningFailed { .. } => {
                "Internal server error".to_string()
            }
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", "auth".to_string()),
            ("status_code", self.status_code().code().to_string()),
        ]
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
