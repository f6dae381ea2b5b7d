use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde")]
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Status codes used to categorize errors.
///
/// # Ranges
/// - 0xxx: success
/// - 1xxx: general / internal
/// - 2xxx: input validation and uniqueness
/// - 3xxx: authentication
/// - 4xxx: resource exhaustion (allocator cap, rate limiting)
/// - 5xxx: storage and other dependencies
///
/// `num_enum::TryFromPrimitive` provides `TryFrom<u32>`, so a code can be
/// carried over the wire as a plain number.
#[cfg_attr(feature = "serde", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: success ===
    Success = 0,

    // === 1xxx: general ===
    Unknown = 1000,
    Internal = 1001,
    InvalidArgs = 1002,
    NotImplemented = 1003,
    Cancelled = 1004,

    // === 2xxx: validation / uniqueness ===
    NotFound = 2000,
    AlreadyExists = 2001,
    InvalidValue = 2002,
    InvalidLength = 2003,
    WeakPassword = 2004,
    InvalidUrl = 2005,
    InvalidNamespace = 2006,
    WrongType = 2007,
    UsernameTaken = 2008,
    IdentifierTaken = 2009,

    // === 3xxx: authentication ===
    AuthFailed = 3000,
    InvalidCredentials = 3001,
    InvalidToken = 3002,
    TokenExpired = 3003,
    TokenInvalidated = 3004,
    Unauthorized = 3005,
    PasswordHashFailed = 3006,
    SigningFailed = 3007,

    // === 4xxx: resource exhaustion ===
    RateLimited = 4000,
    AllocationExhausted = 4001,

    // === 5xxx: storage / dependencies ===
    StorageUnavailable = 5000,
    CorruptedData = 5001,
    SerializationFailed = 5002,
    Timeout = 5003,
}

/// Coarse error taxonomy; decides how callers react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed input. The caller's fault, never retried.
    Validation,
    /// Uniqueness violation. The caller may retry with different input.
    Conflict,
    /// Bad credentials or a bad/expired/invalidated token.
    Auth,
    /// Allocator retry cap or rate limiter rejection. Retry later.
    ResourceExhausted,
    /// Store unreachable or answered unexpectedly. Fatal for the request.
    Dependency,
    /// The request was cancelled by its caller.
    Cancelled,
    /// Bug or algorithm failure inside the process.
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Numeric representation of the code.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Looks a code up by its numeric value.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Taxonomy bucket of the code.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UsernameTaken | Self::IdentifierTaken | Self::AlreadyExists => {
                ErrorClass::Conflict
            }
            Self::InvalidArgs
            | Self::NotFound
            | Self::InvalidValue
            | Self::InvalidLength
            | Self::WeakPassword
            | Self::InvalidUrl
            | Self::InvalidNamespace => ErrorClass::Validation,
            Self::AuthFailed
            | Self::InvalidCredentials
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::TokenInvalidated
            | Self::Unauthorized => ErrorClass::Auth,
            Self::RateLimited | Self::AllocationExhausted => ErrorClass::ResourceExhausted,
            Self::StorageUnavailable
            | Self::CorruptedData
            | Self::SerializationFailed
            | Self::Timeout
            | Self::WrongType => ErrorClass::Dependency,
            Self::Cancelled => ErrorClass::Cancelled,
            Self::Success
            | Self::Unknown
            | Self::Internal
            | Self::NotImplemented
            | Self::PasswordHashFailed
            | Self::SigningFailed => ErrorClass::Internal,
        }
    }

    /// `true` if repeating the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::AllocationExhausted | Self::Timeout
        )
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::Validation | ErrorClass::Conflict | ErrorClass::Auth
        ) || *self == Self::RateLimited
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self.class(), ErrorClass::Dependency | ErrorClass::Internal)
            || *self == Self::AllocationExhausted
    }

    /// Whether the error must be reported at error level.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::Internal
                | Self::CorruptedData
                | Self::StorageUnavailable
                | Self::PasswordHashFailed
                | Self::SigningFailed
        )
    }

    /// Recommended log level for the code.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound | Self::AlreadyExists | Self::Cancelled => LogLevel::Debug,
            _ if self.is_critical() => LogLevel::Error,
            _ => match self.class() {
                ErrorClass::Validation | ErrorClass::Conflict | ErrorClass::Auth => {
                    LogLevel::Info
                }
                ErrorClass::ResourceExhausted => LogLevel::Warn,
                ErrorClass::Dependency | ErrorClass::Internal => LogLevel::Error,
                ErrorClass::Cancelled => LogLevel::Debug,
            },
        }
    }

    /// HTTP status an outer transport should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Success => 200,
            Self::NotFound => 404,
            Self::NotImplemented => 501,
            Self::Cancelled => 499,
            Self::RateLimited => 429,
            Self::AllocationExhausted => 503,
            Self::StorageUnavailable | Self::Timeout => 503,
            _ => match self.class() {
                ErrorClass::Validation => 400,
                ErrorClass::Conflict => 409,
                ErrorClass::Auth => 401,
                ErrorClass::ResourceExhausted => 429,
                _ => 500,
            },
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls for StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
