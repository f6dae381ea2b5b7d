use std::fmt;

use crate::{ErrorExt, StatusCode};

/// Malformed input. The caller's fault, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Value length outside `min..=max` characters.
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },
    /// Value contains whitespace or control characters.
    InvalidCharacters { field: &'static str },
    /// Password lacks a required character class.
    WeakPassword { missing: &'static str },
    /// New password equals the current one.
    PasswordUnchanged,
    /// New username equals the current one.
    UsernameUnchanged,
    InvalidUrl { reason: String },
    InvalidNamespace { namespace: String, reason: &'static str },
    InvalidArgument { reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::InvalidLength {
                field,
                min,
                max,
                actual,
            } => write!(
                f,
                "{field} must be between {min} and {max} characters, got {actual}"
            ),
            Self::InvalidCharacters { field } => {
                write!(f, "{field} must not contain whitespace or control characters")
            }
            Self::WeakPassword { missing } => {
                write!(f, "password must contain at least one {missing}")
            }
            Self::PasswordUnchanged => {
                write!(f, "new password must be different from the current password")
            }
            Self::UsernameUnchanged => {
                write!(f, "new username must be different from the current username")
            }
            Self::InvalidUrl { reason } => write!(f, "invalid URL: {reason}"),
            Self::InvalidNamespace { namespace, reason } => {
                write!(f, "invalid namespace '{namespace}': {reason}")
            }
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ErrorExt for ValidationError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidLength { .. } => StatusCode::InvalidLength,
            Self::InvalidCharacters { .. } | Self::UsernameUnchanged => StatusCode::InvalidValue,
            Self::WeakPassword { .. } | Self::PasswordUnchanged => StatusCode::WeakPassword,
            Self::InvalidUrl { .. } => StatusCode::InvalidUrl,
            Self::InvalidNamespace { .. } => StatusCode::InvalidNamespace,
            Self::InvalidArgument { .. } => StatusCode::InvalidArgs,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "validation".to_string()),
            ("status_code", self.status_code().code().to_string()),
        ];
        if let Self::InvalidLength { field, .. } | Self::InvalidCharacters { field } = self {
            tags.push(("field", field.to_string()));
        }
        tags
    }
}
