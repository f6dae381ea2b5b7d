use std::any::Any;

use crate::{ErrorExt, StatusCode};

/// Failures reported by a key-value store backend.
///
/// A missing key is never an error: lookups return `Option` instead.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// Backend could not be reached or refused the operation.
    Unavailable { reason: String },
    /// Operation does not apply to the type stored under the key.
    WrongType {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// A stored record is missing a field or holds an unparsable value.
    CorruptedData { key: String, reason: String },
    /// Backend did not answer in time.
    Timeout { operation: String },
    /// Integer counter would overflow.
    Overflow { key: String },
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls for StorageError
////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Display for StorageError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "Storage unavailable: {reason}"),
            Self::WrongType {
                key,
                expected,
                actual,
            } => write!(
                f,
                "Wrong type for key '{key}': expected {expected}, got {actual}"
            ),
            Self::CorruptedData { key, reason } => {
                write!(f, "Corrupted record at '{key}': {reason}")
            }
            Self::Timeout { operation } => write!(f, "Storage timeout during {operation}"),
            Self::Overflow { key } => write!(f, "Counter overflow at '{key}'"),
        }
    }
}

impl std::error::Error for StorageError {}

impl ErrorExt for StorageError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unavailable { .. } => StatusCode::StorageUnavailable,
            Self::WrongType { .. } => StatusCode::WrongType,
            Self::CorruptedData { .. } | Self::Overflow { .. } => StatusCode::CorruptedData,
            Self::Timeout { .. } => StatusCode::Timeout,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "storage".to_string()),
            ("status_code", self.status_code().code().to_string()),
        ];
        if let Self::Timeout { operation } = self {
            tags.push(("operation", operation.clone()));
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorClass;

    #[test]
    fn test_storage_errors_are_dependency_class() {
        let errs = [
            StorageError::Unavailable {
                reason: "down".into(),
            },
            StorageError::WrongType {
                key: "user:1".into(),
                expected: "hash",
                actual: "string",
            },
            StorageError::CorruptedData {
                key: "user:1".into(),
                reason: "no username".into(),
            },
        ];
        for err in errs {
            assert_eq!(err.class(), ErrorClass::Dependency);
            assert_eq!(err.client_message(), "Internal server error");
        }
    }

    #[test]
    fn test_wrong_type_display() {
        let err = StorageError::WrongType {
            key: "counter:user".into(),
            expected: "integer",
            actual: "hash",
        };
        assert_eq!(
            err.to_string(),
            "Wrong type for key 'counter:user': expected integer, got hash"
        );
    }

    #[test]
    fn test_timeout_tags() {
        let err = StorageError::Timeout {
            operation: "exists".into(),
        };
        assert!(err.status_code().is_retryable());
        assert!(err
            .metrics_tags()
            .contains(&("operation", "exists".to_string())));
    }
}
