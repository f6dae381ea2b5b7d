use std::fmt;

use crate::{ErrorExt, StatusCode, StorageError};

/// Identifier allocation failures.
#[derive(Debug, Clone)]
pub enum AllocationError {
    /// Every random draw collided with an existing identifier.
    Exhausted { namespace: String, attempts: u32 },
    /// The caller gave up before an identifier was found.
    Cancelled { namespace: String },
    /// The store failed while probing or incrementing. Never retried.
    Storage(StorageError),
}

impl fmt::Display for AllocationError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Exhausted {
                namespace,
                attempts,
            } => write!(
                f,
                "Identifier allocation exhausted in namespace '{namespace}' after {attempts} attempts"
            ),
            Self::Cancelled { namespace } => {
                write!(f, "Identifier allocation cancelled in namespace '{namespace}'")
            }
            Self::Storage(err) => write!(f, "Identifier allocation failed: {err}"),
        }
    }
}

impl std::error::Error for AllocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl ErrorExt for AllocationError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Exhausted { .. } => StatusCode::AllocationExhausted,
            Self::Cancelled { .. } => StatusCode::Cancelled,
            Self::Storage(err) => err.status_code(),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            Self::Exhausted { .. } => "Service busy, please retry later".to_string(),
            Self::Cancelled { .. } => "Request cancelled".to_string(),
            Self::Storage(err) => err.client_message(),
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "allocation".to_string()),
            ("status_code", self.status_code().code().to_string()),
        ];
        match self {
            Self::Exhausted { namespace, .. } | Self::Cancelled { namespace } => {
                tags.push(("namespace", namespace.clone()));
            }
            Self::Storage(_) => {}
        }
        tags
    }
}

impl From<StorageError> for AllocationError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}
