use std::fmt;

use crate::{ErrorExt, StatusCode};

/// Uniqueness violations. The caller may retry with different input.
#[derive(Debug, Clone)]
pub enum ConflictError {
    UsernameTaken { username: String },
    /// A create-only write found the identifier already claimed.
    IdentifierTaken { namespace: String, id: String },
}

impl fmt::Display for ConflictError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::UsernameTaken { username } => write!(f, "Username already taken: {username}"),
            Self::IdentifierTaken { namespace, id } => {
                write!(f, "Identifier already taken: {namespace}:{id}")
            }
        }
    }
}

impl std::error::Error for ConflictError {}

impl ErrorExt for ConflictError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UsernameTaken { .. } => StatusCode::UsernameTaken,
            Self::IdentifierTaken { .. } => StatusCode::IdentifierTaken,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            Self::UsernameTaken { .. } => "username already taken".to_string(),
            Self::IdentifierTaken { .. } => "identifier already taken".to_string(),
        }
    }
}
