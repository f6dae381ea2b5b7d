pub mod allocation;
pub mod auth;
pub mod conflict;
pub mod rate_limit;
pub mod storage;
pub mod validation;

pub use allocation::*;
pub use auth::*;
pub use conflict::*;
pub use rate_limit::*;
pub use storage::*;
pub use validation::*;

use crate::{ErrorExt, StatusCode};

/// Error with an explicit code and a free-form message.
#[derive(Debug, Clone)]
pub struct GenericError {
    code: StatusCode,
    message: String,
}

impl GenericError {
    pub fn new(
        code: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for GenericError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for GenericError {}

impl ErrorExt for GenericError {
    fn status_code(&self) -> StatusCode {
        self.code
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
