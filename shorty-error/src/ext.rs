use std::{any::Any, error::Error};

use crate::{ErrorClass, StatusCode};

/// Extension implemented by every shorty error type (object-safe).
///
/// Gives uniform access to:
/// - the status code and its taxonomy class,
/// - a message that is safe to show to clients,
/// - a detailed message for logs,
/// - tags for metrics.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Defaults to [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Returns the error as [`Any`] so it can be downcast.
    fn as_any(&self) -> &dyn Any;

    fn class(&self) -> ErrorClass {
        self.status_code().class()
    }

    /// Message safe to send to a client.
    ///
    /// Internal and dependency failures collapse into a generic text so no
    /// implementation detail leaks.
    fn client_message(&self) -> String {
        match self.class() {
            ErrorClass::Internal | ErrorClass::Dependency => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Detailed message for logs. May contain sensitive context.
    fn log_message(&self) -> String {
        format!("{self:?}")
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", self.type_name()),
            ("status_code", self.status_code().code().to_string()),
        ]
    }

    /// Short type name, without the module path.
    fn type_name(&self) -> String {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("Unknown")
            .to_string()
    }
}
