use tracing::warn;

use super::{ConfigError, Settings};
use crate::auth::Secret;

/// Bytes of entropy in a generated development secret.
const DEV_SECRET_BYTES: usize = 32;

/// The two process-wide secrets, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub pepper: Secret,
    pub signing_secret: Secret,
}

impl Secrets {
    /// Takes the configured secrets. Missing or empty ones are an error,
    /// unless `dev_mode` is on: then a random process-local value is used and
    /// every restart invalidates stored passwords and live tokens.
    pub fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            pepper: pick(settings, settings.auth.pepper.as_ref(), "auth.pepper")?,
            signing_secret: pick(
                settings,
                settings.auth.signing_secret.as_ref(),
                "auth.signing_secret",
            )?,
        })
    }
}

fn pick(
    settings: &Settings,
    configured: Option<&Secret>,
    name: &'static str,
) -> Result<Secret, ConfigError> {
    match configured {
        Some(secret) if !secret.is_empty() => Ok(secret.clone()),
        _ if settings.dev_mode => {
            warn!(secret = name, "secret not configured, generated a temporary one");
            Ok(Secret::generate(DEV_SECRET_BYTES))
        }
        _ => Err(ConfigError::MissingSecret(name)),
    }
}
