use std::{path::Path, time::Duration};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    auth::{HashingConfig, Secret, TokenConfig},
    ids::AllocatorConfig,
    logging::LoggingConfig,
    ratelimit::RateLimitConfig,
};

pub const ENV_PREFIX: &str = "SHORTY";
pub const ENV_SEPARATOR: &str = "__";
/// Variable naming the config file when `--config` is not given.
pub const CONFIG_PATH_ENV: &str = "SHORTY_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("missing secret '{0}' (set it or enable dev_mode)")]
    MissingSecret(&'static str),
    #[error("invalid value in [{section}]: {reason}")]
    Invalid {
        section: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub pepper: Option<Secret>,
    pub signing_secret: Option<Secret>,
    pub token_ttl_secs: u64,
    pub hashing: HashingConfig,
}

/// Allocation settings per namespace.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdSettings {
    pub user: AllocatorConfig,
    pub apikey: AllocatorConfig,
    pub urlcode: AllocatorConfig,
}

/// Process configuration: defaults, then the TOML file, then `SHORTY_*`
/// environment variables (`SHORTY_AUTH__TOKEN_TTL_SECS=600`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Generates missing secrets instead of failing. Never for production.
    pub dev_mode: bool,
    pub auth: AuthSettings,
    pub rate_limit: RateLimitConfig,
    pub ids: IdSettings,
    pub logging: LoggingConfig,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl Settings {
    /// Loads and validates settings. `path` must exist when given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from a TOML string, without environment overrides.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth
            .hashing
            .validate()
            .map_err(|e| invalid("auth.hashing", e))?;
        if self.auth.token_ttl_secs == 0 {
            return Err(invalid("auth", "token_ttl_secs must be positive"));
        }
        self.rate_limit
            .validate()
            .map_err(|e| invalid("rate_limit", e))?;
        for (section, config) in [
            ("ids.user", &self.ids.user),
            ("ids.apikey", &self.ids.apikey),
            ("ids.urlcode", &self.ids.urlcode),
        ] {
            config.validate().map_err(|e| invalid(section, e))?;
        }
        self.logging
            .validate()
            .map_err(|e| invalid("logging", e))?;
        Ok(())
    }
}

fn invalid(
    section: &'static str,
    reason: impl ToString,
) -> ConfigError {
    ConfigError::Invalid {
        section,
        reason: reason.to_string(),
    }
}

impl AuthSettings {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn token_config(
        &self,
        signing_secret: Secret,
    ) -> TokenConfig {
        TokenConfig::with_secret(signing_secret).ttl(self.token_ttl())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            pepper: None,
            signing_secret: None,
            token_ttl_secs: TokenConfig::DEFAULT_TTL.as_secs(),
            hashing: HashingConfig::default(),
        }
    }
}

impl Default for IdSettings {
    fn default() -> Self {
        Self {
            user: AllocatorConfig::sequential(),
            apikey: AllocatorConfig::random(16),
            urlcode: AllocatorConfig::random(8),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{env, io::Write};

    use serial_test::serial;

    use super::*;
    use crate::{auth::PasswordAlgorithm, ids::Strategy, logging::LogFormat};

    fn clear_env() {
        for (key, _) in env::vars() {
            if key.starts_with("SHORTY_") {
                env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let settings = Settings::load(None).unwrap();
        assert!(!settings.dev_mode);
        assert!(settings.auth.pepper.is_none());
        assert_eq!(settings.auth.token_ttl(), Duration::from_secs(1800));
        assert_eq!(settings.ids.user.strategy, Strategy::Sequential);
        assert_eq!(settings.ids.urlcode.length, 8);
        assert_eq!(settings.rate_limit, RateLimitConfig::default());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var("SHORTY_DEV_MODE", "true");
        env::set_var("SHORTY_AUTH__TOKEN_TTL_SECS", "600");
        env::set_var("SHORTY_AUTH__PEPPER", "pepper-from-env");
        env::set_var("SHORTY_RATE_LIMIT__BURST", "3");
        let settings = Settings::load(None);
        clear_env();

        let settings = settings.unwrap();
        assert!(settings.dev_mode);
        assert_eq!(settings.auth.token_ttl_secs, 600);
        assert_eq!(
            settings.auth.pepper.as_ref().map(Secret::expose),
            Some("pepper-from-env")
        );
        assert_eq!(settings.rate_limit.burst, 3);
    }

    #[test]
    #[serial]
    fn test_file_then_env() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[auth]
token_ttl_secs = 120

[auth.hashing]
algorithm = "bcrypt"
bcrypt_cost = 6

[ids.urlcode]
strategy = "random"
length = 6
alphabet = "abcdef0123456789"

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        env::set_var("SHORTY_AUTH__TOKEN_TTL_SECS", "90");
        let settings = Settings::load(Some(file.path()));
        clear_env();

        let settings = settings.unwrap();
        assert_eq!(settings.auth.token_ttl_secs, 90);
        assert_eq!(settings.auth.hashing.algorithm, PasswordAlgorithm::Bcrypt);
        assert_eq!(settings.auth.hashing.bcrypt_cost, 6);
        assert_eq!(settings.ids.urlcode.length, 6);
        assert_eq!(settings.ids.urlcode.alphabet.len(), 16);
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    #[serial]
    fn test_missing_file_fails() {
        clear_env();
        let err = Settings::load(Some(Path::new("/nonexistent/shorty.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Settings::from_toml("[rate_limit]\nrate = 0.0\nburst = 1\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                section: "rate_limit",
                ..
            }
        ));

        let err = Settings::from_toml("[ids.apikey]\nlength = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                section: "ids.apikey",
                ..
            }
        ));

        assert!(Settings::from_toml("[ids.urlcode]\nalphabet = \"a\"\n").is_err());
    }
}
