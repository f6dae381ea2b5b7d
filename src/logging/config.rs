use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Console output format.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),
    #[error("invalid filter directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },
    #[error("cannot create log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

/// Daily rolling file output.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    /// File name prefix; the appender adds the date.
    pub filename: String,
}

/// Logging settings, usually the `[logging]` section of the config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for this crate and `shorty_error`.
    pub level: String,
    pub format: LogFormat,
    /// Extra `EnvFilter` directives, e.g. `tokio=warn`.
    pub directives: Vec<String>,
    pub console: ConsoleConfig,
    pub file: FileConfig,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl LoggingConfig {
    const LEVELS: [&'static str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

    pub fn validate(&self) -> Result<(), LoggingError> {
        if !Self::LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(LoggingError::InvalidLevel(self.level.clone()));
        }
        Ok(())
    }

    /// `EnvFilter` directive built from the configured level plus extras.
    pub fn build_filter_directive(&self) -> String {
        let level = self.level.to_ascii_lowercase();
        let mut parts = vec![
            "warn".to_string(),
            format!("shorty={level}"),
            format!("shorty_error={level}"),
        ];
        parts.extend(self.directives.iter().cloned());
        parts.join(",")
    }

    pub fn ensure_log_dir(&self) -> Result<(), LoggingError> {
        if !self.file.enabled {
            return Ok(());
        }
        std::fs::create_dir_all(&self.file.dir).map_err(|source| LoggingError::LogDir {
            path: self.file.dir.clone(),
            source,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("logs"),
            filename: "shorty.log".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            directives: Vec::new(),
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        let cfg = LoggingConfig::default();
        assert_eq!(
            cfg.build_filter_directive(),
            "warn,shorty=info,shorty_error=info"
        );
    }

    #[test]
    fn test_extra_directives() {
        let cfg = LoggingConfig {
            level: "DEBUG".into(),
            directives: vec!["tokio=trace".into()],
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
        assert!(cfg.build_filter_directive().ends_with("shorty=debug,shorty_error=debug,tokio=trace"));
    }

    #[test]
    fn test_invalid_level() {
        let cfg = LoggingConfig {
            level: "loud".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn test_log_dir_created_only_when_enabled() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/logs");
        let mut cfg = LoggingConfig::default();
        cfg.file.dir = dir.clone();

        cfg.ensure_log_dir().unwrap();
        assert!(!dir.exists());

        cfg.file.enabled = true;
        cfg.ensure_log_dir().unwrap();
        assert!(dir.is_dir());
    }
}
