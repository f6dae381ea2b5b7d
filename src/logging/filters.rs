use tracing_subscriber::EnvFilter;

use super::config::{LoggingConfig, LoggingError};

/// `RUST_LOG` wins when set; otherwise the configured directive is used.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = config.build_filter_directive();
    EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidDirective {
        directive,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_filter_from_config() {
        env::remove_var("RUST_LOG");
        let filter = build_filter(&LoggingConfig::default()).unwrap();
        assert!(filter.to_string().contains("shorty=info"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_config() {
        env::set_var("RUST_LOG", "trace");
        let filter = build_filter(&LoggingConfig::default()).unwrap();
        env::remove_var("RUST_LOG");
        assert_eq!(filter.to_string(), "trace");
    }

    #[test]
    #[serial]
    fn test_bad_directive() {
        env::remove_var("RUST_LOG");
        let cfg = LoggingConfig {
            directives: vec!["shorty=loud".into()],
            ..Default::default()
        };
        assert!(matches!(
            build_filter(&cfg),
            Err(LoggingError::InvalidDirective { .. })
        ));
    }
}
