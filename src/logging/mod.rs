//! Logging setup on top of `tracing-subscriber`.
//!
//! One registry carries an `EnvFilter` (`RUST_LOG` overrides the configured
//! level), a console layer and, when enabled, a daily rolling file layer.

pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{ConsoleConfig, FileConfig, LogFormat, LoggingConfig, LoggingError};
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

use self::formatter::BoxedLayer;

/// Installs the global subscriber. Keep the returned handle alive for the
/// life of the process.
pub fn init_logging(config: LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter(&config)?;
    let mut layers: Vec<BoxedLayer<Registry>> = Vec::new();

    if config.console.enabled {
        layers.push(sinks::console::layer(&config));
    }

    let file_guard = if config.file.enabled {
        let (layer, guard) = sinks::file::layer(&config);
        layers.push(layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        format = ?config.format,
        file = config.file.enabled,
        "logging initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
