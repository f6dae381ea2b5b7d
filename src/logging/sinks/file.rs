use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::registry::LookupSpan;

use crate::logging::{
    config::LoggingConfig,
    formatter::{build_formatter, BoxedLayer},
};

/// Daily rolling file layer. The guard flushes pending lines on drop and
/// must outlive the subscriber.
pub fn layer<S>(config: &LoggingConfig) -> (BoxedLayer<S>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let appender = rolling::daily(&config.file.dir, &config.file.filename);
    let (writer, guard) = non_blocking(appender);
    let layer = build_formatter(config.format, &config.console, false, writer);
    (layer, guard)
}
