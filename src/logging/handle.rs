use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tracing_appender::non_blocking::WorkerGuard;

#[derive(Debug, Default)]
pub struct LoggingMetrics {
    flush_count: AtomicU64,
}

/// Keeps the file writer alive. Dropping it flushes buffered lines.
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
    pub metrics: Arc<LoggingMetrics>,
}

impl LoggingMetrics {
    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::Relaxed)
    }
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self {
            file_guard,
            metrics: Arc::new(LoggingMetrics::default()),
        }
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    pub fn flush(&self) {
        self.metrics.flush_count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            flush_count = self.metrics.flush_count(),
            "logging flush requested"
        );
    }

    /// Drops the file guard on the blocking pool, giving up after `timeout`.
    pub async fn shutdown(
        mut self,
        timeout: Duration,
    ) {
        tracing::info!(timeout_ms = timeout.as_millis() as u64, "logging shutdown");
        let guard = self.file_guard.take();
        match tokio::time::timeout(timeout, tokio::task::spawn_blocking(move || drop(guard))).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("logging shutdown task failed: {e}"),
            Err(_) => eprintln!(
                "logging shutdown exceeded {}ms, some lines may be lost",
                timeout.as_millis()
            ),
        }
    }
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("file_sink", &self.has_file_sink())
            .field("metrics", &self.metrics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_counts() {
        let handle = LoggingHandle::new(None);
        handle.flush();
        handle.flush();
        assert_eq!(handle.metrics.flush_count(), 2);
        assert!(!handle.has_file_sink());
    }

    #[tokio::test]
    async fn test_shutdown_without_file() {
        LoggingHandle::new(None)
            .shutdown(Duration::from_millis(100))
            .await;
    }
}
