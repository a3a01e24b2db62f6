//! Lifecycle logger port.
//!
//! The coordinator reports every state transition of a request through this
//! port. Sinks are append-only, must not block, and cannot fail from the
//! coordinator's point of view.

use tokio::sync::mpsc;

use crate::fetch::{FetchLogEvent, FetchLogKind};

/// Port for receiving lifecycle events.
///
/// Any `Fn(FetchLogEvent) + Send + Sync` closure is a logger.
///
/// # Example
///
/// ```ignore
/// let downloader = ImageDownloader::new(ImageDownloaderDeps {
///     logger: Arc::new(|event: FetchLogEvent| println!("{}", event.message())),
///     ..deps
/// });
/// ```
pub trait FetchLoggerPort: Send + Sync {
    /// Record an event.
    ///
    /// Called while the coordinator holds its state lock. Implementations
    /// must return quickly and must not call back into the coordinator.
    fn log(&self, event: FetchLogEvent);
}

impl<F> FetchLoggerPort for F
where
    F: Fn(FetchLogEvent) + Send + Sync,
{
    fn log(&self, event: FetchLogEvent) {
        self(event);
    }
}

/// The null sink. Used when no logger is injected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFetchLogger;

impl NoopFetchLogger {
    /// Create a new no-op logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FetchLoggerPort for NoopFetchLogger {
    fn log(&self, _event: FetchLogEvent) {
        // Intentionally do nothing
    }
}

/// Console logger that writes one line per event through `tracing`.
///
/// Errors are logged at `warn`, everything else at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFetchLogger;

impl TracingFetchLogger {
    /// Create a new tracing logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FetchLoggerPort for TracingFetchLogger {
    fn log(&self, event: FetchLogEvent) {
        let message = event.message();
        match event.kind {
            FetchLogKind::ResponseError => tracing::warn!(
                target: "pixfetch",
                kind = event.kind.as_str(),
                url = %event.url,
                status = ?event.status_code,
                "{message}"
            ),
            _ => tracing::info!(
                target: "pixfetch",
                kind = event.kind.as_str(),
                url = %event.url,
                status = ?event.status_code,
                "{message}"
            ),
        }
    }
}

/// Logger that forwards events into an unbounded channel.
///
/// A dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelFetchLogger {
    tx: mpsc::UnboundedSender<FetchLogEvent>,
}

impl ChannelFetchLogger {
    /// Create a logger and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FetchLogEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl FetchLoggerPort for ChannelFetchLogger {
    fn log(&self, event: FetchLogEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    mockall::mock! {
        pub Logger {}

        impl FetchLoggerPort for Logger {
            fn log(&self, event: FetchLogEvent);
        }
    }

    #[test]
    fn test_noop_logger() {
        let logger = NoopFetchLogger::new();

        // Should not panic
        logger.log(FetchLogEvent::request_sent("test"));
    }

    #[test]
    fn test_tracing_logger_without_subscriber() {
        let logger: Arc<dyn FetchLoggerPort> = Arc::new(TracingFetchLogger::new());
        logger.log(FetchLogEvent::request_cancelled("test"));
    }

    #[test]
    fn test_closure_logger() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        let logger: Arc<dyn FetchLoggerPort> =
            Arc::new(move |event: FetchLogEvent| sink.lock().unwrap().push(event.kind));

        logger.log(FetchLogEvent::request_sent("a"));
        logger.log(FetchLogEvent::response_success("a", 200));

        assert_eq!(
            *captured.lock().unwrap(),
            vec![FetchLogKind::RequestSent, FetchLogKind::ResponseSuccess]
        );
    }

    #[tokio::test]
    async fn test_channel_logger_forwards_events() {
        let (logger, mut rx) = ChannelFetchLogger::new();
        logger.log(FetchLogEvent::request_sent("a"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, FetchLogKind::RequestSent);
        assert_eq!(event.url, "a");
    }

    #[test]
    fn test_channel_logger_ignores_closed_receiver() {
        let (logger, rx) = ChannelFetchLogger::new();
        drop(rx);

        // Should not panic
        logger.log(FetchLogEvent::request_cancelled("a"));
    }

    #[test]
    fn test_mock_logger_through_trait_object() {
        let mut mock = MockLogger::new();
        mock.expect_log()
            .withf(|event| event.kind == FetchLogKind::RequestCancelled && event.url == "u")
            .times(1)
            .return_const(());

        let logger: Arc<dyn FetchLoggerPort> = Arc::new(mock);
        logger.log(FetchLogEvent::request_cancelled("u"));
    }
}
