//! ## udpsim-telemetry::logging
//! **Structured logging with tracing**
//!
//! `RUST_LOG` takes precedence over the default level handed to `init`.
//! Lifecycle events carry OpenTelemetry-style key/value attributes.

use opentelemetry::KeyValue;
use tracing::info_span;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global fmt subscriber. A second call is a no-op.
    pub fn init(default_level: &str) {
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_thread_names(true)
            .try_init();
    }

    /// Emits a lifecycle event (started, stopped, config change) inside its own span.
    #[inline]
    pub fn log_event(event_type: &str, metadata: &[KeyValue]) {
        let span = info_span!(
            "simulator_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );
        span.in_scope(|| {
            tracing::info!(
                metadata = ?metadata,
                "Simulator event: {event_type}"
            );
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_logging() {
        EventLogger::log_event("started", &[KeyValue::new("listen", "127.0.0.1:9000")]);
        assert!(logs_contain("Simulator event: started"));
        assert!(logs_contain("127.0.0.1:9000"));
    }
}
