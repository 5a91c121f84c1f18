//! Observability infrastructure for Ladle services.
//!
//! Structured logging with consistent spans across the extractor and the
//! trigger. Services pick the JSON format in production and pretty output
//! in debug mode.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at service startup. Safe to call multiple times; subsequent
/// calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `ladle_extractor=debug`)
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let output: Box<dyn Layer<Registry> + Send + Sync> = match format {
            LogFormat::Json => fmt::layer().json().boxed(),
            LogFormat::Pretty => fmt::layer().pretty().boxed(),
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(output)
            .with(filter)
            .init();
    });
}

/// Creates a span for one extraction run.
#[must_use]
pub fn extraction_span(date: &str, start_offset: u64) -> Span {
    tracing::info_span!("extraction", date = date, start_offset = start_offset)
}

/// Creates a span for routing one pipeline event.
#[must_use]
pub fn routing_span(event: &str, date: &str) -> Span {
    tracing::info_span!("routing", event = event, date = date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Pretty);
    }

    #[test]
    fn span_helpers_create_spans() {
        let span = extraction_span("2025-03-30", 1000);
        let _guard = span.enter();
        tracing::info!("test message in span");

        let span = routing_span("cleaner_completed", "2025-03-30");
        let _guard = span.enter();
        tracing::info!("routing message");
    }
}
