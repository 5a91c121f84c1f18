//! Observability metrics for the trigger.
//!
//! Exported via the `metrics` crate facade.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `ladle_trigger_events_total` | Counter | `event`, `disposition` | Ingress events by outcome |
//! | `ladle_trigger_dispatches_total` | Counter | `stage`, `result` | Worker forwards by result |

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: ingress events by outcome.
    pub const EVENTS_TOTAL: &str = "ladle_trigger_events_total";
    /// Counter: worker forwards by result.
    pub const DISPATCHES_TOTAL: &str = "ladle_trigger_dispatches_total";
}

/// Label keys used across metrics.
pub mod labels {
    /// Event wire name.
    pub const EVENT: &str = "event";
    /// Event outcome (forwarded, duplicate, ignored, unknown, terminal).
    pub const DISPOSITION: &str = "disposition";
    /// Stage label for dispatch metrics.
    pub const STAGE: &str = "stage";
    /// Dispatch result (success, failure).
    pub const RESULT: &str = "result";
}

/// Trigger metrics facade.
#[derive(Debug, Clone, Copy)]
pub struct TriggerMetrics;

impl TriggerMetrics {
    /// Records one ingress event by outcome.
    pub fn record_event(event: String, disposition: &'static str) {
        counter!(
            names::EVENTS_TOTAL,
            labels::EVENT => event,
            labels::DISPOSITION => disposition
        )
        .increment(1);
    }

    /// Records one worker forward by result.
    pub fn record_dispatch(stage: &'static str, result: &'static str) {
        counter!(
            names::DISPATCHES_TOTAL,
            labels::STAGE => stage,
            labels::RESULT => result
        )
        .increment(1);
    }
}
