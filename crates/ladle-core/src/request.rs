//! The run request submitted to start a pipeline instance.
//!
//! The Trigger accepts this on `/run` and forwards it verbatim to the
//! extractor's `/extract`, including the fault-injection probabilities.
//! Both services deserialize into the same typed struct, so numeric
//! fields stay numbers across the hop — string/number coercion between
//! workers is a class of bug this contract exists to rule out.

use serde::{Deserialize, Serialize};

use crate::faults::FaultPlan;

/// Request to run the pipeline for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Calendar day to extract (`YYYY-MM-DD`). Empty means today.
    #[serde(default)]
    pub date: String,

    /// Upper bound on rows fetched this run; 0 means unbounded.
    ///
    /// This bounds rows-per-run, not the absolute offset: a run resuming
    /// from checkpoint `C` stops at `C + max_offset`.
    #[serde(default)]
    pub max_offset: u64,

    /// Probability a chunk's fetch is skipped (simulated API failure).
    #[serde(default)]
    pub api_error_prob: f64,

    /// Probability a chunk's blob write is skipped (simulated storage failure).
    #[serde(default)]
    pub gcs_error_prob: f64,

    /// Per-record probability of dropping a fetched row.
    #[serde(default)]
    pub row_drop_prob: f64,

    /// Probability of an injected delay before a chunk write.
    #[serde(default)]
    pub delay_prob: f64,
}

impl RunRequest {
    /// Creates a request for `date` with all fault gates closed.
    #[must_use]
    pub fn quiet(date: impl Into<String>, max_offset: u64) -> Self {
        Self {
            date: date.into(),
            max_offset,
            api_error_prob: 0.0,
            gcs_error_prob: 0.0,
            row_drop_prob: 0.0,
            delay_prob: 0.0,
        }
    }

    /// Returns the clamped fault plan for this run.
    #[must_use]
    pub fn fault_plan(&self) -> FaultPlan {
        FaultPlan::new(
            self.api_error_prob,
            self.gcs_error_prob,
            self.row_drop_prob,
            self.delay_prob,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_probabilities_default_to_zero() {
        let request: RunRequest =
            serde_json::from_str(r#"{"date":"2025-03-30","max_offset":2000}"#).expect("parse");

        assert_eq!(request.date, "2025-03-30");
        assert_eq!(request.max_offset, 2000);
        assert!(request.fault_plan().is_quiet());
    }

    #[test]
    fn probabilities_survive_a_forward_hop_as_numbers() {
        let request = RunRequest {
            date: "2025-03-30".into(),
            max_offset: 1000,
            api_error_prob: 0.25,
            gcs_error_prob: 0.0,
            row_drop_prob: 0.15,
            delay_prob: 1.0,
        };

        // Trigger re-serializes the typed struct when forwarding.
        let wire = serde_json::to_value(&request).expect("serialize");
        assert!(wire["api_error_prob"].is_f64());
        assert!(wire["row_drop_prob"].is_f64());

        let forwarded: RunRequest = serde_json::from_value(wire).expect("parse");
        assert_eq!(forwarded, request);
    }

    #[test]
    fn out_of_range_probabilities_clamp_in_the_plan() {
        let request: RunRequest =
            serde_json::from_str(r#"{"date":"2025-03-30","api_error_prob":7.0}"#).expect("parse");
        assert_eq!(request.fault_plan().api_error(), 1.0);
    }
}
