//! Telemetry event types describing analysis activity exposed to the CLI
//! and any other subscriber of the hub.

use serde::{Deserialize, Serialize};

/// Metric events emitted by analysis sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    AnalysisCompleted {
        units: usize,
        slices: usize,
        elapsed_ms: u64,
    },
    AnalysisCancelled {
        timestamp_ms: u64,
    },
    Error {
        /// Numeric code from `AnalysisErrorCodes`
        code: i32,
        context: String,
    },
}
