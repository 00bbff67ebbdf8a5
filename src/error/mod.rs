// Error types for the acoustic unit engine
//
// This module defines the analysis error type together with the numeric
// error codes used when errors cross a process or language boundary
// (CLI exit reports, telemetry events).

mod analysis;

pub use analysis::{log_analysis_error, AnalysisError, AnalysisErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the crate boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
