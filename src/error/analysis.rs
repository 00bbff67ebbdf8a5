// Analysis error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Analysis error code constants
///
/// Single source of truth for the numeric codes reported by the CLI and
/// recorded in telemetry events.
///
/// Error code range: 3001-3006
pub struct AnalysisErrorCodes {}

impl AnalysisErrorCodes {
    /// Configuration or input buffer is invalid
    pub const INVALID_INPUT: i32 = 3001;

    /// Segmentation was attempted on a spectrogram with zero slices
    pub const EMPTY_SPECTROGRAM: i32 = 3002;

    /// Analysis was cancelled through its cancellation token
    pub const CANCELLED: i32 = 3003;

    /// Audio file could not be decoded
    pub const DECODE_FAILED: i32 = 3004;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 3005;

    /// Analysis worker thread panicked
    pub const WORKER_PANICKED: i32 = 3006;
}

/// Log an analysis error with structured context
///
/// Emits the error code, the failing component and the message so that
/// log scrapers can group failures without parsing free text.
pub fn log_analysis_error(err: &AnalysisError, context: &str) {
    error!(
        "Analysis error in {}: code={}, component=AnalysisPipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Analysis-related errors
///
/// These errors cover the offline pipeline (spectrogram building,
/// segmentation, feature extraction), the analysis session, and the
/// decoding adapter used by the CLI.
///
/// Error code range: 3001-3006
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Bad configuration or empty input (non power-of-two transform size,
    /// non-positive sample rate, empty buffer, inverted band)
    InvalidInput { reason: String },

    /// Segmentation received zero slices
    EmptySpectrogram,

    /// Cancellation token fired between slice steps
    Cancelled,

    /// Audio decoding failed
    DecodeFailed { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Worker thread panicked before producing a result
    WorkerPanicked,
}

impl AnalysisError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        AnalysisError::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> i32 {
        match self {
            AnalysisError::InvalidInput { .. } => AnalysisErrorCodes::INVALID_INPUT,
            AnalysisError::EmptySpectrogram => AnalysisErrorCodes::EMPTY_SPECTROGRAM,
            AnalysisError::Cancelled => AnalysisErrorCodes::CANCELLED,
            AnalysisError::DecodeFailed { .. } => AnalysisErrorCodes::DECODE_FAILED,
            AnalysisError::LockPoisoned { .. } => AnalysisErrorCodes::LOCK_POISONED,
            AnalysisError::WorkerPanicked => AnalysisErrorCodes::WORKER_PANICKED,
        }
    }

    fn message(&self) -> String {
        match self {
            AnalysisError::InvalidInput { reason } => format!("Invalid input: {}", reason),
            AnalysisError::EmptySpectrogram => {
                "Spectrogram contains no slices to segment".to_string()
            }
            AnalysisError::Cancelled => "Analysis cancelled".to_string(),
            AnalysisError::DecodeFailed { reason } => {
                format!("Failed to decode audio: {}", reason)
            }
            AnalysisError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
            AnalysisError::WorkerPanicked => "Analysis worker panicked".to_string(),
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnalysisError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AnalysisError {}

impl From<hound::Error> for AnalysisError {
    fn from(err: hound::Error) -> Self {
        AnalysisError::DecodeFailed {
            reason: err.to_string(),
        }
    }
}
