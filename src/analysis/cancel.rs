// Cancellation token - cooperative stop flag for analysis jobs
//
// The pipeline polls the token between slice steps and returns
// `AnalysisError::Cancelled` once it has fired.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::AnalysisError;

/// Cooperative cancellation flag shared between a caller and an analysis job
///
/// Clones observe the same flag. The pipeline polls it between slice
/// steps; nothing is interrupted forcibly.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once the token has fired
    pub fn check(&self) -> Result<(), AnalysisError> {
        if self.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }
}
