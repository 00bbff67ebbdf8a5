// AnalysisSession - background analysis with wholesale result publication
//
// One session owns the "latest result" slot for a playback surface. Each
// start() runs the offline pipeline on a worker thread and, when it
// finishes, replaces the slot in one step. Readers hold an
// Arc<AnalysisResult> and never observe a partially built result.
//
// Starting a new job cancels the previous one. A job whose token fired, or
// that was superseded by a newer start(), never publishes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Instant;

use tokio::sync::watch;

use crate::analysis::cancel::CancellationToken;
use crate::analysis::{AnalysisResult, Analyzer};
use crate::audio::DecodedAudio;
use crate::config::AnalysisConfig;
use crate::error::{log_analysis_error, AnalysisError};
use crate::telemetry::{self, TelemetryHub};

/// Shared slot holding the most recent published result
pub type LatestResult = Option<Arc<AnalysisResult>>;

type JobOutcome = Result<Arc<AnalysisResult>, AnalysisError>;

struct ActiveJob {
    id: u64,
    cancel: CancellationToken,
    handle: JoinHandle<JobOutcome>,
}

pub struct AnalysisSession {
    latest: Arc<watch::Sender<LatestResult>>,
    generation: Arc<AtomicU64>,
    active: Mutex<Option<ActiveJob>>,
    telemetry: &'static TelemetryHub,
}

impl AnalysisSession {
    /// Session reporting to the global telemetry hub
    pub fn new() -> Self {
        Self::with_telemetry(telemetry::hub())
    }

    pub fn with_telemetry(telemetry: &'static TelemetryHub) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            latest: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
            telemetry,
        }
    }

    /// Receiver notified each time a new result is published
    pub fn subscribe(&self) -> watch::Receiver<LatestResult> {
        self.latest.subscribe()
    }

    /// Most recently published result
    pub fn latest(&self) -> LatestResult {
        self.latest.borrow().clone()
    }

    /// Analyze `audio` in the background, superseding any running job
    ///
    /// The configuration is validated before anything is spawned, so an
    /// invalid config leaves the running job untouched.
    ///
    /// # Returns
    /// * `Ok(id)` - Identifier of the spawned job
    /// * `Err(AnalysisError::InvalidInput)` - Configuration rejected
    /// * `Err(AnalysisError::LockPoisoned)` - Session state is poisoned
    pub fn start(&self, audio: DecodedAudio, config: &AnalysisConfig) -> Result<u64, AnalysisError> {
        let analyzer = Analyzer::new(config).map_err(|err| {
            log_analysis_error(&err, "AnalysisSession::start");
            err
        })?;

        let mut active = self.lock_active()?;
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = active.take() {
            previous.cancel.cancel();
            tracing::info!("[Session] Job {} superseded by job {}", previous.id, id);
        }

        let cancel = CancellationToken::new();
        let worker = Worker {
            id,
            analyzer,
            cancel: cancel.clone(),
            generation: Arc::clone(&self.generation),
            latest: Arc::clone(&self.latest),
            telemetry: self.telemetry,
        };
        let handle = std::thread::spawn(move || worker.run(audio));

        tracing::info!("[Session] Started analysis job {}", id);
        *active = Some(ActiveJob { id, cancel, handle });
        Ok(id)
    }

    /// Cancel the running job, if any
    pub fn cancel(&self) -> Result<(), AnalysisError> {
        if let Some(job) = self.lock_active()?.as_ref() {
            job.cancel.cancel();
            tracing::info!("[Session] Cancel requested for job {}", job.id);
        }
        Ok(())
    }

    pub fn is_running(&self) -> Result<bool, AnalysisError> {
        Ok(self
            .lock_active()?
            .as_ref()
            .is_some_and(|job| !job.handle.is_finished()))
    }

    /// Block until the current job finishes
    ///
    /// # Returns
    /// * `Ok(None)` - No job was started since the last wait
    /// * `Ok(Some(result))` - The job's published result
    /// * `Err(AnalysisError::Cancelled)` - The job was cancelled or superseded
    /// * `Err(AnalysisError::WorkerPanicked)` - The worker thread panicked
    pub fn wait(&self) -> Result<LatestResult, AnalysisError> {
        let job = self.lock_active()?.take();
        let Some(job) = job else {
            return Ok(None);
        };
        match job.handle.join() {
            Ok(outcome) => outcome.map(Some),
            Err(_) => {
                let err = AnalysisError::WorkerPanicked;
                log_analysis_error(&err, "AnalysisSession::wait");
                self.telemetry.record_error(&err, "analysis worker");
                Err(err)
            }
        }
    }

    /// Safely acquire lock on the active job slot
    fn lock_active(&self) -> Result<MutexGuard<'_, Option<ActiveJob>>, AnalysisError> {
        self.active.lock().map_err(|_| {
            let err = AnalysisError::LockPoisoned {
                component: "analysis_session".to_string(),
            };
            log_analysis_error(&err, "lock_active");
            err
        })
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        if let Ok(Some(job)) = self.active.get_mut().map(Option::take) {
            job.cancel.cancel();
        }
    }
}

/// State moved onto the worker thread
struct Worker {
    id: u64,
    analyzer: Analyzer,
    cancel: CancellationToken,
    generation: Arc<AtomicU64>,
    latest: Arc<watch::Sender<LatestResult>>,
    telemetry: &'static TelemetryHub,
}

impl Worker {
    fn run(self, audio: DecodedAudio) -> JobOutcome {
        let started = Instant::now();
        match self.analyzer.analyze_with_summary(&audio.as_buffer(), &self.cancel) {
            Ok(report) => {
                let slices = report.summary.map_or(0, |summary| summary.slice_count);
                let result = Arc::new(report.result);
                if !self.publish(&result) {
                    tracing::info!("[Session] Job {} finished after being superseded", self.id);
                    self.telemetry.record_cancelled();
                    return Err(AnalysisError::Cancelled);
                }

                self.telemetry
                    .record_completed(result.units.len(), slices, started.elapsed());
                tracing::info!(
                    "[Session] Job {} published {} unit(s)",
                    self.id,
                    result.units.len()
                );
                Ok(result)
            }
            Err(AnalysisError::Cancelled) => {
                tracing::info!("[Session] Job {} cancelled", self.id);
                self.telemetry.record_cancelled();
                Err(AnalysisError::Cancelled)
            }
            Err(err) => {
                log_analysis_error(&err, "AnalysisSession::worker");
                self.telemetry.record_error(&err, "analysis worker");
                Err(err)
            }
        }
    }

    /// Replace the latest result unless this job was cancelled or superseded
    ///
    /// The check runs under the channel's write lock, so a newer job that
    /// already published can never be overwritten by this one.
    fn publish(&self, result: &Arc<AnalysisResult>) -> bool {
        self.latest.send_if_modified(|slot| {
            if self.is_superseded() {
                return false;
            }
            *slot = Some(Arc::clone(result));
            true
        })
    }

    fn is_superseded(&self) -> bool {
        self.cancel.is_cancelled() || self.generation.load(Ordering::SeqCst) != self.id
    }
}
