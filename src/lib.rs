// Acoustic Units Core - offline segmentation and live spectrum sampling
// Spectrogram -> adaptive threshold -> unit features, plus a per-tick live path

// Module declarations
pub mod analysis;
pub mod audio;
pub mod cadence;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod session;
pub mod telemetry;

// Re-exports for convenience
pub use analysis::band::FrequencyBand;
pub use analysis::cancel::CancellationToken;
pub use analysis::capture::LiveSpectrumCapture;
pub use analysis::live::{LiveFrame, LiveFrameSampler};
pub use analysis::magnitude::{ByteMagnitude, Decibels, LinearVolume};
pub use analysis::spectrogram::{Spectrogram, SpectrogramBuilder, SpectrogramSlice};
pub use analysis::units::Unit;
pub use analysis::{analyze, AnalysisReport, AnalysisResult, Analyzer};
pub use audio::{DecodedAudio, SampleBuffer};
pub use cadence::{CadenceScheduler, Cue, CueSource};
pub use config::{AnalysisConfig, AppConfig, DetectionMode};
pub use error::{AnalysisError, ErrorCode};
pub use session::AnalysisSession;
