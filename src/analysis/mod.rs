// Analysis module - offline unit segmentation pipeline
//
// Pipeline (run once per decoded file):
//   SpectrogramBuilder → Segmenter → UnitExtractor → AnalysisResult
//
// The pipeline is a pure function of (samples, config): no state survives
// between calls and identical input produces an identical result. The only
// side channel is the cancellation token, polled between slice steps.
//
// The live path (LiveSpectrumCapture → LiveFrameSampler) is independent of
// this pipeline and shares no state with it.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::audio::SampleBuffer;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

pub mod band;
pub mod cancel;
pub mod capture;
pub mod live;
pub mod magnitude;
pub mod segmenter;
pub mod spectrogram;
pub mod units;


use cancel::CancellationToken;
use magnitude::Decibels;
use segmenter::{Segmentation, Segmenter};
use spectrogram::SpectrogramBuilder;
use units::{Unit, UnitExtractor};

/// Units found in one recording
///
/// Immutable once returned; a new analysis produces a new value rather
/// than updating this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub units: Vec<Unit>,
    /// Recording length in seconds
    pub duration: f64,
    pub sample_rate: u32,
}

/// Detector internals for one analysis, for diagnostics output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationSummary {
    pub slice_count: usize,
    pub noise_mean: Decibels,
    pub noise_std_dev: f32,
    pub threshold: Decibels,
    pub min_run_slices: usize,
}

impl SegmentationSummary {
    fn from_segmentation(segmentation: &Segmentation) -> Self {
        Self {
            slice_count: segmentation.statistics.slice_means.len(),
            noise_mean: Decibels(segmentation.statistics.mean as f32),
            noise_std_dev: segmentation.statistics.std_dev as f32,
            threshold: segmentation.threshold,
            min_run_slices: segmentation.min_run_slices,
        }
    }
}

/// Result plus the detector summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub result: AnalysisResult,
    /// `None` when the spectrogram had no slices to segment
    pub summary: Option<SegmentationSummary>,
}

/// Offline analyzer holding a validated configuration and a planned FFT
pub struct Analyzer {
    builder: SpectrogramBuilder,
    segmenter: Segmenter,
    extractor: UnitExtractor,
}

impl Analyzer {
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            builder: SpectrogramBuilder::with_config(config)?,
            segmenter: Segmenter::with_config(config),
            extractor: UnitExtractor::new(config.band),
        })
    }

    /// Run the full pipeline over `buffer`
    pub fn analyze(
        &self,
        buffer: &SampleBuffer<'_>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_with_summary(buffer, cancel)
            .map(|report| report.result)
    }

    /// Run the full pipeline and keep the detector summary
    pub fn analyze_with_summary(
        &self,
        buffer: &SampleBuffer<'_>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport, AnalysisError> {
        let started = Instant::now();
        let spectrogram = self.builder.build(buffer, cancel)?;

        let (units, summary) = match self.segmenter.segment(&spectrogram, cancel) {
            Ok(segmentation) => {
                let units = self.extractor.extract(&spectrogram, &segmentation.runs, cancel)?;
                (units, Some(SegmentationSummary::from_segmentation(&segmentation)))
            }
            // no slices means no signal, not a failure
            Err(AnalysisError::EmptySpectrogram) => (Vec::new(), None),
            Err(err) => return Err(err),
        };

        tracing::info!(
            "[Analysis] {} unit(s) from {} slices in {:?}",
            units.len(),
            spectrogram.len(),
            started.elapsed()
        );

        Ok(AnalysisReport {
            result: AnalysisResult {
                units,
                duration: buffer.duration_secs(),
                sample_rate: buffer.sample_rate(),
            },
            summary,
        })
    }
}

/// One-shot analysis without cancellation
pub fn analyze(
    buffer: &SampleBuffer<'_>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    Analyzer::new(config)?.analyze(buffer, &CancellationToken::new())
}
