// Adaptive threshold segmenter
//
// Two passes over the band-limited slice means:
// 1. Statistics: grand mean and population std-dev across the recording
//    threshold = max(base_threshold, mean + k * std_dev)
// 2. Run detection: a slice is active when its band mean is strictly above
//    the threshold; a run ends at the first slice at or below it. Runs
//    shorter than ceil(min_duration * sample_rate / stride) slices are
//    discarded. Neighbouring runs are never merged, even across a single
//    inactive slice.
//
// All statistics live in a `BandStatistics` value returned by pass 1; the
// segmenter itself holds configuration only.

use super::band::{BinRange, FrequencyBand};
use super::cancel::CancellationToken;
use super::magnitude::Decibels;
use super::spectrogram::{Spectrogram, SpectrogramSlice};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

/// Half-open range of slice indices `[start, end)` that stayed above threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRun {
    pub start: usize,
    pub end: usize,
}

impl SliceRun {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Pass-1 output: per-slice band means and their recording-wide moments
#[derive(Debug, Clone, PartialEq)]
pub struct BandStatistics {
    pub slice_means: Vec<f32>,
    pub mean: f64,
    pub std_dev: f64,
}

impl BandStatistics {
    /// Accumulate statistics over every slice of `spectrogram`
    pub fn collect(
        spectrogram: &Spectrogram,
        bins: BinRange,
        cancel: &CancellationToken,
    ) -> Result<Self, AnalysisError> {
        let mut slice_means = Vec::with_capacity(spectrogram.len());
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;

        for slice in spectrogram.slices() {
            cancel.check()?;
            let value = band_mean(slice, bins).value();
            sum += value as f64;
            sum_sq += value as f64 * value as f64;
            slice_means.push(value);
        }

        let n = slice_means.len().max(1) as f64;
        let mean = sum / n;
        // population variance; clamp rounding noise on constant input
        let variance = (sum_sq / n - mean * mean).max(0.0);

        Ok(Self {
            slice_means,
            mean,
            std_dev: variance.sqrt(),
        })
    }

    /// `max(base, mean + factor * std_dev)`
    pub fn threshold(&self, base: Decibels, factor: f32) -> Decibels {
        let adaptive = (self.mean + factor as f64 * self.std_dev) as f32;
        Decibels(adaptive.max(base.value()))
    }
}

/// Arithmetic mean of a slice's magnitudes restricted to `bins`
///
/// An empty range yields the floor value.
pub fn band_mean(slice: &SpectrogramSlice, bins: BinRange) -> Decibels {
    if bins.is_empty() {
        return Decibels::FLOOR;
    }
    let values = &slice.magnitudes()[bins.start..bins.end];
    Decibels(values.iter().sum::<f32>() / values.len() as f32)
}

/// Result of segmenting one recording
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub runs: Vec<SliceRun>,
    pub bins: BinRange,
    pub statistics: BandStatistics,
    pub threshold: Decibels,
    pub min_run_slices: usize,
}

/// Adaptive-threshold segmenter
#[derive(Debug, Clone)]
pub struct Segmenter {
    band: FrequencyBand,
    base_threshold: Decibels,
    std_dev_factor: f32,
    min_unit_duration_s: f64,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::with_config(&AnalysisConfig::default())
    }
}

impl Segmenter {
    pub fn with_config(config: &AnalysisConfig) -> Self {
        Self {
            band: config.band,
            base_threshold: Decibels(config.base_threshold_db),
            std_dev_factor: config.std_dev_factor,
            min_unit_duration_s: config.min_unit_duration_s,
        }
    }

    /// Minimum run length in slices: `ceil(min_duration * sample_rate / stride)`
    pub fn min_run_slices(&self, sample_rate: u32, slice_stride: usize) -> usize {
        let slices = self.min_unit_duration_s * sample_rate as f64 / slice_stride as f64;
        // keep exact multiples exact despite float noise
        let rounded = slices.round();
        let slices = if (slices - rounded).abs() < 1e-9 {
            rounded
        } else {
            slices.ceil()
        };
        (slices as usize).max(1)
    }

    /// Partition the spectrogram into active runs
    ///
    /// Fails with `EmptySpectrogram` when there are no slices. An empty run
    /// list is a normal outcome.
    pub fn segment(
        &self,
        spectrogram: &Spectrogram,
        cancel: &CancellationToken,
    ) -> Result<Segmentation, AnalysisError> {
        if spectrogram.is_empty() {
            return Err(AnalysisError::EmptySpectrogram);
        }

        let bins = self.band.bin_range(
            spectrogram.sample_rate(),
            spectrogram.transform_size(),
            spectrogram.bin_count(),
        );
        let statistics = BandStatistics::collect(spectrogram, bins, cancel)?;
        let threshold = statistics.threshold(self.base_threshold, self.std_dev_factor);
        let min_run_slices =
            self.min_run_slices(spectrogram.sample_rate(), spectrogram.slice_stride());

        let runs = detect_runs(&statistics.slice_means, threshold, min_run_slices, cancel)?;

        tracing::debug!(
            "[Segmenter] mean={:.2} std={:.2} threshold={} bins={}..{} min_run={} runs={}",
            statistics.mean,
            statistics.std_dev,
            threshold,
            bins.start,
            bins.end,
            min_run_slices,
            runs.len()
        );

        Ok(Segmentation {
            runs,
            bins,
            statistics,
            threshold,
            min_run_slices,
        })
    }
}

/// Pass 2: run-length scan over per-slice band means
fn detect_runs(
    slice_means: &[f32],
    threshold: Decibels,
    min_run_slices: usize,
    cancel: &CancellationToken,
) -> Result<Vec<SliceRun>, AnalysisError> {
    let mut runs = Vec::new();
    let mut in_unit = false;
    let mut run_start = 0usize;
    let mut consecutive = 0usize;

    for (index, &value) in slice_means.iter().enumerate() {
        cancel.check()?;
        if value > threshold.value() {
            if !in_unit {
                in_unit = true;
                run_start = index;
                consecutive = 0;
            }
            consecutive += 1;
        } else if in_unit {
            in_unit = false;
            if consecutive >= min_run_slices {
                runs.push(SliceRun {
                    start: run_start,
                    end: index,
                });
            }
        }
    }

    if in_unit && consecutive >= min_run_slices {
        runs.push(SliceRun {
            start: run_start,
            end: slice_means.len(),
        });
    }

    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::magnitude::MIN_DB;

    const RATE: u32 = 8_000;
    const SIZE: usize = 256;

    /// Spectrogram whose every bin in slice i equals `levels[i]`
    fn flat_spectrogram(levels: &[f32]) -> Spectrogram {
        let slices = levels
            .iter()
            .map(|&db| SpectrogramSlice::from_db(vec![db; SIZE / 2]))
            .collect();
        Spectrogram::from_slices(slices, RATE, SIZE).unwrap()
    }

    fn segmenter(min_duration: f64) -> Segmenter {
        Segmenter::with_config(&AnalysisConfig {
            transform_size: SIZE,
            min_unit_duration_s: min_duration,
            ..AnalysisConfig::default()
        })
    }

    fn quiet_with_bursts(total: usize, bursts: &[(usize, usize)]) -> Vec<f32> {
        let mut levels = vec![MIN_DB; total];
        for &(start, end) in bursts {
            levels[start..end].fill(-20.0);
        }
        levels
    }

    #[test]
    fn test_min_run_slices() {
        // 0.1 s * 44100 / 2048 = 2.15 -> 3
        assert_eq!(Segmenter::default().min_run_slices(44_100, 2048), 3);
        // 0.096 s * 8000 / 256 = 3.0 exactly
        assert_eq!(segmenter(0.096).min_run_slices(RATE, SIZE), 3);
        assert_eq!(segmenter(0.0).min_run_slices(RATE, SIZE), 1);
    }

    #[test]
    fn test_statistics_are_population_moments() {
        let spec = flat_spectrogram(&[-80.0, -60.0]);
        let bins = FrequencyBand::default().bin_range(RATE, SIZE, SIZE / 2);
        let stats = BandStatistics::collect(&spec, bins, &CancellationToken::new()).unwrap();
        assert_eq!(stats.slice_means, vec![-80.0, -60.0]);
        assert!((stats.mean + 70.0).abs() < 1e-9);
        assert!((stats.std_dev - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_respects_floor() {
        let stats = BandStatistics {
            slice_means: vec![-90.0; 4],
            mean: -90.0,
            std_dev: 0.0,
        };
        assert_eq!(stats.threshold(Decibels(-70.0), 2.0), Decibels(-70.0));

        let stats = BandStatistics {
            slice_means: vec![],
            mean: -50.0,
            std_dev: 5.0,
        };
        assert_eq!(stats.threshold(Decibels(-70.0), 2.0), Decibels(-40.0));
    }

    #[test]
    fn test_single_run_detected() {
        // 0.1 s at 8000/256 -> ceil(3.125) = 4 slices minimum
        let spec = flat_spectrogram(&quiet_with_bursts(100, &[(10, 16)]));
        let seg = segmenter(0.1).segment(&spec, &CancellationToken::new()).unwrap();
        assert_eq!(seg.min_run_slices, 4);
        assert_eq!(seg.runs, vec![SliceRun { start: 10, end: 16 }]);
    }

    #[test]
    fn test_short_runs_discarded() {
        let spec = flat_spectrogram(&quiet_with_bursts(100, &[(10, 13), (40, 44)]));
        let seg = segmenter(0.1).segment(&spec, &CancellationToken::new()).unwrap();
        assert_eq!(seg.runs, vec![SliceRun { start: 40, end: 44 }]);
    }

    #[test]
    fn test_runs_split_by_one_slice_are_not_merged() {
        let spec = flat_spectrogram(&quiet_with_bursts(100, &[(10, 15), (16, 21)]));
        let seg = segmenter(0.1).segment(&spec, &CancellationToken::new()).unwrap();
        assert_eq!(
            seg.runs,
            vec![
                SliceRun { start: 10, end: 15 },
                SliceRun { start: 16, end: 21 }
            ]
        );
    }

    #[test]
    fn test_run_open_at_end_is_emitted() {
        let spec = flat_spectrogram(&quiet_with_bursts(100, &[(95, 100)]));
        let seg = segmenter(0.1).segment(&spec, &CancellationToken::new()).unwrap();
        assert_eq!(seg.runs, vec![SliceRun { start: 95, end: 100 }]);

        let spec = flat_spectrogram(&quiet_with_bursts(100, &[(98, 100)]));
        let seg = segmenter(0.1).segment(&spec, &CancellationToken::new()).unwrap();
        assert!(seg.runs.is_empty());
    }

    #[test]
    fn test_exactly_at_threshold_is_inactive() {
        let means = vec![-90.0, -70.0, -70.0, -70.0, -70.0, -90.0];
        let runs = detect_runs(&means, Decibels(-70.0), 1, &CancellationToken::new()).unwrap();
        assert!(runs.is_empty());

        let means = vec![-90.0, -69.9, -69.9, -90.0];
        let runs = detect_runs(&means, Decibels(-70.0), 1, &CancellationToken::new()).unwrap();
        assert_eq!(runs, vec![SliceRun { start: 1, end: 3 }]);
    }

    #[test]
    fn test_constant_level_below_floor_yields_nothing() {
        let spec = flat_spectrogram(&vec![-75.0; 50]);
        let seg = segmenter(0.0).segment(&spec, &CancellationToken::new()).unwrap();
        assert_eq!(seg.statistics.std_dev, 0.0);
        assert_eq!(seg.threshold, Decibels(-70.0));
        assert!(seg.runs.is_empty());
    }

    #[test]
    fn test_empty_spectrogram_is_error() {
        let spec = Spectrogram::from_slices(Vec::new(), RATE, SIZE).unwrap();
        assert_eq!(
            Segmenter::default().segment(&spec, &CancellationToken::new()),
            Err(AnalysisError::EmptySpectrogram)
        );
    }

    #[test]
    fn test_band_mean_uses_band_bins_only() {
        let mut values = vec![MIN_DB; 8];
        values[2] = 0.0;
        values[3] = -10.0;
        let slice = SpectrogramSlice::from_db(values);
        let mean = band_mean(&slice, BinRange { start: 2, end: 4 });
        assert_eq!(mean, Decibels(-5.0));
        assert_eq!(band_mean(&slice, BinRange { start: 4, end: 4 }), Decibels::FLOOR);
    }
}
