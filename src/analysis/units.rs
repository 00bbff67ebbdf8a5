// Unit feature extractor
//
// Turns each active slice run into a `Unit`:
// - timing from the run boundaries and the slice stride
// - per-slice peak frequency from the loudest in-band bin
// - dominant frequency as the mode of peaks rounded to 10 Hz
// - average intensity as the mean of per-slice band means
// - the full-bandwidth slices, kept verbatim for rendering

use serde::{Deserialize, Serialize};

use super::band::{BinRange, FrequencyBand};
use super::cancel::CancellationToken;
use super::magnitude::Decibels;
use super::segmenter::{band_mean, SliceRun};
use super::spectrogram::{Spectrogram, SpectrogramSlice};
use crate::error::AnalysisError;

/// Resolution used when binning peak frequencies for the mode
pub const DOMINANT_FREQUENCY_RESOLUTION_HZ: f64 = 10.0;

/// A detected acoustic event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Seconds from the start of the recording
    pub start_time: f64,
    /// Seconds from the start of the recording; always > `start_time`
    pub end_time: f64,
    /// `end_time - start_time`
    pub duration: f64,
    /// Mode of per-slice peak frequencies rounded to 10 Hz
    pub dominant_frequency: f64,
    /// Mean band-limited magnitude across the unit
    pub average_intensity: Decibels,
    /// Per-slice peak frequency in Hz, time order
    pub peak_frequencies: Vec<f64>,
    /// Full-bandwidth slices spanning the unit
    pub spectrogram_slices: Vec<SpectrogramSlice>,
}

/// Extracts unit features from segmented runs
#[derive(Debug, Clone)]
pub struct UnitExtractor {
    band: FrequencyBand,
}

impl UnitExtractor {
    pub fn new(band: FrequencyBand) -> Self {
        Self { band }
    }

    /// One `Unit` per run, in run order
    pub fn extract(
        &self,
        spectrogram: &Spectrogram,
        runs: &[SliceRun],
        cancel: &CancellationToken,
    ) -> Result<Vec<Unit>, AnalysisError> {
        let bins = self.band.bin_range(
            spectrogram.sample_rate(),
            spectrogram.transform_size(),
            spectrogram.bin_count(),
        );

        let mut units = Vec::with_capacity(runs.len());
        for run in runs {
            if run.is_empty() || run.end > spectrogram.len() {
                return Err(AnalysisError::invalid(format!(
                    "run {}..{} outside spectrogram of {} slices",
                    run.start,
                    run.end,
                    spectrogram.len()
                )));
            }
            units.push(self.extract_unit(spectrogram, *run, bins, cancel)?);
        }
        Ok(units)
    }

    fn extract_unit(
        &self,
        spectrogram: &Spectrogram,
        run: SliceRun,
        bins: BinRange,
        cancel: &CancellationToken,
    ) -> Result<Unit, AnalysisError> {
        let slices = &spectrogram.slices()[run.start..run.end];
        let seconds_per_slice =
            spectrogram.slice_stride() as f64 / spectrogram.sample_rate() as f64;

        let mut peak_frequencies = Vec::with_capacity(slices.len());
        let mut intensity_sum = 0.0f64;
        for slice in slices {
            cancel.check()?;
            peak_frequencies.push(self.peak_frequency(slice, bins, spectrogram.bin_width_hz()));
            intensity_sum += band_mean(slice, bins).value() as f64;
        }

        let start_time = run.start as f64 * seconds_per_slice;
        let end_time = run.end as f64 * seconds_per_slice;

        Ok(Unit {
            start_time,
            end_time,
            duration: end_time - start_time,
            dominant_frequency: dominant_frequency(&peak_frequencies),
            average_intensity: Decibels((intensity_sum / slices.len() as f64) as f32),
            peak_frequencies,
            spectrogram_slices: slices.to_vec(),
        })
    }

    /// Loudest in-band bin as `min_band_hz + offset * bin_width`
    ///
    /// Ties go to the lowest bin.
    fn peak_frequency(&self, slice: &SpectrogramSlice, bins: BinRange, bin_width_hz: f64) -> f64 {
        let values = &slice.magnitudes()[bins.start..bins.end];
        let mut peak_offset = 0usize;
        for (offset, &db) in values.iter().enumerate() {
            if db > values[peak_offset] {
                peak_offset = offset;
            }
        }
        self.band.min_hz as f64 + peak_offset as f64 * bin_width_hz
    }
}

/// Mode of `frequencies` rounded to the nearest 10 Hz
///
/// Ties are broken by whichever value was seen first. Returns 0.0 for an
/// empty input.
pub fn dominant_frequency(frequencies: &[f64]) -> f64 {
    let mut counts: Vec<(i64, usize)> = Vec::new();
    for &freq in frequencies {
        let key = (freq / DOMINANT_FREQUENCY_RESOLUTION_HZ).round() as i64;
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => counts.push((key, 1)),
        }
    }

    let mut best: Option<(i64, usize)> = None;
    for &(key, count) in &counts {
        if best.map(|(_, c)| count > c).unwrap_or(true) {
            best = Some((key, count));
        }
    }

    best.map(|(key, _)| key as f64 * DOMINANT_FREQUENCY_RESOLUTION_HZ)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::magnitude::MIN_DB;

    const RATE: u32 = 8_000;
    const SIZE: usize = 256;

    /// Slice with a single loud bin
    fn slice_with_peak(bin: usize, db: f32) -> SpectrogramSlice {
        let mut values = vec![MIN_DB; SIZE / 2];
        values[bin] = db;
        SpectrogramSlice::from_db(values)
    }

    #[test]
    fn test_dominant_frequency_mode() {
        assert_eq!(dominant_frequency(&[502.2, 498.0, 731.0]), 500.0);
        assert_eq!(dominant_frequency(&[]), 0.0);
    }

    #[test]
    fn test_dominant_frequency_tie_prefers_first_seen() {
        assert_eq!(dominant_frequency(&[700.0, 300.0, 300.0, 700.0]), 700.0);
        assert_eq!(dominant_frequency(&[300.0, 700.0]), 300.0);
    }

    #[test]
    fn test_extract_timing_and_features() {
        // bin width 31.25 Hz; band 50..4000 -> bins 1..128
        let mut slices = vec![SpectrogramSlice::from_db(vec![MIN_DB; SIZE / 2]); 10];
        slices[3] = slice_with_peak(17, -10.0);
        slices[4] = slice_with_peak(17, -10.0);
        slices[5] = slice_with_peak(33, -10.0);
        let spec = Spectrogram::from_slices(slices, RATE, SIZE).unwrap();

        let extractor = UnitExtractor::new(FrequencyBand::default());
        let units = extractor
            .extract(&spec, &[SliceRun { start: 3, end: 6 }], &CancellationToken::new())
            .unwrap();
        assert_eq!(units.len(), 1);

        let unit = &units[0];
        assert!((unit.start_time - 0.096).abs() < 1e-12);
        assert!((unit.end_time - 0.192).abs() < 1e-12);
        assert_eq!(unit.duration, unit.end_time - unit.start_time);
        // offset 16 -> 50 + 16 * 31.25 = 550; offset 32 -> 1050
        assert_eq!(unit.peak_frequencies, vec![550.0, 550.0, 1050.0]);
        assert_eq!(unit.dominant_frequency, 550.0);
        assert_eq!(unit.spectrogram_slices.len(), 3);
        assert_eq!(unit.spectrogram_slices[2], spec.slices()[5]);

        let expected = (-10.0 + MIN_DB * 126.0) / 127.0;
        assert!((unit.average_intensity.value() - expected).abs() < 1e-3);
    }

    #[test]
    fn test_peak_ties_pick_lowest_bin() {
        let mut values = vec![MIN_DB; SIZE / 2];
        values[10] = -5.0;
        values[20] = -5.0;
        let spec =
            Spectrogram::from_slices(vec![SpectrogramSlice::from_db(values)], RATE, SIZE).unwrap();
        let units = UnitExtractor::new(FrequencyBand::default())
            .extract(&spec, &[SliceRun { start: 0, end: 1 }], &CancellationToken::new())
            .unwrap();
        assert_eq!(units[0].peak_frequencies, vec![50.0 + 9.0 * 31.25]);
    }

    #[test]
    fn test_run_outside_spectrogram_rejected() {
        let spec = Spectrogram::from_slices(
            vec![SpectrogramSlice::from_db(vec![MIN_DB; SIZE / 2]); 2],
            RATE,
            SIZE,
        )
        .unwrap();
        let result = UnitExtractor::new(FrequencyBand::default()).extract(
            &spec,
            &[SliceRun { start: 1, end: 3 }],
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(AnalysisError::InvalidInput { .. })));
    }
}
