// Band module - frequency range of interest and its bin mapping

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Contiguous frequency range considered "signal of interest"
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FrequencyBand {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl Default for FrequencyBand {
    fn default() -> Self {
        Self {
            min_hz: 50.0,
            max_hz: 4000.0,
        }
    }
}

/// Half-open bin range `[start, end)` covered by a band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinRange {
    pub start: usize,
    pub end: usize,
}

impl BinRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl FrequencyBand {
    pub fn new(min_hz: f32, max_hz: f32) -> Self {
        Self { min_hz, max_hz }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.min_hz.is_finite() || !self.max_hz.is_finite() {
            return Err(AnalysisError::invalid("band edges must be finite"));
        }
        if self.min_hz < 0.0 || self.min_hz >= self.max_hz {
            return Err(AnalysisError::invalid(format!(
                "band must satisfy 0 <= min < max (got {}..{} Hz)",
                self.min_hz, self.max_hz
            )));
        }
        Ok(())
    }

    /// Map the band to bins via `floor(freq * transform_size / sample_rate)`
    ///
    /// Both edges are clamped to `bin_count`. A band lying entirely above
    /// Nyquist yields an empty range.
    pub fn bin_range(&self, sample_rate: u32, transform_size: usize, bin_count: usize) -> BinRange {
        let to_bin = |hz: f32| -> usize {
            let bin = (hz as f64 * transform_size as f64 / sample_rate as f64).floor();
            (bin.max(0.0) as usize).min(bin_count)
        };
        let start = to_bin(self.min_hz);
        let end = to_bin(self.max_hz).max(start);
        BinRange { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_band_bins_at_44100() {
        let range = FrequencyBand::default().bin_range(44_100, 2048, 1024);
        // 50 * 2048 / 44100 = 2.32, 4000 * 2048 / 44100 = 185.76
        assert_eq!(range, BinRange { start: 2, end: 185 });
        assert_eq!(range.len(), 183);
    }

    #[test]
    fn test_band_clamped_to_bin_count() {
        let range = FrequencyBand::new(50.0, 30_000.0).bin_range(8_000, 256, 128);
        assert_eq!(range.end, 128);
    }

    #[test]
    fn test_band_above_nyquist_is_empty() {
        let range = FrequencyBand::new(20_000.0, 30_000.0).bin_range(8_000, 256, 128);
        assert!(range.is_empty());
    }

    #[test]
    fn test_band_validation() {
        assert!(FrequencyBand::default().validate().is_ok());
        assert!(FrequencyBand::new(4000.0, 50.0).validate().is_err());
        assert!(FrequencyBand::new(-1.0, 50.0).validate().is_err());
        assert!(FrequencyBand::new(f32::NAN, 50.0).validate().is_err());
    }
}
