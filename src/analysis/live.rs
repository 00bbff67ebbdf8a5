// Live frame sampler
//
// Reduces the current byte-magnitude vector (0-255 per bin) to a single
// peak-frequency / average-volume pair. Called once per rendering tick while
// audio plays; it keeps no state between calls.

use serde::{Deserialize, Serialize};

use super::magnitude::{ByteMagnitude, LinearVolume};

/// Ephemeral per-tick summary of the live spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveFrame {
    /// Frequency of the loudest bin, Hz
    pub peak_frequency: f64,
    /// Mean bin value on the linear 0-255 scale
    pub average_volume: LinearVolume,
}

/// Stateless per-tick sampler
#[derive(Debug, Clone, Copy)]
pub struct LiveFrameSampler {
    sample_rate: u32,
}

impl LiveFrameSampler {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Summarize one captured magnitude vector
    ///
    /// The peak is the first bin holding the maximum value, converted as
    /// `index * (sample_rate / 2) / bin_count`. An empty vector yields a
    /// silent frame at 0 Hz.
    pub fn sample(&self, magnitudes: &[ByteMagnitude]) -> LiveFrame {
        if magnitudes.is_empty() {
            return LiveFrame {
                peak_frequency: 0.0,
                average_volume: LinearVolume(0.0),
            };
        }

        let mut total = 0u64;
        let mut peak = 0usize;
        for (i, magnitude) in magnitudes.iter().enumerate() {
            total += magnitude.0 as u64;
            if magnitude > &magnitudes[peak] {
                peak = i;
            }
        }

        let bin_count = magnitudes.len() as f64;
        LiveFrame {
            peak_frequency: peak as f64 * (self.sample_rate as f64 / 2.0) / bin_count,
            average_volume: LinearVolume((total as f64 / bin_count) as f32),
        }
    }

    /// Same as [`sample`](Self::sample) for raw byte buffers
    pub fn sample_bytes(&self, bytes: &[u8]) -> LiveFrame {
        let magnitudes: Vec<ByteMagnitude> = bytes.iter().copied().map(ByteMagnitude).collect();
        self.sample(&magnitudes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_peak_bin() {
        let mut bytes = vec![0u8; 128];
        bytes[10] = 255;
        let frame = LiveFrameSampler::new(44_100).sample_bytes(&bytes);

        assert!((frame.average_volume.value() - 255.0 / 128.0).abs() < 1e-6);
        assert_eq!(frame.peak_frequency, 10.0 * (44_100.0 / 2.0) / 128.0);
    }

    #[test]
    fn test_first_maximum_wins() {
        let mut bytes = vec![3u8; 64];
        bytes[5] = 200;
        bytes[40] = 200;
        let frame = LiveFrameSampler::new(48_000).sample_bytes(&bytes);
        assert_eq!(frame.peak_frequency, 5.0 * 24_000.0 / 64.0);
    }

    #[test]
    fn test_flat_vector_peaks_at_zero() {
        let frame = LiveFrameSampler::new(48_000).sample_bytes(&[7u8; 32]);
        assert_eq!(frame.peak_frequency, 0.0);
        assert_eq!(frame.average_volume, LinearVolume(7.0));
    }

    #[test]
    fn test_empty_vector() {
        let frame = LiveFrameSampler::new(48_000).sample(&[]);
        assert_eq!(frame.peak_frequency, 0.0);
        assert_eq!(frame.average_volume, LinearVolume(0.0));
    }
}
