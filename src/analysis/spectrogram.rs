// Spectrogram builder - windowed FFT over non-overlapping slices
//
// Algorithm (per slice of `transform_size` samples):
// 1. Silence fast path: if max |x| < silence amplitude, every bin is MIN_DB
//    and the FFT is skipped
// 2. Apply a Hann window sized to the samples actually present
// 3. Zero-pad to `transform_size` and compute the complex FFT
// 4. Keep the first `transform_size / 2` bins as 20·log10|X[k]|, floored at MIN_DB
//
// Slices are independent, so the per-slice work can be spread across scoped
// worker threads. Each worker owns a contiguous block of slice indices and
// blocks are concatenated in index order, so the output never depends on the
// thread count.

use std::sync::Arc;
use std::thread;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use super::cancel::CancellationToken;
use super::magnitude::{Decibels, MIN_DB};
use crate::audio::SampleBuffer;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

/// Magnitudes of one time window, one dB value per bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpectrogramSlice {
    magnitudes_db: Vec<f32>,
}

impl SpectrogramSlice {
    fn silent(bin_count: usize) -> Self {
        Self {
            magnitudes_db: vec![MIN_DB; bin_count],
        }
    }

    pub fn from_db(magnitudes_db: Vec<f32>) -> Self {
        Self { magnitudes_db }
    }

    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes_db
    }

    pub fn len(&self) -> usize {
        self.magnitudes_db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes_db.is_empty()
    }
}

/// Ordered slices plus the geometry needed to map them back to time and Hz
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    slices: Vec<SpectrogramSlice>,
    slice_stride: usize,
    transform_size: usize,
    bin_count: usize,
    sample_rate: u32,
}

impl Spectrogram {
    /// Assemble a spectrogram from precomputed slices
    ///
    /// Every slice must hold exactly `transform_size / 2` bins.
    pub fn from_slices(
        slices: Vec<SpectrogramSlice>,
        sample_rate: u32,
        transform_size: usize,
    ) -> Result<Self, AnalysisError> {
        validate_geometry(sample_rate, transform_size)?;
        let bin_count = transform_size / 2;
        if let Some(bad) = slices.iter().position(|slice| slice.len() != bin_count) {
            return Err(AnalysisError::invalid(format!(
                "slice {} has {} bins, expected {}",
                bad,
                slices[bad].len(),
                bin_count
            )));
        }
        Ok(Self {
            slices,
            slice_stride: transform_size,
            transform_size,
            bin_count,
            sample_rate,
        })
    }

    pub fn slices(&self) -> &[SpectrogramSlice] {
        &self.slices
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Samples between consecutive slice starts
    pub fn slice_stride(&self) -> usize {
        self.slice_stride
    }

    pub fn transform_size(&self) -> usize {
        self.transform_size
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Width of one bin in Hz
    pub fn bin_width_hz(&self) -> f64 {
        self.sample_rate as f64 / self.transform_size as f64
    }
}

fn validate_geometry(sample_rate: u32, transform_size: usize) -> Result<(), AnalysisError> {
    if transform_size == 0 || !transform_size.is_power_of_two() {
        return Err(AnalysisError::invalid(format!(
            "transform size must be a positive power of two (got {})",
            transform_size
        )));
    }
    if sample_rate == 0 {
        return Err(AnalysisError::invalid("sample rate must be greater than 0"));
    }
    Ok(())
}

/// Builds spectrograms from sample buffers
pub struct SpectrogramBuilder {
    fft: Arc<dyn Fft<f32>>,
    transform_size: usize,
    silence_amplitude: f32,
    worker_threads: usize,
}

impl SpectrogramBuilder {
    /// Create a builder for `transform_size`-sample slices
    pub fn new(transform_size: usize) -> Result<Self, AnalysisError> {
        Self::with_config(&AnalysisConfig {
            transform_size,
            ..AnalysisConfig::default()
        })
    }

    pub fn with_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        validate_geometry(1, config.transform_size)?;
        let fft = FftPlanner::new().plan_fft_forward(config.transform_size);
        Ok(Self {
            fft,
            transform_size: config.transform_size,
            silence_amplitude: config.silence_amplitude,
            worker_threads: config.worker_threads.max(1),
        })
    }

    /// Build the spectrogram of the first channel of `buffer`
    pub fn build(
        &self,
        buffer: &SampleBuffer<'_>,
        cancel: &CancellationToken,
    ) -> Result<Spectrogram, AnalysisError> {
        buffer.validate()?;
        validate_geometry(buffer.sample_rate(), self.transform_size)?;

        let samples = buffer.first_channel();
        let slice_count = samples.len().div_ceil(self.transform_size);
        let workers = self.worker_threads.min(slice_count).max(1);

        tracing::debug!(
            "[Spectrogram] Building {} slices of {} samples on {} worker(s)",
            slice_count,
            self.transform_size,
            workers
        );

        let slices = if workers == 1 {
            self.compute_range(&samples, 0..slice_count, cancel)?
        } else {
            self.compute_parallel(&samples, slice_count, workers, cancel)?
        };

        Ok(Spectrogram {
            slices,
            slice_stride: self.transform_size,
            transform_size: self.transform_size,
            bin_count: self.transform_size / 2,
            sample_rate: buffer.sample_rate(),
        })
    }

    fn compute_parallel(
        &self,
        samples: &[f32],
        slice_count: usize,
        workers: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SpectrogramSlice>, AnalysisError> {
        let block = slice_count.div_ceil(workers);

        thread::scope(|scope| -> Result<Vec<SpectrogramSlice>, AnalysisError> {
            let handles: Vec<_> = (0..slice_count)
                .step_by(block)
                .map(|start| {
                    let end = (start + block).min(slice_count);
                    scope.spawn(move || self.compute_range(samples, start..end, cancel))
                })
                .collect();

            let mut slices = Vec::with_capacity(slice_count);
            for handle in handles {
                let block_slices = handle
                    .join()
                    .map_err(|_| AnalysisError::WorkerPanicked)??;
                slices.extend(block_slices);
            }
            Ok(slices)
        })
    }

    fn compute_range(
        &self,
        samples: &[f32],
        indices: std::ops::Range<usize>,
        cancel: &CancellationToken,
    ) -> Result<Vec<SpectrogramSlice>, AnalysisError> {
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.transform_size];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];
        let mut out = Vec::with_capacity(indices.len());

        for index in indices {
            cancel.check()?;
            let start = index * self.transform_size;
            let end = (start + self.transform_size).min(samples.len());
            out.push(self.compute_slice(&samples[start..end], &mut buffer, &mut scratch));
        }

        Ok(out)
    }

    fn compute_slice(
        &self,
        window: &[f32],
        buffer: &mut [Complex<f32>],
        scratch: &mut [Complex<f32>],
    ) -> SpectrogramSlice {
        let bin_count = self.transform_size / 2;
        let peak = window.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        if peak < self.silence_amplitude {
            return SpectrogramSlice::silent(bin_count);
        }

        let len = window.len() as f32;
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = match window.get(i) {
                Some(&sample) => {
                    let w = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / len).cos());
                    Complex::new(sample * w, 0.0)
                }
                None => Complex::new(0.0, 0.0),
            };
        }

        self.fft.process_with_scratch(buffer, scratch);

        SpectrogramSlice {
            magnitudes_db: buffer[..bin_count]
                .iter()
                .map(|c| Decibels::from_magnitude(c.norm()).value())
                .collect(),
        }
    }
}

/// Convenience wrapper: default silence threshold, single thread, no cancellation
pub fn build_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    transform_size: usize,
) -> Result<Spectrogram, AnalysisError> {
    let buffer = SampleBuffer::new(samples, sample_rate, 1);
    SpectrogramBuilder::new(transform_size)?.build(&buffer, &CancellationToken::new())
}
