// LiveSpectrumCapture - byte spectrum for the live path
//
// Produces the 0-255 magnitude vector consumed by the live frame sampler,
// matching the behaviour of a browser analyser node:
// 1. Blackman window over the most recent `fft_size` samples
// 2. FFT, magnitude |X[k]| / N for the first N/2 bins
// 3. Exponential smoothing against the previous tick:
//    X̂[k] = τ·X̂_prev[k] + (1 - τ)·|X[k]|
// 4. 20·log10, then linear map [min_db, max_db] -> [0, 255], clamped
//
// Unlike the sampler this is stateful (the smoothing memory), so each
// playback stream owns one capture.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::magnitude::ByteMagnitude;
use crate::config::LiveCaptureConfig;
use crate::error::AnalysisError;

pub struct LiveSpectrumCapture {
    fft: Arc<dyn Fft<f32>>,
    config: LiveCaptureConfig,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl LiveSpectrumCapture {
    pub fn new(config: LiveCaptureConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let n = config.fft_size;

        // Blackman window, alpha = 0.16
        let window = (0..n)
            .map(|i| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();

        Ok(Self {
            fft: FftPlanner::new().plan_fft_forward(n),
            window,
            smoothed: vec![0.0; n / 2],
            buffer: vec![Complex::new(0.0, 0.0); n],
            config,
        })
    }

    pub fn bin_count(&self) -> usize {
        self.config.fft_size / 2
    }

    /// Forget the smoothing memory (e.g. after a seek)
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }

    /// Capture the byte spectrum of the latest samples
    ///
    /// Uses the last `fft_size` samples of `recent`; shorter input is
    /// zero-padded at the end.
    pub fn capture(&mut self, recent: &[f32]) -> Vec<ByteMagnitude> {
        let n = self.config.fft_size;
        let frame = &recent[recent.len().saturating_sub(n)..];

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = frame.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let tau = self.config.smoothing;
        let range = self.config.max_db - self.config.min_db;
        let scale = 1.0 / n as f32;

        self.buffer[..n / 2]
            .iter()
            .zip(self.smoothed.iter_mut())
            .map(|(bin, memory)| {
                *memory = tau * *memory + (1.0 - tau) * bin.norm() * scale;
                let db = 20.0 * memory.max(1e-20).log10();
                let byte = 255.0 * (db - self.config.min_db) / range;
                ByteMagnitude(byte.clamp(0.0, 255.0) as u8)
            })
            .collect()
    }
}
