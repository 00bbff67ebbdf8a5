//! Deterministic synthetic signals for tests and generated fixture files.
//!
//! Every generator is a pure function of its arguments (noise uses a seeded
//! `StdRng`), so fixtures built here reproduce bit-for-bit across runs.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Default seed for noise fixtures
pub const NOISE_SEED: u64 = 0x5A5A_FFF0;

/// A sine tone present between `start_s` and `end_s`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneBurst {
    pub start_s: f64,
    pub end_s: f64,
    pub frequency_hz: f64,
    pub amplitude: f32,
}

impl ToneBurst {
    pub fn new(start_s: f64, end_s: f64, frequency_hz: f64, amplitude: f32) -> Self {
        Self {
            start_s,
            end_s,
            frequency_hz,
            amplitude,
        }
    }
}

/// `samples` samples of a sine starting at phase zero
pub fn sine(sample_rate: u32, frequency_hz: f32, amplitude: f32, samples: usize) -> Vec<f32> {
    (0..samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            amplitude * (2.0 * PI * frequency_hz as f64 * t).sin() as f32
        })
        .collect()
}

/// Silence with tone bursts written at their absolute positions
///
/// Burst phase is measured from the start of the buffer, so two bursts of the
/// same frequency stay phase-coherent.
pub fn tone_bursts(sample_rate: u32, duration_s: f64, bursts: &[ToneBurst]) -> Vec<f32> {
    let total = (duration_s * sample_rate as f64).round() as usize;
    let mut samples = vec![0.0f32; total];

    for burst in bursts {
        let start = ((burst.start_s * sample_rate as f64).round() as usize).min(total);
        let end = ((burst.end_s * sample_rate as f64).round() as usize).min(total);
        for (i, sample) in samples.iter_mut().enumerate().take(end).skip(start) {
            let t = i as f64 / sample_rate as f64;
            *sample += burst.amplitude * (2.0 * PI * burst.frequency_hz * t).sin() as f32;
        }
    }

    samples
}

/// Uniform white noise in `[-amplitude, amplitude)`
pub fn white_noise(samples: usize, amplitude: f32, seed: u64) -> Vec<f32> {
    if amplitude <= 0.0 {
        return vec![0.0; samples];
    }
    let mut rng = StdRng::seed_from_u64(seed);
    (0..samples)
        .map(|_| rng.gen_range(-amplitude..amplitude))
        .collect()
}

/// Sample-wise sum of `other` into `target` (extra samples in `other` are ignored)
pub fn mix_into(target: &mut [f32], other: &[f32]) {
    for (t, o) in target.iter_mut().zip(other) {
        *t += *o;
    }
}
