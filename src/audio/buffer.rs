use std::borrow::Cow;

use crate::error::AnalysisError;

/// Borrowed, read-only view of decoded audio
///
/// Samples are interleaved when `channels > 1`; only the first channel is
/// analyzed.
#[derive(Debug, Clone, Copy)]
pub struct SampleBuffer<'a> {
    samples: &'a [f32],
    sample_rate: u32,
    channels: u16,
}

impl<'a> SampleBuffer<'a> {
    pub fn new(samples: &'a [f32], sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        match self.channels {
            0 => 0,
            n => self.samples.len() / n as usize,
        }
    }

    /// Length of the buffer in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::invalid("sample rate must be greater than 0"));
        }
        if self.channels == 0 {
            return Err(AnalysisError::invalid("buffer must have at least one channel"));
        }
        if self.frames() == 0 {
            return Err(AnalysisError::invalid("sample buffer is empty"));
        }
        Ok(())
    }

    /// First channel samples; borrowed when the buffer is mono
    pub fn first_channel(&self) -> Cow<'a, [f32]> {
        match self.channels {
            0 => Cow::Borrowed(&[]),
            1 => Cow::Borrowed(self.samples),
            n => Cow::Owned(self.samples.iter().step_by(n as usize).copied().collect()),
        }
    }
}

/// Owned decoded audio as delivered by a decoder
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, sample_rate, 1)
    }

    pub fn as_buffer(&self) -> SampleBuffer<'_> {
        SampleBuffer::new(&self.samples, self.sample_rate, self.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_channel_of_stereo() {
        let samples = [1.0, -1.0, 2.0, -2.0, 3.0, -3.0];
        let buffer = SampleBuffer::new(&samples, 8_000, 2);
        assert_eq!(buffer.frames(), 3);
        assert_eq!(&*buffer.first_channel(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mono_is_borrowed() {
        let samples = [0.1, 0.2];
        let buffer = SampleBuffer::new(&samples, 8_000, 1);
        assert!(matches!(buffer.first_channel(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_duration() {
        let audio = DecodedAudio::mono(vec![0.0; 22_050], 44_100);
        assert!((audio.as_buffer().duration_secs() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_degenerate_buffers() {
        assert!(SampleBuffer::new(&[], 44_100, 1).validate().is_err());
        assert!(SampleBuffer::new(&[0.0], 0, 1).validate().is_err());
        assert!(SampleBuffer::new(&[0.0], 44_100, 0).validate().is_err());
        assert!(SampleBuffer::new(&[0.0], 44_100, 1).validate().is_ok());
    }
}
