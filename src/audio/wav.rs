//! WAV decoding adapter backed by `hound`.
//!
//! Integer PCM is normalized to [-1, 1] by its declared bit depth; float
//! WAV is passed through. Channel layout is preserved (interleaved) so the
//! analysis core can pick the first channel itself.

use std::path::Path;

use super::DecodedAudio;
use crate::error::AnalysisError;

/// Decode a WAV file into interleaved f32 samples
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<DecodedAudio, AnalysisError> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path).map_err(|err| AnalysisError::DecodeFailed {
        reason: format!("failed to open {}: {err}", path.display()),
    })?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(AnalysisError::DecodeFailed {
            reason: format!("{} has zero channels", path.display()),
        });
    }

    let read_err = |err: hound::Error| AnalysisError::DecodeFailed {
        reason: format!("error reading {}: {err}", path.display()),
    };

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(read_err))
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => match spec.bits_per_sample {
            8 | 16 | 24 | 32 => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|v| v as f32 / scale).map_err(read_err))
                    .collect::<Result<Vec<f32>, _>>()?
            }
            bits => {
                return Err(AnalysisError::DecodeFailed {
                    reason: format!(
                        "unsupported bits_per_sample={} for {}",
                        bits,
                        path.display()
                    ),
                })
            }
        },
    };

    tracing::debug!(
        "[Wav] Decoded {} samples ({} ch @ {} Hz) from {}",
        samples.len(),
        spec.channels,
        spec.sample_rate,
        path.display()
    );

    Ok(DecodedAudio::new(samples, spec.sample_rate, spec.channels))
}

/// Write audio as 32-bit float WAV
pub fn write_wav<P: AsRef<Path>>(path: P, audio: &DecodedAudio) -> Result<(), AnalysisError> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;
    for &sample in &audio.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("acoustic-units-{}-{}.wav", name, std::process::id()))
    }

    #[test]
    fn test_float_wav_roundtrip_preserves_layout() {
        let path = temp_path("float");
        let audio = DecodedAudio::new(vec![0.25, -0.25, 0.5, -0.5], 22_050, 2);
        write_wav(&path, &audio).unwrap();

        let decoded = read_wav(&path).unwrap();
        assert_eq!(decoded, audio);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_int16_wav_is_normalized() {
        let path = temp_path("int16");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(i16::MIN).unwrap();
        writer.write_sample(16_384i16).unwrap();
        writer.finalize().unwrap();

        let decoded = read_wav(&path).unwrap();
        assert_eq!(decoded.samples, vec![-1.0, 0.5]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let err = read_wav("/no/such/file.wav").unwrap_err();
        assert!(matches!(err, AnalysisError::DecodeFailed { .. }));
    }
}
