//! Configuration management for analysis parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration on detection parameters without recompilation.
//! Every field has a default so partial files are accepted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::band::FrequencyBand;
use crate::error::AnalysisError;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub live: LiveCaptureConfig,
    pub cadence: CadenceConfig,
}

/// Preset sensitivity for the offline detector
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Short units allowed (0.1 s minimum)
    Sensitive,
    /// Only sustained units (0.2 s minimum)
    Conservative,
}

impl DetectionMode {
    pub fn min_unit_duration_s(self) -> f64 {
        match self {
            DetectionMode::Sensitive => 0.1,
            DetectionMode::Conservative => 0.2,
        }
    }
}

/// Offline analysis pipeline parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// FFT size in samples; also the slice stride (slices do not overlap)
    pub transform_size: usize,
    /// Frequency band of interest
    pub band: FrequencyBand,
    /// Hard floor for the adaptive threshold, in dB
    pub base_threshold_db: f32,
    /// Multiplier applied to the standard deviation of band means
    pub std_dev_factor: f32,
    /// Minimum unit length in seconds
    pub min_unit_duration_s: f64,
    /// Slices whose peak absolute amplitude is below this are treated as silence
    pub silence_amplitude: f32,
    /// Threads used for per-slice transforms (1 = sequential)
    pub worker_threads: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            transform_size: 2048,
            band: FrequencyBand::default(),
            base_threshold_db: -70.0,
            std_dev_factor: 2.0,
            min_unit_duration_s: DetectionMode::Sensitive.min_unit_duration_s(),
            silence_amplitude: 0.01,
            worker_threads: 1,
        }
    }
}

impl AnalysisConfig {
    /// Defaults with the minimum unit duration taken from `mode`
    pub fn for_mode(mode: DetectionMode) -> Self {
        Self {
            min_unit_duration_s: mode.min_unit_duration_s(),
            ..Self::default()
        }
    }

    /// Reject parameter combinations the pipeline cannot honor
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.transform_size == 0 || !self.transform_size.is_power_of_two() {
            return Err(AnalysisError::invalid(format!(
                "transform size must be a positive power of two (got {})",
                self.transform_size
            )));
        }
        self.band.validate()?;
        if !self.base_threshold_db.is_finite() {
            return Err(AnalysisError::invalid("base threshold must be finite"));
        }
        if !self.std_dev_factor.is_finite() || self.std_dev_factor < 0.0 {
            return Err(AnalysisError::invalid(format!(
                "std-dev factor must be finite and non-negative (got {})",
                self.std_dev_factor
            )));
        }
        if !self.min_unit_duration_s.is_finite() || self.min_unit_duration_s < 0.0 {
            return Err(AnalysisError::invalid(format!(
                "minimum unit duration must be non-negative (got {})",
                self.min_unit_duration_s
            )));
        }
        if !self.silence_amplitude.is_finite() || self.silence_amplitude < 0.0 {
            return Err(AnalysisError::invalid(
                "silence amplitude must be finite and non-negative",
            ));
        }
        if self.worker_threads == 0 {
            return Err(AnalysisError::invalid("worker_threads must be at least 1"));
        }
        Ok(())
    }
}

/// Byte-spectrum capture parameters for the live path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LiveCaptureConfig {
    /// FFT size in samples (bin count = fft_size / 2)
    pub fft_size: usize,
    /// Exponential smoothing between ticks (0 = none, <1)
    pub smoothing: f32,
    /// dB value mapped to byte 0
    pub min_db: f32,
    /// dB value mapped to byte 255
    pub max_db: f32,
}

impl Default for LiveCaptureConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl LiveCaptureConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            return Err(AnalysisError::invalid(format!(
                "live fft size must be a power of two >= 2 (got {})",
                self.fft_size
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(AnalysisError::invalid(format!(
                "smoothing must be in [0, 1) (got {})",
                self.smoothing
            )));
        }
        if !(self.min_db < self.max_db) {
            return Err(AnalysisError::invalid(format!(
                "min_db ({}) must be below max_db ({})",
                self.min_db, self.max_db
            )));
        }
        Ok(())
    }
}

/// Phrase cadence interval bounds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CadenceConfig {
    /// Interval used at full volume, seconds
    pub min_interval_s: f64,
    /// Interval used at silence, seconds
    pub max_interval_s: f64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            min_interval_s: 2.0,
            max_interval_s: 6.0,
        }
    }
}

impl CadenceConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.min_interval_s > 0.0 && self.min_interval_s <= self.max_interval_s) {
            return Err(AnalysisError::invalid(format!(
                "cadence interval bounds invalid: min {} max {}",
                self.min_interval_s, self.max_interval_s
            )));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults when the file is missing
    /// or malformed (a warning is logged in both cases)
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match Self::try_load_from_file(&path) {
            Ok(config) => {
                log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                config
            }
            Err(err) => {
                log::warn!(
                    "[Config] Failed to load config {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load and validate configuration, surfacing every failure
    pub fn try_load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let contents = fs::read_to_string(&path).map_err(|err| {
            AnalysisError::invalid(format!("cannot read {:?}: {}", path.as_ref(), err))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|err| {
            AnalysisError::invalid(format!("cannot parse {:?}: {}", path.as_ref(), err))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.analysis.validate()?;
        self.live.validate()?;
        self.cadence.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.transform_size, 2048);
        assert_eq!(config.analysis.band.min_hz, 50.0);
        assert_eq!(config.analysis.band.max_hz, 4000.0);
        assert_eq!(config.analysis.base_threshold_db, -70.0);
        assert_eq!(config.analysis.min_unit_duration_s, 0.1);
        assert_eq!(config.analysis.silence_amplitude, 0.01);
        assert_eq!(config.live.fft_size, 256);
        assert_eq!(config.cadence.min_interval_s, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "analysis": { "transform_size": 1024 } }"#).unwrap();
        assert_eq!(parsed.analysis.transform_size, 1024);
        assert_eq!(parsed.analysis.base_threshold_db, -70.0);
        assert_eq!(parsed.cadence, CadenceConfig::default());
    }

    #[test]
    fn test_conservative_mode_raises_min_duration() {
        let config = AnalysisConfig::for_mode(DetectionMode::Conservative);
        assert_eq!(config.min_unit_duration_s, 0.2);
        assert_eq!(config.transform_size, 2048);
    }

    #[test]
    fn test_rejects_non_power_of_two_transform() {
        let config = AnalysisConfig {
            transform_size: 1000,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidInput { .. })
        ));

        let config = AnalysisConfig {
            transform_size: 0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_workers_and_bad_cadence() {
        let config = AnalysisConfig {
            worker_threads: 0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());

        let cadence = CadenceConfig {
            min_interval_s: 7.0,
            max_interval_s: 6.0,
        };
        assert!(cadence.validate().is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/definitely/not/here.json");
        assert_eq!(config, AppConfig::default());
        assert!(AppConfig::try_load_from_file("/definitely/not/here.json").is_err());
    }
}
