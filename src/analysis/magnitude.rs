// Magnitude scales
//
// The offline pipeline works in decibels while the live path works on the
// 0-255 byte magnitudes produced by a capture node. The two scales have
// different ranges and consumers, so each gets its own type and there are
// deliberately no conversions between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest magnitude the offline pipeline represents (digital silence)
pub const MIN_DB: f32 = -90.0;

/// Amplitude floor passed to `log10` before flooring at [`MIN_DB`]
const MIN_LINEAR_MAGNITUDE: f32 = 1e-12;

/// Offline magnitude in decibels
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Decibels(pub f32);

impl Decibels {
    pub const FLOOR: Decibels = Decibels(MIN_DB);

    /// Convert an FFT bin magnitude to dB, floored at [`MIN_DB`]
    pub fn from_magnitude(magnitude: f32) -> Self {
        let db = 20.0 * magnitude.max(MIN_LINEAR_MAGNITUDE).log10();
        Decibels(db.max(MIN_DB))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl fmt::Display for Decibels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} dB", self.0)
    }
}

/// One live-path bin on the linear 0-255 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ByteMagnitude(pub u8);

/// Average of byte magnitudes, still on the linear 0-255 scale
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinearVolume(pub f32);

impl LinearVolume {
    pub const MAX: f32 = 255.0;

    pub fn value(self) -> f32 {
        self.0
    }

    /// Volume as a 0.0-1.0 fraction of full scale
    pub fn fraction(self) -> f32 {
        (self.0 / Self::MAX).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_magnitude() {
        assert!((Decibels::from_magnitude(1.0).value() - 0.0).abs() < 1e-6);
        assert!((Decibels::from_magnitude(10.0).value() - 20.0).abs() < 1e-5);
        assert!((Decibels::from_magnitude(256.0).value() - 48.16).abs() < 0.01);
    }

    #[test]
    fn test_zero_magnitude_hits_floor() {
        assert_eq!(Decibels::from_magnitude(0.0), Decibels::FLOOR);
        assert_eq!(Decibels::from_magnitude(1e-7), Decibels::FLOOR);
    }

    #[test]
    fn test_volume_fraction_clamped() {
        assert_eq!(LinearVolume(0.0).fraction(), 0.0);
        assert_eq!(LinearVolume(255.0).fraction(), 1.0);
        assert!((LinearVolume(127.5).fraction() - 0.5).abs() < 1e-6);
    }
}
