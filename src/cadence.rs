//! Cadence - when the phrase collaborator should speak
//!
//! Two scheduling regimes share one entry point, [`CadenceScheduler::poll`]:
//! - Unit-synchronized: once an analysis has produced units, one cue fires
//!   per unit start, in time order, as playback passes it.
//! - Live fallback: with no units, cues fire on a volume-dependent interval
//!   `max - (max - min) * clamp(volume / 255)`, so louder passages are
//!   described more often.
//!
//! The scheduler only reads playback time; it never owns a clock, which
//! keeps it deterministic under test.

use serde::{Deserialize, Serialize};

use crate::analysis::live::LiveFrame;
use crate::analysis::magnitude::LinearVolume;
use crate::analysis::AnalysisResult;
use crate::config::CadenceConfig;
use crate::error::AnalysisError;

/// What triggered a cue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CueSource {
    /// Start of the unit at `index` in the analysis result
    Unit { index: usize },
    /// Volume-paced fallback
    Live,
}

/// A request to emit one phrase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Playback time the cue belongs to, seconds
    pub time: f64,
    pub source: CueSource,
    /// Live frame observed when the cue fired
    pub frame: LiveFrame,
}

pub struct CadenceScheduler {
    config: CadenceConfig,
    unit_starts: Vec<f64>,
    next_unit: usize,
    last_live_cue: f64,
}

impl CadenceScheduler {
    pub fn new(config: CadenceConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            config,
            unit_starts: Vec::new(),
            next_unit: 0,
            last_live_cue: 0.0,
        })
    }

    /// Scheduler already synchronized to `result`
    pub fn with_units(config: CadenceConfig, result: &AnalysisResult) -> Result<Self, AnalysisError> {
        let mut scheduler = Self::new(config)?;
        scheduler.set_units(result);
        Ok(scheduler)
    }

    /// Switch to unit-synchronized cues for `result`
    ///
    /// A result without units drops back to live fallback. The cursor is
    /// restarted from the beginning of the recording.
    pub fn set_units(&mut self, result: &AnalysisResult) {
        self.unit_starts = result.units.iter().map(|unit| unit.start_time).collect();
        self.next_unit = 0;
        tracing::debug!(
            "[Cadence] Synchronized to {} unit start(s)",
            self.unit_starts.len()
        );
    }

    pub fn is_unit_synchronized(&self) -> bool {
        !self.unit_starts.is_empty()
    }

    /// Fallback interval for the given live volume, seconds
    pub fn live_interval(&self, volume: LinearVolume) -> f64 {
        let span = self.config.max_interval_s - self.config.min_interval_s;
        self.config.max_interval_s - span * volume.fraction() as f64
    }

    /// Reposition after a seek; unit starts before `time` are skipped
    pub fn seek(&mut self, time: f64) {
        self.next_unit = self.unit_starts.partition_point(|&start| start < time);
        self.last_live_cue = time;
    }

    /// Next due cue at playback `time`, if any
    ///
    /// Call repeatedly until `None` to drain every unit start passed since
    /// the previous tick. Live fallback yields at most one cue per time value.
    pub fn poll(&mut self, time: f64, frame: LiveFrame) -> Option<Cue> {
        if self.is_unit_synchronized() {
            let start = *self.unit_starts.get(self.next_unit)?;
            if start > time {
                return None;
            }
            let index = self.next_unit;
            self.next_unit += 1;
            return Some(Cue {
                time: start,
                source: CueSource::Unit { index },
                frame,
            });
        }

        if time - self.last_live_cue >= self.live_interval(frame.average_volume) {
            self.last_live_cue = time;
            return Some(Cue {
                time,
                source: CueSource::Live,
                frame,
            });
        }
        None
    }
}
