use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{Bpm, GvmError, Result};

pub const DEFAULT_RECORD_INTERVAL: usize = 5;
pub const DEFAULT_MAX_TIME_DIFF_MS: f64 = 50_000.0;
pub const DEFAULT_TAP_CAPACITY: usize = 32;

/// Tuning for the tap-tempo window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapSettings {
    /// Number of most recent taps averaged into a tempo. At least two.
    pub record_interval: usize,
    /// Taps older than this (relative to the newest tap) are evicted.
    pub max_time_diff_ms: f64,
    /// Hard bound on retained taps.
    pub capacity: usize,
}

impl Default for TapSettings {
    fn default() -> Self {
        Self {
            record_interval: DEFAULT_RECORD_INTERVAL,
            max_time_diff_ms: DEFAULT_MAX_TIME_DIFF_MS,
            capacity: DEFAULT_TAP_CAPACITY,
        }
    }
}

impl TapSettings {
    pub fn validate(&self) -> Result<()> {
        if self.record_interval < 2 {
            return Err(GvmError::validation(
                "tap record interval must cover at least two taps",
            ));
        }
        if !(self.max_time_diff_ms.is_finite() && self.max_time_diff_ms > 0.0) {
            return Err(GvmError::validation(format!(
                "tap window must be a positive number of milliseconds, got {}",
                self.max_time_diff_ms
            )));
        }
        if self.capacity < self.record_interval {
            return Err(GvmError::validation(format!(
                "tap capacity {} is smaller than the record interval {}",
                self.capacity, self.record_interval
            )));
        }
        Ok(())
    }
}

/// Sliding window of tap timestamps that turns regular taps into a tempo.
#[derive(Debug, Clone)]
pub struct TapTempo {
    settings: TapSettings,
    timestamps: VecDeque<f64>,
}

impl Default for TapTempo {
    fn default() -> Self {
        Self {
            settings: TapSettings::default(),
            timestamps: VecDeque::with_capacity(DEFAULT_TAP_CAPACITY),
        }
    }
}

impl TapTempo {
    pub fn new(settings: TapSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            timestamps: VecDeque::with_capacity(settings.capacity),
        })
    }

    pub fn settings(&self) -> &TapSettings {
        &self.settings
    }

    /// Retained timestamps, oldest first.
    pub fn timestamps(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.timestamps.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn reset(&mut self) {
        self.timestamps.clear();
    }

    /// Records a tap at `now_ms`.
    ///
    /// Returns the new tempo once enough taps are retained, `None` while the
    /// window is still filling. If the estimate is not a valid tempo (taps at
    /// the same instant, for instance) the error is returned and the history
    /// is left untouched.
    pub fn tap(&mut self, now_ms: f64) -> Result<Option<Bpm>> {
        let mut candidate = self.timestamps.clone();
        candidate.push_back(now_ms);

        let oldest_allowed = now_ms - self.settings.max_time_diff_ms;
        while candidate.front().is_some_and(|&t| t < oldest_allowed) {
            candidate.pop_front();
        }
        while candidate.len() > self.settings.capacity {
            candidate.pop_front();
        }

        let estimate = match average_interval(&candidate, self.settings.record_interval) {
            Some(interval) => Some(Bpm::new(60_000.0 / interval)?),
            None => None,
        };

        self.timestamps = candidate;
        Ok(estimate)
    }
}

/// Mean gap between the most recent `record_interval` timestamps.
fn average_interval(timestamps: &VecDeque<f64>, record_interval: usize) -> Option<f64> {
    if timestamps.len() < record_interval {
        return None;
    }

    let recent: Vec<f64> = timestamps
        .iter()
        .skip(timestamps.len() - record_interval)
        .copied()
        .collect();

    let sum: f64 = recent.windows(2).map(|pair| pair[1] - pair[0]).sum();
    Some(sum / (record_interval - 1) as f64)
}
