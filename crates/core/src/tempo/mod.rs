use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{GvmError, Result};

/// Exclusive lower bound for a tempo.
pub const MIN_BPM: f64 = 0.0;
/// Inclusive upper bound for a tempo.
pub const MAX_BPM: f64 = 1000.0;
/// Tempo used when nothing else is configured.
pub const DEFAULT_BPM: f64 = 100.0;

/// Validated tempo in beats per minute.
///
/// The value is always finite and lies in `(MIN_BPM, MAX_BPM]`. Every path
/// that produces a `Bpm` (constructors, tap tempo, deserialisation) goes
/// through [`Bpm::new`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Bpm(f64);

impl Bpm {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= MIN_BPM || value > MAX_BPM {
            return Err(GvmError::validation(format!(
                "BPM must be a finite number in ({MIN_BPM}, {MAX_BPM}], got {value}"
            )));
        }

        Ok(Self(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// Duration of a single beat in milliseconds.
    pub fn beat_interval_ms(self) -> f64 {
        (60.0 / self.0) * 1000.0
    }
}

impl Default for Bpm {
    fn default() -> Self {
        Self(DEFAULT_BPM)
    }
}

impl TryFrom<f64> for Bpm {
    type Error = GvmError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Bpm> for f64 {
    fn from(value: Bpm) -> Self {
        value.0
    }
}

impl fmt::Display for Bpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_values_inside_range() {
        for value in [0.001, 1.0, 60.0, 120.0, 999.999, MAX_BPM] {
            assert_eq!(Bpm::new(value).unwrap().get(), value);
        }
    }

    #[test]
    fn rejects_values_outside_range() {
        for value in [
            0.0,
            -1.0,
            1000.0001,
            f64::NAN,
            f64::INFINITY,
            f64::NEG_INFINITY,
        ] {
            let err = Bpm::new(value).unwrap_err();
            assert!(err.is_validation(), "{value} should be rejected");
        }
    }

    #[test]
    fn computes_beat_interval() {
        assert_eq!(Bpm::new(120.0).unwrap().beat_interval_ms(), 500.0);
        assert_eq!(Bpm::new(60.0).unwrap().beat_interval_ms(), 1000.0);
    }

    #[test]
    fn deserialisation_revalidates() {
        let bpm: Bpm = serde_json::from_str("128").unwrap();
        assert_eq!(bpm.get(), 128.0);
        assert!(serde_json::from_str::<Bpm>("0").is_err());
        assert!(serde_json::from_str::<Bpm>("4000").is_err());
    }
}
