use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    clock::Clock, noise::NoiseSettings, BeatClock, Bpm, PerlinNoise, PhaseSettings, Result,
    TapSettings,
};

/// Top-level configuration for a sketch's rhythm track.
///
/// Every section falls back to its defaults when omitted, so `{}` is a valid
/// document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    pub bpm: Bpm,
    pub phase: PhaseSettings,
    pub tap: TapSettings,
    pub noise: NoiseSettings,
}

impl SketchConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(?path, "loading sketch config");
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.phase.validate()?;
        self.tap.validate()?;
        self.noise.validate()
    }

    /// Builds a beat clock reading time from `clock` and sampling the
    /// configured noise field.
    pub fn build_clock<C: Clock>(&self, clock: C) -> Result<BeatClock<C, PerlinNoise>> {
        let noise = PerlinNoise::from_settings(&self.noise)?;
        BeatClock::with_sources(self.bpm.get(), clock, noise)?
            .with_settings(self.phase)?
            .with_tap_settings(self.tap)
    }
}
