//! Core library for Generative Visual Music sketches.
//!
//! The crate turns a tempo into a continuously advancing beat count and
//! derives rhythm-locked values from it: eased phases that settle on an
//! integer and then leap to the next one, and noise blended along that same
//! shape. Rendering stays with the caller; the engine only produces numbers.
//!
//! ```
//! use gvm_core::{BeatClock, Easing, ManualClock, PerlinNoise};
//!
//! let clock = ManualClock::new();
//! let mut beat = BeatClock::with_sources(120.0, clock.clone(), PerlinNoise::default())?;
//!
//! clock.set(2_000.0);
//! assert_eq!(beat.count(), 4.0);
//! assert_eq!(beat.phase_with(8.0, 2.0, Easing::Linear)?, 0.0);
//! let size = beat.leap_noise(&[0.0, 1.0])?;
//! assert!((0.0..1.0).contains(&size));
//! # Ok::<(), gvm_core::GvmError>(())
//! ```

pub mod beat;
pub mod clock;
pub mod config;
pub mod easing;
pub mod error;
pub mod noise;
pub mod tap;
pub mod tempo;

pub use beat::{BeatClock, PhaseSettings};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SketchConfig;
pub use easing::{Ease, Easing};
pub use error::{GvmError, Result};
pub use noise::{lerp, NoiseSettings, NoiseSource, PerlinNoise};
pub use tap::{TapSettings, TapTempo};
pub use tempo::{Bpm, DEFAULT_BPM, MAX_BPM, MIN_BPM};
