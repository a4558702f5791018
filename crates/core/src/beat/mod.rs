//! Beat clock turning a tempo and a clock reading into beat counts, eased
//! phases and rhythm-locked noise.
//!
//! The phase of a cycle holds at an integer for most of the cycle and eases
//! into the next integer during the final `ease_duration` beats. The same
//! shape drives [`BeatClock::leap_noise_with`], which settles on one noise
//! sample and then leaps to the next one.

use serde::{Deserialize, Serialize};

use crate::{
    clock::{Clock, SystemClock},
    easing::{Ease, Easing},
    noise::{lerp, NoiseSource, PerlinNoise},
    tap::{TapSettings, TapTempo},
    Bpm, GvmError, Result,
};

pub const DEFAULT_CYCLE_LENGTH: f64 = 8.0;
pub const DEFAULT_EASE_DURATION: f64 = 2.0;

/// Cycle parameters used by [`BeatClock::phase`] and [`BeatClock::leap_noise`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseSettings {
    /// Length of one cycle in beats.
    pub cycle_length: f64,
    /// Length of the ease window at the end of each cycle, in beats.
    pub ease_duration: f64,
    pub easing: Easing,
}

impl Default for PhaseSettings {
    fn default() -> Self {
        Self {
            cycle_length: DEFAULT_CYCLE_LENGTH,
            ease_duration: DEFAULT_EASE_DURATION,
            easing: Easing::InOutSine,
        }
    }
}

impl PhaseSettings {
    pub fn validate(&self) -> Result<()> {
        validate_cycle(self.cycle_length, self.ease_duration)
    }
}

/// Beat count memoised for a single clock reading.
#[derive(Debug, Clone, Copy)]
struct CountCache {
    time_ms: f64,
    count: f64,
}

/// Stateful tempo tracker. One instance per independent rhythm.
///
/// Not internally synchronised: share it across threads only behind a lock.
#[derive(Debug)]
pub struct BeatClock<C = SystemClock, N = PerlinNoise> {
    bpm: Bpm,
    clock: C,
    noise: N,
    settings: PhaseSettings,
    last_count: Option<CountCache>,
    taps: TapTempo,
}

impl BeatClock<SystemClock, PerlinNoise> {
    /// Creates a beat clock driven by the wall clock and the default noise
    /// field.
    pub fn new(bpm: f64) -> Result<Self> {
        Self::with_sources(bpm, SystemClock::start(), PerlinNoise::default())
    }
}

impl<C: Clock, N: NoiseSource> BeatClock<C, N> {
    pub fn with_sources(bpm: f64, clock: C, noise: N) -> Result<Self> {
        Ok(Self {
            bpm: Bpm::new(bpm)?,
            clock,
            noise,
            settings: PhaseSettings::default(),
            last_count: None,
            taps: TapTempo::default(),
        })
    }

    /// Replaces the cycle parameters used by [`phase`](Self::phase) and
    /// [`leap_noise`](Self::leap_noise).
    pub fn with_settings(mut self, settings: PhaseSettings) -> Result<Self> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    pub fn with_tap_settings(mut self, settings: TapSettings) -> Result<Self> {
        self.taps = TapTempo::new(settings)?;
        Ok(self)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm.get()
    }

    /// Replaces the tempo. The cached count and tap history are kept.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<()> {
        self.bpm = Bpm::new(bpm)?;
        tracing::debug!(bpm, "tempo set");
        Ok(())
    }

    pub fn settings(&self) -> &PhaseSettings {
        &self.settings
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn noise_source(&self) -> &N {
        &self.noise
    }

    pub fn tap_history(&self) -> &TapTempo {
        &self.taps
    }

    /// Fractional number of beats elapsed at the current clock reading.
    ///
    /// Repeated calls at the same reading return the cached value.
    pub fn count(&mut self) -> f64 {
        let now = self.clock.now_ms();

        if let Some(cache) = self.last_count {
            if cache.time_ms == now {
                return cache.count;
            }
        }

        let count = now / self.bpm.beat_interval_ms();
        tracing::trace!(now, count, "beat count recomputed");
        self.last_count = Some(CountCache { time_ms: now, count });
        count
    }

    /// Eased phase using the configured [`PhaseSettings`].
    pub fn phase(&mut self) -> f64 {
        let settings = self.settings;
        let count = self.count();
        let (base, progress) = cycle_point(count, settings.cycle_length, settings.ease_duration);
        base + settings.easing.ease(progress)
    }

    /// Integer cycle index plus the eased progress through the ease window.
    ///
    /// Fails when `cycle_length <= 0` or `ease_duration` is outside
    /// `(0, cycle_length]`.
    pub fn phase_with<E: Ease>(
        &mut self,
        cycle_length: f64,
        ease_duration: f64,
        ease: E,
    ) -> Result<f64> {
        validate_cycle(cycle_length, ease_duration)?;

        let count = self.count();
        let (base, progress) = cycle_point(count, cycle_length, ease_duration);
        Ok(base + ease.ease(progress))
    }

    /// Leap noise using the configured [`PhaseSettings`].
    pub fn leap_noise(&mut self, seed: &[f64]) -> Result<f64> {
        let settings = self.settings;
        self.leap_noise_with(
            settings.cycle_length,
            settings.ease_duration,
            seed,
            settings.easing,
        )
    }

    /// Noise blended from the sample at the current cycle index towards the
    /// sample at the next one, weighted by the eased phase.
    ///
    /// `seed` supplies the two remaining noise coordinates and must hold
    /// exactly two finite values.
    pub fn leap_noise_with<E: Ease>(
        &mut self,
        cycle_length: f64,
        ease_duration: f64,
        seed: &[f64],
        ease: E,
    ) -> Result<f64> {
        let [sx, sy] = validate_seed(seed)?;
        validate_cycle(cycle_length, ease_duration)?;

        let count = self.count();
        let (current, progress) = cycle_point(count, cycle_length, ease_duration);
        let weight = fract(current + ease.ease(progress));

        let current_noise = self.noise.noise(current, sx, sy);
        let next_noise = self.noise.noise(current + 1.0, sx, sy);

        Ok(lerp(current_noise, next_noise, weight))
    }

    /// Registers a tap at the current clock reading.
    ///
    /// Once enough recent taps are held the tempo is replaced by their
    /// average and returned. A tap that would produce an invalid tempo leaves
    /// both tempo and history unchanged.
    pub fn tap_tempo(&mut self) -> Result<Option<Bpm>> {
        let now = self.clock.now_ms();
        let estimate = self.taps.tap(now)?;

        if let Some(bpm) = estimate {
            self.bpm = bpm;
            tracing::debug!(bpm = bpm.get(), taps = self.taps.len(), "tap tempo updated");
        }

        Ok(estimate)
    }
}

fn validate_cycle(cycle_length: f64, ease_duration: f64) -> Result<()> {
    if !(cycle_length.is_finite() && cycle_length > 0.0) {
        return Err(GvmError::validation(format!(
            "cycle length must be positive, got {cycle_length}"
        )));
    }
    if !(ease_duration > 0.0 && ease_duration <= cycle_length) {
        return Err(GvmError::validation(format!(
            "ease duration must be in (0, {cycle_length}], got {ease_duration}"
        )));
    }
    Ok(())
}

fn validate_seed(seed: &[f64]) -> Result<[f64; 2]> {
    match *seed {
        [x, y] if x.is_finite() && y.is_finite() => Ok([x, y]),
        [_, _] => Err(GvmError::validation("seed components must be finite numbers")),
        _ => Err(GvmError::validation(format!(
            "seed must hold exactly two numbers, got {}",
            seed.len()
        ))),
    }
}

/// Splits a beat count into the integer cycle index and the linear progress
/// through the ease window at the end of the cycle.
///
/// The position is derived from the same `base` so both halves agree near a
/// boundary. A progress that rounds up to 1 carries into the next cycle.
fn cycle_point(count: f64, cycle_length: f64, ease_duration: f64) -> (f64, f64) {
    let mut base = (count / cycle_length).floor();
    let mut position = count - base * cycle_length;
    if position >= cycle_length {
        position -= cycle_length;
        base += 1.0;
    } else if position < 0.0 {
        position += cycle_length;
        base -= 1.0;
    }

    let ease_start = cycle_length - ease_duration;
    let progress = (ease_start.max(position) - ease_start) / ease_duration;
    if progress >= 1.0 {
        (base + 1.0, 0.0)
    } else {
        (base, fract(progress))
    }
}

fn fract(x: f64) -> f64 {
    x - x.floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn flat_noise(x: f64, _: f64, _: f64) -> f64 {
        x * 10.0
    }

    type NoiseFn = fn(f64, f64, f64) -> f64;

    fn build(bpm: f64) -> (BeatClock<ManualClock, NoiseFn>, ManualClock) {
        let clock = ManualClock::new();
        let beat = BeatClock::with_sources(bpm, clock.clone(), flat_noise as NoiseFn).unwrap();
        (beat, clock)
    }

    /// Readings a few ulps either side of `ms`, ascending.
    fn around(ms: f64) -> [f64; 5] {
        let bits = ms.to_bits();
        [
            f64::from_bits(bits - 3),
            f64::from_bits(bits - 1),
            ms,
            f64::from_bits(bits + 1),
            f64::from_bits(bits + 3),
        ]
    }

    fn identity(x: f64) -> f64 {
        x
    }

    #[test]
    fn set_bpm_round_trips_exactly() {
        let (mut beat, _) = build(100.0);
        for bpm in [0.5, 60.0, 120.0, 174.25, 1000.0] {
            beat.set_bpm(bpm).unwrap();
            assert_eq!(beat.bpm(), bpm);
        }
    }

    #[test]
    fn rejects_invalid_bpm_without_mutating() {
        let (mut beat, _) = build(100.0);
        for bpm in [0.0, -10.0, 1000.5, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(beat.set_bpm(bpm).unwrap_err().is_validation());
            assert_eq!(beat.bpm(), 100.0);
        }
        assert!(BeatClock::with_sources(0.0, ManualClock::new(), flat_noise).is_err());
    }

    #[test]
    fn count_is_cached_within_a_tick() {
        let (mut beat, clock) = build(120.0);
        clock.set(1234.5);
        let first = beat.count();
        let second = beat.count();
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn count_tracks_the_clock() {
        let (mut beat, clock) = build(120.0);
        clock.set(1500.0);
        assert_eq!(beat.count(), 3.0);

        let mut previous = beat.count();
        for _ in 0..50 {
            clock.advance(37.0);
            let count = beat.count();
            assert!(count >= previous);
            previous = count;
        }
    }

    #[test]
    fn set_bpm_keeps_the_cached_count_for_the_same_tick() {
        let (mut beat, clock) = build(60.0);
        clock.set(2000.0);
        assert_eq!(beat.count(), 2.0);

        beat.set_bpm(120.0).unwrap();
        assert_eq!(beat.count(), 2.0);

        clock.advance(1.0);
        assert!(beat.count() > 4.0);
    }

    #[test]
    fn phase_holds_then_leaps() {
        let (mut beat, clock) = build(60.0);

        clock.set(3000.0);
        assert_eq!(beat.phase_with(8.0, 2.0, identity).unwrap(), 0.0);

        clock.set(6000.0);
        assert_eq!(beat.phase_with(8.0, 2.0, identity).unwrap(), 0.0);

        clock.set(7000.0);
        assert_eq!(beat.phase_with(8.0, 2.0, identity).unwrap(), 0.5);

        clock.set(8000.0);
        assert_eq!(beat.phase_with(8.0, 2.0, identity).unwrap(), 1.0);

        clock.set(23_000.0);
        assert_eq!(beat.phase_with(8.0, 2.0, identity).unwrap(), 2.5);
    }

    #[test]
    fn default_phase_uses_configured_easing() {
        let (beat, clock) = build(60.0);
        let mut beat = beat
            .with_settings(PhaseSettings {
                cycle_length: 4.0,
                ease_duration: 1.0,
                easing: Easing::InQuad,
            })
            .unwrap();

        clock.set(3500.0);
        assert_eq!(beat.phase(), 0.25);
    }

    #[test]
    fn phase_does_not_spike_before_fractional_boundaries() {
        let (mut beat, clock) = build(60.0);

        clock.set(5699.0);
        let before = beat.phase_with(0.3, 0.1, identity).unwrap();
        clock.set(5699.999999999999);
        let edge = beat.phase_with(0.3, 0.1, identity).unwrap();
        let edge_noise = beat.leap_noise_with(0.3, 0.1, &[0.0, 0.0], identity).unwrap();
        clock.set(5700.0);
        let after = beat.phase_with(0.3, 0.1, identity).unwrap();

        assert!(before <= edge && edge <= after, "{before} {edge} {after}");
        assert!(edge <= 19.0);
        assert!((180.0..=190.0).contains(&edge_noise), "{edge_noise}");
    }

    #[test]
    fn phase_is_non_decreasing_across_boundaries() {
        for cycle in [0.3, 0.7, 1.1, 2.9, 8.0] {
            let ease = cycle / 3.0;
            let (mut beat, clock) = build(60.0);
            let mut previous = f64::NEG_INFINITY;

            for k in 1..400 {
                for ms in around(k as f64 * cycle * 1000.0) {
                    clock.set(ms);
                    let phase = beat.phase_with(cycle, ease, identity).unwrap();
                    assert!(
                        phase >= previous - 1e-9,
                        "cycle {cycle}: {phase} after {previous} at {ms}"
                    );
                    assert!(phase <= k as f64 + 1e-9, "cycle {cycle}: {phase} at {ms}");
                    previous = phase;
                }
            }
        }
    }

    #[test]
    fn phase_rejects_bad_cycles() {
        let (mut beat, _) = build(60.0);
        for (cycle, ease) in [
            (0.0, 1.0),
            (-8.0, 2.0),
            (8.0, 0.0),
            (8.0, -1.0),
            (8.0, 9.0),
            (f64::NAN, 1.0),
            (f64::INFINITY, 1.0),
        ] {
            let err = beat.phase_with(cycle, ease, Easing::Linear).unwrap_err();
            assert!(err.is_validation(), "({cycle}, {ease})");
        }
        assert!(beat.phase_with(8.0, 8.0, Easing::Linear).is_ok());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let (beat, _) = build(60.0);
        let result = beat.with_settings(PhaseSettings {
            cycle_length: 2.0,
            ease_duration: 3.0,
            easing: Easing::Linear,
        });
        assert!(result.is_err());
    }

    #[test]
    fn leap_noise_lands_on_current_sample_at_boundaries() {
        let (mut beat, clock) = build(60.0);

        clock.set(8000.0);
        assert_eq!(beat.leap_noise_with(8.0, 2.0, &[0.0, 0.0], identity).unwrap(), 10.0);

        clock.set(16_000.0);
        assert_eq!(beat.leap_noise(&[3.0, 4.0]).unwrap(), 20.0);
    }

    #[test]
    fn leap_noise_blends_towards_next_sample() {
        let (mut beat, clock) = build(60.0);

        clock.set(4000.0);
        assert_eq!(beat.leap_noise_with(8.0, 2.0, &[0.0, 0.0], identity).unwrap(), 0.0);

        clock.set(7000.0);
        assert_eq!(beat.leap_noise_with(8.0, 2.0, &[0.0, 0.0], identity).unwrap(), 5.0);

        clock.set(7500.0);
        assert_eq!(beat.leap_noise_with(8.0, 2.0, &[0.0, 0.0], identity).unwrap(), 7.5);
    }

    #[test]
    fn leap_noise_passes_seed_to_noise() {
        let clock = ManualClock::at(0.0);
        let mut beat =
            BeatClock::with_sources(60.0, clock, |x: f64, y: f64, z: f64| x + 100.0 * y + z)
                .unwrap();
        assert_eq!(beat.leap_noise(&[2.0, 5.0]).unwrap(), 205.0);
    }

    #[test]
    fn leap_noise_with_perlin_is_continuous_over_a_cycle() {
        let clock = ManualClock::new();
        let mut beat =
            BeatClock::with_sources(120.0, clock.clone(), PerlinNoise::new(11)).unwrap();

        let mut previous = beat.leap_noise(&[1.0, 2.0]).unwrap();
        for _ in 0..2000 {
            clock.advance(5.0);
            let value = beat.leap_noise(&[1.0, 2.0]).unwrap();
            assert!((value - previous).abs() < 0.05);
            previous = value;
        }
    }

    #[test]
    fn leap_noise_rejects_malformed_seeds() {
        let (mut beat, clock) = build(60.0);
        clock.set(1000.0);

        for seed in [&[][..], &[1.0][..], &[1.0, 2.0, 3.0][..], &[f64::NAN, 0.0][..]] {
            let err = beat.leap_noise(seed).unwrap_err();
            assert!(err.is_validation(), "{seed:?}");
        }

        let err = beat
            .leap_noise_with(0.0, 1.0, &[0.0, 0.0], Easing::Linear)
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn tap_tempo_sets_bpm_after_five_taps() {
        let (mut beat, clock) = build(100.0);

        for i in 0..4 {
            clock.set(1000.0 + i as f64 * 500.0);
            assert!(beat.tap_tempo().unwrap().is_none());
            assert_eq!(beat.bpm(), 100.0);
        }

        clock.set(3000.0);
        let bpm = beat.tap_tempo().unwrap().unwrap();
        assert_eq!(bpm.get(), 120.0);
        assert_eq!(beat.bpm(), 120.0);
    }

    #[test]
    fn tap_after_long_pause_restarts_the_window() {
        let (mut beat, clock) = build(100.0);

        for i in 0..4 {
            clock.set(i as f64 * 500.0);
            beat.tap_tempo().unwrap();
        }

        clock.set(60_000.0);
        assert!(beat.tap_tempo().unwrap().is_none());
        assert_eq!(beat.tap_history().len(), 1);
        assert_eq!(beat.bpm(), 100.0);

        for i in 1..5 {
            clock.set(60_000.0 + i as f64 * 250.0);
            beat.tap_tempo().unwrap();
        }
        assert_eq!(beat.bpm(), 240.0);
    }

    #[test]
    fn degenerate_taps_leave_bpm_unchanged() {
        let (mut beat, clock) = build(100.0);
        clock.set(500.0);
        for _ in 0..4 {
            beat.tap_tempo().unwrap();
        }
        assert!(beat.tap_tempo().unwrap_err().is_validation());
        assert_eq!(beat.bpm(), 100.0);
    }
}
