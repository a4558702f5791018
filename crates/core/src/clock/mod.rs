use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

/// Monotonic time source read once per query by the beat engine.
///
/// Readings are in milliseconds and must never decrease, except across an
/// explicit jump such as [`ManualClock::set`].
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock measuring the milliseconds elapsed since it was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Externally driven clock. Clones share the same reading, so a caller can
/// keep a handle and step time while a [`BeatClock`](crate::BeatClock) owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(ms: f64) -> Self {
        let clock = Self::new();
        clock.set(ms);
        clock
    }

    /// Jumps the reading to `ms`, which may lie before the current reading.
    /// Use [`advance`](Self::advance) to keep time non-decreasing. Negative
    /// and non-finite values are clamped to zero.
    pub fn set(&self, ms: f64) {
        let ms = if ms.is_finite() { ms.max(0.0) } else { 0.0 };
        self.millis.store(ms.to_bits(), Ordering::Release);
    }

    /// Advances the reading by `delta_ms`; the clock never moves backwards.
    pub fn advance(&self, delta_ms: f64) {
        let delta = if delta_ms.is_finite() { delta_ms.max(0.0) } else { 0.0 };
        self.set(self.now_ms() + delta);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.millis.load(Ordering::Acquire))
    }
}
