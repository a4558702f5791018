use std::{f64::consts::PI, fmt};

use serde::{Deserialize, Serialize};

use crate::{GvmError, Result};

const PERLIN_YWRAPB: u32 = 4;
const PERLIN_YWRAP: i64 = 1 << PERLIN_YWRAPB;
const PERLIN_ZWRAPB: u32 = 8;
const PERLIN_ZWRAP: i64 = 1 << PERLIN_ZWRAPB;
const PERLIN_SIZE: i64 = 4095;

const DEFAULT_OCTAVES: u32 = 4;
const DEFAULT_FALLOFF: f64 = 0.5;

/// Deterministic three-input noise function. Identical inputs must produce
/// identical outputs, and the output should vary continuously.
pub trait NoiseSource {
    fn noise(&self, x: f64, y: f64, z: f64) -> f64;
}

impl<F> NoiseSource for F
where
    F: Fn(f64, f64, f64) -> f64,
{
    fn noise(&self, x: f64, y: f64, z: f64) -> f64 {
        self(x, y, z)
    }
}

/// Linear interpolation between `a` and `b`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Parameters used to build a [`PerlinNoise`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub seed: u32,
    pub octaves: u32,
    pub falloff: f64,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: DEFAULT_OCTAVES,
            falloff: DEFAULT_FALLOFF,
        }
    }
}

impl NoiseSettings {
    pub fn validate(&self) -> Result<()> {
        if self.octaves == 0 {
            return Err(GvmError::validation("noise octaves must be at least 1"));
        }
        if !(self.falloff > 0.0 && self.falloff <= 1.0) {
            return Err(GvmError::validation(format!(
                "noise falloff must be in (0, 1], got {}",
                self.falloff
            )));
        }

        let total = self.total_amplitude();
        if total > 1.0 {
            return Err(GvmError::validation(format!(
                "{} octaves with falloff {} sum to amplitude {total}, which exceeds 1",
                self.octaves, self.falloff
            )));
        }
        Ok(())
    }

    /// Sum of the per-octave amplitudes, `0.5 * falloff^i`. Stops early once
    /// the sum passes 1 or the terms underflow.
    fn total_amplitude(&self) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 0.5;
        for _ in 0..self.octaves {
            total += amplitude;
            amplitude *= self.falloff;
            if total > 1.0 || amplitude == 0.0 {
                break;
            }
        }
        total
    }
}

/// Seedable lattice noise in the style of the classic creative-coding
/// `noise()` helper: a 4096-entry table of random values, cosine-smoothed
/// trilinear interpolation and a sum of octaves with decaying amplitude.
///
/// Every lattice value lies in `[0, 1)` and the octave amplitudes are
/// validated to sum to at most 1, so output lies in `[0, 1)`. Negative
/// coordinates are mirrored.
#[derive(Clone)]
pub struct PerlinNoise {
    table: Box<[f64]>,
    seed: u32,
    octaves: u32,
    falloff: f64,
}

impl PerlinNoise {
    pub fn new(seed: u32) -> Self {
        let mut lcg = Lcg::new(seed);
        let table = (0..=PERLIN_SIZE).map(|_| lcg.next_f64()).collect();

        Self {
            table,
            seed,
            octaves: DEFAULT_OCTAVES,
            falloff: DEFAULT_FALLOFF,
        }
    }

    pub fn from_settings(settings: &NoiseSettings) -> Result<Self> {
        Self::new(settings.seed).with_detail(settings.octaves, settings.falloff)
    }

    /// Adjusts the number of octaves and the per-octave amplitude falloff.
    pub fn with_detail(mut self, octaves: u32, falloff: f64) -> Result<Self> {
        NoiseSettings {
            seed: self.seed,
            octaves,
            falloff,
        }
        .validate()?;

        self.octaves = octaves;
        self.falloff = falloff;
        Ok(self)
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn octaves(&self) -> u32 {
        self.octaves
    }

    pub fn falloff(&self) -> f64 {
        self.falloff
    }

    fn lattice(&self, offset: i64) -> f64 {
        self.table[(offset & PERLIN_SIZE) as usize]
    }
}

impl Default for PerlinNoise {
    fn default() -> Self {
        Self::new(0)
    }
}

impl NoiseSource for PerlinNoise {
    fn noise(&self, x: f64, y: f64, z: f64) -> f64 {
        let (x, y, z) = (x.abs(), y.abs(), z.abs());

        let mut xi = x.floor() as i64;
        let mut yi = y.floor() as i64;
        let mut zi = z.floor() as i64;
        let mut xf = x - xi as f64;
        let mut yf = y - yi as f64;
        let mut zf = z - zi as f64;

        let mut result = 0.0;
        let mut amplitude = 0.5;

        for _ in 0..self.octaves {
            let mut offset = xi
                .wrapping_add(yi.wrapping_shl(PERLIN_YWRAPB))
                .wrapping_add(zi.wrapping_shl(PERLIN_ZWRAPB));

            let rxf = scaled_cosine(xf);
            let ryf = scaled_cosine(yf);

            let mut n1 = self.lattice(offset);
            n1 += rxf * (self.lattice(offset.wrapping_add(1)) - n1);
            let mut n2 = self.lattice(offset.wrapping_add(PERLIN_YWRAP));
            n2 += rxf * (self.lattice(offset.wrapping_add(PERLIN_YWRAP + 1)) - n2);
            n1 += ryf * (n2 - n1);

            offset = offset.wrapping_add(PERLIN_ZWRAP);
            n2 = self.lattice(offset);
            n2 += rxf * (self.lattice(offset.wrapping_add(1)) - n2);
            let mut n3 = self.lattice(offset.wrapping_add(PERLIN_YWRAP));
            n3 += rxf * (self.lattice(offset.wrapping_add(PERLIN_YWRAP + 1)) - n3);
            n2 += ryf * (n3 - n2);

            n1 += scaled_cosine(zf) * (n2 - n1);

            result += n1 * amplitude;
            amplitude *= self.falloff;

            (xi, xf) = next_octave(xi, xf);
            (yi, yf) = next_octave(yi, yf);
            (zi, zf) = next_octave(zi, zf);
        }

        result
    }
}

impl fmt::Debug for PerlinNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerlinNoise")
            .field("seed", &self.seed)
            .field("octaves", &self.octaves)
            .field("falloff", &self.falloff)
            .finish()
    }
}

fn scaled_cosine(i: f64) -> f64 {
    0.5 * (1.0 - (i * PI).cos())
}

fn next_octave(integer: i64, fraction: f64) -> (i64, f64) {
    let integer = integer.wrapping_shl(1);
    let fraction = fraction * 2.0;
    if fraction >= 1.0 {
        (integer.wrapping_add(1), fraction - 1.0)
    } else {
        (integer, fraction)
    }
}

/// 32-bit linear congruential generator used to fill the lattice table.
#[derive(Debug, Clone, Copy)]
struct Lcg {
    state: u32,
}

impl Lcg {
    const A: u32 = 1_664_525;
    const C: u32 = 1_013_904_223;
    const M: f64 = 4_294_967_296.0;

    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_mul(Self::A).wrapping_add(Self::C);
        f64::from(self.state) / Self::M
    }
}
