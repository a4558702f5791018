//! Catalogue of easing curves mapping normalised progress in `[0, 1]` to an
//! eased output.
//!
//! Inputs outside `[0, 1]` are evaluated as-is; nothing is clamped. The back
//! family overshoots `[0, 1]` between the endpoints.

use std::{f64::consts::PI, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{GvmError, Result};

const C1: f64 = 1.70158;
const C2: f64 = C1 * 1.525;
const C3: f64 = C1 + 1.0;

/// Strategy used to shape the progress inside an ease window.
///
/// Implemented by [`Easing`] and by any `Fn(f64) -> f64`, so callers can plug
/// in their own curve.
pub trait Ease {
    fn ease(&self, x: f64) -> f64;
}

impl<F> Ease for F
where
    F: Fn(f64) -> f64,
{
    fn ease(&self, x: f64) -> f64 {
        self(x)
    }
}

impl Ease for Easing {
    fn ease(&self, x: f64) -> f64 {
        self.apply(x)
    }
}

/// Named easing curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    InSine,
    OutSine,
    #[default]
    InOutSine,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    InQuint,
    OutQuint,
    InOutQuint,
    InExpo,
    OutExpo,
    InOutExpo,
    InCirc,
    OutCirc,
    InOutCirc,
    InBack,
    OutBack,
    InOutBack,
}

impl Easing {
    pub const ALL: [Easing; 25] = [
        Easing::Linear,
        Easing::InSine,
        Easing::OutSine,
        Easing::InOutSine,
        Easing::InQuad,
        Easing::OutQuad,
        Easing::InOutQuad,
        Easing::InCubic,
        Easing::OutCubic,
        Easing::InOutCubic,
        Easing::InQuart,
        Easing::OutQuart,
        Easing::InOutQuart,
        Easing::InQuint,
        Easing::OutQuint,
        Easing::InOutQuint,
        Easing::InExpo,
        Easing::OutExpo,
        Easing::InOutExpo,
        Easing::InCirc,
        Easing::OutCirc,
        Easing::InOutCirc,
        Easing::InBack,
        Easing::OutBack,
        Easing::InOutBack,
    ];

    /// Evaluates the curve at `x`.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Easing::Linear => x,
            Easing::InSine => 1.0 - ((x * PI) / 2.0).cos(),
            Easing::OutSine => ((x * PI) / 2.0).sin(),
            Easing::InOutSine => -((PI * x).cos() - 1.0) / 2.0,
            Easing::InQuad => x * x,
            Easing::OutQuad => 1.0 - (1.0 - x) * (1.0 - x),
            Easing::InOutQuad => in_out(x, 2.0, 2),
            Easing::InCubic => x.powi(3),
            Easing::OutCubic => 1.0 - (1.0 - x).powi(3),
            Easing::InOutCubic => in_out(x, 4.0, 3),
            Easing::InQuart => x.powi(4),
            Easing::OutQuart => 1.0 - (1.0 - x).powi(4),
            Easing::InOutQuart => in_out(x, 8.0, 4),
            Easing::InQuint => x.powi(5),
            Easing::OutQuint => 1.0 - (1.0 - x).powi(5),
            Easing::InOutQuint => in_out(x, 16.0, 5),
            // The exponential curves are singular at the endpoints, so those
            // are pinned exactly. Near-misses go through the raw formula.
            Easing::InExpo => {
                if x == 0.0 {
                    0.0
                } else {
                    2f64.powf(10.0 * x - 10.0)
                }
            }
            Easing::OutExpo => {
                if x == 1.0 {
                    1.0
                } else {
                    1.0 - 2f64.powf(-10.0 * x)
                }
            }
            Easing::InOutExpo => {
                if x == 0.0 {
                    0.0
                } else if x == 1.0 {
                    1.0
                } else if x < 0.5 {
                    2f64.powf(20.0 * x - 10.0) / 2.0
                } else {
                    (2.0 - 2f64.powf(-20.0 * x + 10.0)) / 2.0
                }
            }
            Easing::InCirc => 1.0 - (1.0 - x * x).sqrt(),
            Easing::OutCirc => (1.0 - (x - 1.0).powi(2)).sqrt(),
            Easing::InOutCirc => {
                if x < 0.5 {
                    (1.0 - (1.0 - (2.0 * x).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * x + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }
            Easing::InBack => C3 * x.powi(3) - C1 * x * x,
            Easing::OutBack => 1.0 + C3 * (x - 1.0).powi(3) + C1 * (x - 1.0).powi(2),
            Easing::InOutBack => {
                if x < 0.5 {
                    ((2.0 * x).powi(2) * ((C2 + 1.0) * 2.0 * x - C2)) / 2.0
                } else {
                    ((2.0 * x - 2.0).powi(2) * ((C2 + 1.0) * (x * 2.0 - 2.0) + C2) + 2.0) / 2.0
                }
            }
        }
    }

    /// Whether the curve leaves `[0, 1]` between its endpoints.
    pub fn overshoots(self) -> bool {
        matches!(self, Easing::InBack | Easing::OutBack | Easing::InOutBack)
    }

    pub fn name(self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::InSine => "in-sine",
            Easing::OutSine => "out-sine",
            Easing::InOutSine => "in-out-sine",
            Easing::InQuad => "in-quad",
            Easing::OutQuad => "out-quad",
            Easing::InOutQuad => "in-out-quad",
            Easing::InCubic => "in-cubic",
            Easing::OutCubic => "out-cubic",
            Easing::InOutCubic => "in-out-cubic",
            Easing::InQuart => "in-quart",
            Easing::OutQuart => "out-quart",
            Easing::InOutQuart => "in-out-quart",
            Easing::InQuint => "in-quint",
            Easing::OutQuint => "out-quint",
            Easing::InOutQuint => "in-out-quint",
            Easing::InExpo => "in-expo",
            Easing::OutExpo => "out-expo",
            Easing::InOutExpo => "in-out-expo",
            Easing::InCirc => "in-circ",
            Easing::OutCirc => "out-circ",
            Easing::InOutCirc => "in-out-circ",
            Easing::InBack => "in-back",
            Easing::OutBack => "out-back",
            Easing::InOutBack => "in-out-back",
        }
    }
}

/// Shared shape of the polynomial in-out curves: `k * x^n` for the first half,
/// mirrored for the second.
fn in_out(x: f64, k: f64, n: i32) -> f64 {
    if x < 0.5 {
        k * x.powi(n)
    } else {
        1.0 - (-2.0 * x + 2.0).powi(n) / 2.0
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Easing {
    type Err = GvmError;

    fn from_str(s: &str) -> Result<Self> {
        Easing::ALL
            .iter()
            .copied()
            .find(|easing| easing.name() == s)
            .ok_or_else(|| GvmError::validation(format!("unknown easing `{s}`")))
    }
}
