//! Rational frame rates and the frame/timestamp arithmetic built on them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Frame counts within this many ULPs of an integer are taken as that
/// integer, so `2.3 * 10` (`22.999999999999996` in binary floating point)
/// counts 23 frames.
const FRAME_COUNT_ULPS: f64 = 4.0;

/// A frame rate expressed as `num / den` frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FramerateRepr", into = "String")]
pub struct Framerate {
    pub num: u32,
    pub den: u32,
}

impl Framerate {
    /// Create a frame rate, rejecting zero numerators or denominators.
    pub fn new(num: u32, den: u32) -> Result<Self, ModelError> {
        if num == 0 || den == 0 {
            return Err(ModelError::validation(format!(
                "framerate {num}/{den} must have a positive numerator and denominator"
            )));
        }
        Ok(Self { num, den })
    }

    /// Integer frame rate (`fps/1`).
    pub const fn fps(fps: u32) -> Self {
        Self { num: fps, den: 1 }
    }

    /// Frames per second as a float.
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Number of frames covering `duration_secs`.
    ///
    /// `floor(duration * num / den)`: partial trailing frames are dropped,
    /// so non-integral durations are not reproduced exactly.
    pub fn frame_count(&self, duration_secs: f64) -> u64 {
        if self.num == 0 || self.den == 0 || !duration_secs.is_finite() || duration_secs <= 0.0 {
            return 0;
        }
        let exact = duration_secs * self.num as f64 / self.den as f64;
        let nearest = exact.round();
        if (exact - nearest).abs() <= FRAME_COUNT_ULPS * f64::EPSILON * exact.max(1.0) {
            nearest as u64
        } else {
            exact.floor() as u64
        }
    }

    /// Presentation time of frame `index` in seconds: `index * den / num`.
    pub fn timestamp(&self, index: u64) -> f64 {
        index as f64 * self.den as f64 / self.num as f64
    }
}

impl fmt::Display for Framerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl FromStr for Framerate {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |part: &str| {
            part.trim().parse::<u32>().map_err(|_| {
                ModelError::validation(format!(
                    "invalid framerate `{s}` (expected `num/den` or an integer)"
                ))
            })
        };
        match s.split_once('/') {
            Some((num, den)) => Self::new(parse(num)?, parse(den)?),
            None => Self::new(parse(s)?, 1),
        }
    }
}

impl From<Framerate> for String {
    fn from(rate: Framerate) -> Self {
        rate.to_string()
    }
}

/// Accepted JSON spellings: `"30000/1001"`, `30`, `[30000, 1001]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum FramerateRepr {
    Text(String),
    Integer(u32),
    Pair([u32; 2]),
}

impl TryFrom<FramerateRepr> for Framerate {
    type Error = ModelError;

    fn try_from(repr: FramerateRepr) -> Result<Self, Self::Error> {
        match repr {
            FramerateRepr::Text(text) => text.parse(),
            FramerateRepr::Integer(fps) => Self::new(fps, 1),
            FramerateRepr::Pair([num, den]) => Self::new(num, den),
        }
    }
}
