//! Animated values evaluated deterministically in time.

use serde::{Deserialize, Serialize};

/// Interpolation applied between a keyframe and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Easing {
    #[default]
    Linear,
    /// Hold the keyframe value until the next keyframe.
    Step,
    /// Smoothstep (`3t² - 2t³`).
    Smooth,
}

impl Easing {
    /// Map linear progress in `[0, 1]` through this easing curve.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::Step => 0.0,
            Easing::Smooth => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// Values that can be interpolated between keyframes.
pub trait Lerp: Copy {
    fn lerp(a: Self, b: Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: Self, b: Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl<const N: usize> Lerp for [f64; N] {
    fn lerp(a: Self, b: Self, t: f64) -> Self {
        std::array::from_fn(|i| f64::lerp(a[i], b[i], t))
    }
}

/// A value at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe<T> {
    /// Time in seconds.
    pub time: f64,

    pub value: T,

    /// Easing of the segment that starts at this keyframe.
    #[serde(default)]
    pub easing: Easing,
}

/// Either a constant or a keyframed value.
///
/// In JSON a constant is written as the bare value and an animation as an
/// array of keyframe objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Animated<T> {
    Constant(T),
    Keyframes(Vec<Keyframe<T>>),
}

impl<T: Default> Default for Animated<T> {
    fn default() -> Self {
        Animated::Constant(T::default())
    }
}

impl<T: Lerp> Animated<T> {
    /// Evaluate at `time` seconds.
    ///
    /// Times before the first keyframe hold the first value, times after the
    /// last hold the last value. Returns `None` only for an empty keyframe list.
    pub fn evaluate(&self, time: f64) -> Option<T> {
        let keyframes = match self {
            Animated::Constant(value) => return Some(*value),
            Animated::Keyframes(keyframes) => keyframes,
        };

        let first = keyframes.first()?;
        if time <= first.time {
            return Some(first.value);
        }

        // First keyframe strictly after `time`; validated lists are sorted.
        let next = keyframes.partition_point(|kf| kf.time <= time);
        if next >= keyframes.len() {
            return keyframes.last().map(|kf| kf.value);
        }

        let a = &keyframes[next - 1];
        let b = &keyframes[next];
        let span = b.time - a.time;
        let local = if span > 0.0 { (time - a.time) / span } else { 1.0 };
        Some(T::lerp(a.value, b.value, a.easing.apply(local)))
    }

    /// Time of the last keyframe, or 0 for constants.
    pub fn end_time(&self) -> f64 {
        match self {
            Animated::Constant(_) => 0.0,
            Animated::Keyframes(keyframes) => keyframes.last().map_or(0.0, |kf| kf.time),
        }
    }

    /// Check that keyframes exist, have finite times, and are strictly increasing.
    pub fn check(&self) -> Result<(), String> {
        let Animated::Keyframes(keyframes) = self else {
            return Ok(());
        };
        if keyframes.is_empty() {
            return Err("keyframe list is empty".to_string());
        }
        if keyframes.iter().any(|kf| !kf.time.is_finite()) {
            return Err("keyframe times must be finite".to_string());
        }
        for pair in keyframes.windows(2) {
            if pair[1].time <= pair[0].time {
                return Err(format!(
                    "keyframe times must strictly increase ({} then {})",
                    pair[0].time, pair[1].time
                ));
            }
        }
        Ok(())
    }
}
