//! Piecewise-linear curve used to reshape heights before meshing.

use serde::{Deserialize, Serialize};

/// A `(time, value)` key on a [`HeightCurve`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

/// Keyframed curve, linear between keys and clamped outside them.
///
/// Keys must be sorted by `time`. An empty curve is the identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeightCurve {
    keys: Vec<CurveKey>,
}

impl HeightCurve {
    pub fn new(keys: Vec<CurveKey>) -> Self {
        Self { keys }
    }

    /// The straight line from `(0, 0)` to `(1, 1)`.
    pub fn linear() -> Self {
        Self::new(vec![
            CurveKey {
                time: 0.0,
                value: 0.0,
            },
            CurveKey {
                time: 1.0,
                value: 1.0,
            },
        ])
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    /// Index of the first key with a NaN or infinite time or value.
    pub fn first_non_finite_key(&self) -> Option<usize> {
        self.keys
            .iter()
            .position(|k| !k.time.is_finite() || !k.value.is_finite())
    }

    /// Index of the first key that is earlier than its predecessor.
    pub fn first_unsorted_key(&self) -> Option<usize> {
        self.keys
            .windows(2)
            .position(|w| w[1].time < w[0].time)
            .map(|i| i + 1)
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return t;
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }
        // `t` is strictly inside the key range, so a bracketing pair exists.
        let upper = self.keys.partition_point(|k| k.time <= t);
        let a = self.keys[upper - 1];
        let b = self.keys[upper];
        let span = b.time - a.time;
        if span <= 0.0 {
            return b.value;
        }
        a.value + (b.value - a.value) * ((t - a.time) / span)
    }
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}
