//! Easing curves for the convergence phase.
//!
//! Only the curves the motion model actually offers are kept here; every
//! curve maps 0 to 0 and 1 to exactly 1 so a converged particle lands on
//! its target.

use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Curve used to interpolate a particle from its snapshot to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Easing {
    /// Springy overshoot that rings around the target before settling.
    #[default]
    Elastic,
    /// Single overshoot past the target.
    Back,
    /// Decelerating cubic, no overshoot.
    Cubic,
    /// Constant speed.
    Linear,
}

impl Easing {
    /// Evaluates the curve at `t`, clamped to 0-1.
    pub fn ease(self, t: f32) -> f32 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        match self {
            Easing::Elastic => elastic_out(t),
            Easing::Back => back_out(t),
            Easing::Cubic => cubic_out(t),
            Easing::Linear => t,
        }
    }
}

const ELASTIC_PERIOD: f32 = (2.0 * PI) / 3.0;
const BACK_OVERSHOOT: f32 = 1.70158;

/// Elastic ease out.
#[inline]
pub fn elastic_out(t: f32) -> f32 {
    if t <= 0.0 {
        0.0
    } else if t >= 1.0 {
        1.0
    } else {
        2.0f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * ELASTIC_PERIOD).sin() + 1.0
    }
}

/// Back ease out (overshoots once at the end).
#[inline]
pub fn back_out(t: f32) -> f32 {
    let u = t - 1.0;
    1.0 + (BACK_OVERSHOOT + 1.0) * u * u * u + BACK_OVERSHOOT * u * u
}

/// Cubic ease out.
#[inline]
pub fn cubic_out(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Cubic Hermite step, clamped to 0-1.
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_exact() {
        for easing in [Easing::Elastic, Easing::Back, Easing::Cubic, Easing::Linear] {
            assert!(easing.ease(0.0).abs() < 1e-6, "{easing:?} at 0");
            assert_eq!(easing.ease(1.0), 1.0, "{easing:?} at 1");
        }
    }

    #[test]
    fn test_elastic_overshoots() {
        let peak = (1..100)
            .map(|i| elastic_out(i as f32 / 100.0))
            .fold(f32::MIN, f32::max);
        assert!(peak > 1.0, "elastic_out should overshoot the target");
    }

    #[test]
    fn test_clamps_input() {
        assert_eq!(Easing::Elastic.ease(-3.0), 0.0);
        assert_eq!(Easing::Cubic.ease(7.0), 1.0);
        assert_eq!(smoothstep(2.0), 1.0);
        assert_eq!(smoothstep(-1.0), 0.0);
    }
}
