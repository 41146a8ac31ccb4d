use nalgebra::{Quaternion, UnitQuaternion};
use std::f64::consts::TAU;

/// Minimum jump between two consecutive readings (radians) that is treated
/// as a crossing of the ±π boundary rather than a swing through zero.
pub const REVOLUTION_THRESHOLD: f64 = 1.0;

/// Unwraps an orientation sensor angle bounded to `[-π, π]` into a
/// continuous angle by counting boundary crossings.
///
/// A sign change with `|delta| >= REVOLUTION_THRESHOLD` is read as a
/// wraparound. This is a heuristic: a real rotation faster than the
/// threshold between two samples is miscounted.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContinuousAngleWrapper {
    initialized: bool,
    last: f64,
    revolutions: i32,
}

impl ContinuousAngleWrapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next bounded reading.
    pub fn update(&mut self, angle: f64) {
        if !self.initialized {
            self.initialized = true;
            self.last = angle;
            self.revolutions = 0;
            return;
        }

        if signum(self.last) != signum(angle) {
            let delta = angle - self.last;
            if delta.abs() >= REVOLUTION_THRESHOLD {
                self.revolutions -= signum(delta);
                log::debug!("angle wrapped, revolutions={}", self.revolutions);
            }
        }

        self.last = angle;
    }

    /// `2π * revolutions + last reading`.
    pub fn full_angle(&self) -> f64 {
        TAU * self.revolutions as f64 + self.last
    }

    pub fn revolutions(&self) -> i32 {
        self.revolutions
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Azimuth in `[-π, π]` of a rotation-vector sensor reading, either
/// `[x, y, z]` (scalar part implied) or `[x, y, z, w]`.
///
/// Matches the device convention `atan2(R[0][1], R[1][1])` on the rotation
/// matrix. Returns `None` for any other length.
pub fn azimuth_from_rotation_vector(v: &[f64]) -> Option<f64> {
    let (x, y, z, w) = match *v {
        [x, y, z] => (x, y, z, (1.0 - x * x - y * y - z * z).max(0.0).sqrt()),
        [x, y, z, w] => (x, y, z, w),
        _ => return None,
    };
    let r = UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)).to_rotation_matrix();
    let m = r.matrix();
    Some(m[(0, 1)].atan2(m[(1, 1)]))
}

// f64::signum maps +0.0 to 1.0; the wrap test needs zero to be its own sign.
#[inline]
fn signum(v: f64) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn first_update_initializes() {
        let mut w = ContinuousAngleWrapper::new();
        assert!(!w.is_initialized());
        w.update(-2.0);
        assert!(w.is_initialized());
        assert_eq!(w.revolutions(), 0);
        assert_eq!(w.full_angle(), -2.0);
    }

    #[test]
    fn increasing_sequence_across_pi_adds_one_revolution() {
        let mut w = ContinuousAngleWrapper::new();
        let readings = [2.9, 3.0, 3.1, -3.1, -3.0, -2.9];
        let mut prev = f64::NEG_INFINITY;
        for r in readings {
            w.update(r);
            let full = w.full_angle();
            assert!(full > prev, "full angle must keep increasing ({full} <= {prev})");
            prev = full;
        }
        assert_eq!(w.revolutions(), 1);
        assert!((w.full_angle() - (2.0 * PI - 2.9)).abs() < 1e-12);
    }

    #[test]
    fn decreasing_sequence_across_pi_removes_one_revolution() {
        let mut w = ContinuousAngleWrapper::new();
        for r in [-3.0, -3.1, 3.1, 3.0] {
            w.update(r);
        }
        assert_eq!(w.revolutions(), -1);
        assert!((w.full_angle() - (3.0 - 2.0 * PI)).abs() < 1e-12);
    }

    #[test]
    fn small_oscillation_through_zero_is_not_a_wrap() {
        let mut w = ContinuousAngleWrapper::new();
        for r in [0.2, -0.1, 0.3, -0.4, 0.0, 0.1] {
            w.update(r);
        }
        assert_eq!(w.revolutions(), 0);
        assert!((w.full_angle() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn azimuth_of_rotation_about_z() {
        let theta: f64 = 0.3;
        let (s, c) = (theta / 2.0).sin_cos();
        let az = azimuth_from_rotation_vector(&[0.0, 0.0, s, c]).expect("4 components");
        assert!((az + theta).abs() < 1e-12);
        let implied = azimuth_from_rotation_vector(&[0.0, 0.0, s]).expect("3 components");
        assert!((implied - az).abs() < 1e-12);
        assert!(azimuth_from_rotation_vector(&[0.0, 1.0]).is_none());
    }

    #[test]
    fn fast_swing_through_zero_is_miscounted() {
        // Known limitation of the threshold heuristic.
        let mut w = ContinuousAngleWrapper::new();
        w.update(0.6);
        w.update(-0.6);
        assert_eq!(w.revolutions(), 1);
    }
}
