//! Geometric calculators turning averaged observations into angles and distances.
//!
//! Lengths are in whatever unit the caller uses for the physical inputs
//! (centimeters throughout the measurement flows); pixel quantities are in
//! frame pixels. All functions are pure.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::CalibratedProfile;

/// Area of a circle with radius `radius`.
#[inline]
pub fn circle_area(radius: f64) -> f64 {
    PI * radius * radius
}

/// Convert a device focal length reported in millimeters to centimeters.
#[inline]
pub fn focal_length_mm_to_cm(mm: f64) -> f64 {
    mm / 10.0
}

/// Horizontal field of view (radians) from a marker of physical radius
/// `radius` observed at `distance` with mean pixel radius `pixel_radius` in
/// a frame `frame_width` pixels wide.
///
/// The marker spans `pixel_radius` pixels for `radius` physical units, so
/// the half width of the frame covers `radius * (W / 2) / pixel_radius`
/// physical units at `distance`.
pub fn horizontal_fov(radius: f64, distance: f64, pixel_radius: f64, frame_width: f64) -> f64 {
    let half_length = radius * (frame_width / 2.0) / pixel_radius;
    2.0 * (half_length / distance).atan()
}

/// Projected size of an area `area` seen at `distance`, scaled to the
/// focal plane: `area * d² / f²`.
#[inline]
pub fn focal_size(area: f64, distance: f64, focal_length: f64) -> f64 {
    area * distance * distance / (focal_length * focal_length)
}

/// Distance to a marker whose current mean pixel radius is
/// `observed_pixel_radius`, given its calibration profile.
pub fn monocular_distance(
    profile: &CalibratedProfile,
    observed_pixel_radius: f64,
    focal_length: f64,
) -> f64 {
    let reference = focal_size(
        circle_area(profile.pixel_radius),
        profile.distance(),
        focal_length,
    );
    let observed = circle_area(observed_pixel_radius);
    focal_length / (observed / reference).sqrt()
}

/// Uncorrected stereo distance.
///
/// `xr` / `xl` are the marker's horizontal offsets from the frame midline in
/// the right and left capture, `fov_half_tan = tan(fov / 2)`.
pub fn stereo_distance(
    camera_distance: f64,
    fov_half_tan: f64,
    frame_width: f64,
    xr: f64,
    xl: f64,
) -> f64 {
    camera_distance * frame_width / (2.0 * fov_half_tan * (xr - xl))
}

/// Project the left offset `xl` onto the viewing plane of the right capture,
/// given the yaw change `error_angle = yaw_left − yaw_right`.
///
/// Negative angles are anticlockwise drift, the rest clockwise.
pub fn correct_left_offset(xl: f64, error_angle: f64, fov_half_tan: f64, frame_width: f64) -> f64 {
    let x_error = error_angle.abs().tan() * (frame_width / 2.0) / fov_half_tan;
    if error_angle < 0.0 {
        xl / error_angle.cos() - x_error
    } else {
        error_angle.cos() * (xl + x_error)
    }
}

/// Averaged inputs of a two-capture stereo measurement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StereoMeasurement {
    /// Distance between the two camera positions.
    pub camera_distance: f64,
    /// Full horizontal field of view in radians.
    pub horizontal_fov: f64,
    pub frame_width: f64,
    /// Marker offset from the midline in the right capture (phase 1).
    pub xr: f64,
    /// Marker offset from the midline in the left capture (phase 2).
    pub xl: f64,
    /// Mean yaw during phase 2 minus mean yaw during phase 1.
    pub error_angle: f64,
}

/// Both stereo estimates of one measurement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StereoDistance {
    pub distance: f64,
    pub corrected_distance: f64,
    /// `xl` after orientation correction.
    pub corrected_xl: f64,
}

impl StereoMeasurement {
    pub fn fov_half_tan(&self) -> f64 {
        (self.horizontal_fov / 2.0).tan()
    }

    pub fn solve(&self) -> StereoDistance {
        let t = self.fov_half_tan();
        let distance = stereo_distance(self.camera_distance, t, self.frame_width, self.xr, self.xl);
        let corrected_xl = correct_left_offset(self.xl, self.error_angle, t, self.frame_width);
        let corrected_distance =
            stereo_distance(self.camera_distance, t, self.frame_width, self.xr, corrected_xl);
        StereoDistance {
            distance,
            corrected_distance,
            corrected_xl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MarkerProfile;
    use approx::assert_relative_eq;

    #[test]
    fn fov_reference_scenario() {
        let fov = horizontal_fov(5.0, 100.0, 50.0, 640.0);
        assert_relative_eq!(fov / 2.0, 0.32f64.atan(), epsilon = 1e-12);
        assert_relative_eq!(fov, 0.6194, epsilon = 1e-4);
        assert_relative_eq!(fov.to_degrees(), 35.5, epsilon = 0.05);
    }

    #[test]
    fn monocular_distance_follows_inverse_square_area() {
        let profile = MarkerProfile::new("ref", 100.0, 5.0).calibrate(50.0);
        for f in [0.35, 0.47, 2.0] {
            assert_relative_eq!(monocular_distance(&profile, 25.0, f), 200.0, epsilon = 1e-9);
            assert_relative_eq!(monocular_distance(&profile, 50.0, f), 100.0, epsilon = 1e-9);
            assert_relative_eq!(monocular_distance(&profile, 100.0, f), 50.0, epsilon = 1e-9);
        }
        let f = 0.4;
        let expected = PI * 50.0 * 50.0 * 100.0 * 100.0 / (f * f);
        assert_relative_eq!(
            focal_size(circle_area(50.0), 100.0, f),
            expected,
            max_relative = 1e-12
        );
    }

    #[test]
    fn stereo_reference_scenario() {
        let d = stereo_distance(10.0, 0.32, 640.0, 400.0, 200.0);
        assert_relative_eq!(d, 50.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_error_angle_leaves_offset_unchanged() {
        let m = StereoMeasurement {
            camera_distance: 10.0,
            horizontal_fov: 2.0 * 0.32f64.atan(),
            frame_width: 640.0,
            xr: 100.0,
            xl: -100.0,
            error_angle: 0.0,
        };
        let out = m.solve();
        assert_relative_eq!(out.distance, 50.0, epsilon = 1e-9);
        assert_relative_eq!(out.corrected_distance, out.distance, epsilon = 1e-9);
        assert_relative_eq!(out.corrected_xl, -100.0, epsilon = 1e-9);
    }

    #[test]
    fn correction_branches_on_rotation_direction() {
        let t = 0.32;
        let w = 640.0;
        let e: f64 = 0.01;
        let x_error = e.tan() * 320.0 / t;

        let cw = correct_left_offset(-80.0, e, t, w);
        assert_relative_eq!(cw, e.cos() * (-80.0 + x_error), epsilon = 1e-12);

        let ccw = correct_left_offset(-80.0, -e, t, w);
        assert_relative_eq!(ccw, -80.0 / e.cos() - x_error, epsilon = 1e-12);

        assert!(ccw < -80.0 && cw > -80.0);
    }
}
