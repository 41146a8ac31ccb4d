//! Two-capture stereo ranging with a single camera.
//!
//! Phase one captures the marker in the right half of the frame, then the
//! device is moved sideways by a known distance and phase two captures it in
//! the left half. Device yaw is sampled in both phases so that a rotation
//! between the captures can be corrected for.

use marker_ranging_core::geometry::StereoMeasurement;
use marker_ranging_core::{ContinuousAngleWrapper, FrameSize, SampleAccumulator, DEFAULT_SAMPLE_SIZE};
use marker_ranging_vision::{ContourFilter, MarkerObservation};
use serde::{Deserialize, Serialize};

use crate::flow::{Completion, MeasurementFlow, Rejection, Verdict};
use crate::session::{Session, SessionState};
use crate::table::SampleTable;

/// Largest yaw deviation (radians) accepted when starting phase two.
pub const MAX_YAW_DEVIATION: f64 = std::f64::consts::PI / 180.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StereoConfig {
    /// Distance between the two camera positions.
    pub camera_distance: f64,
    /// Calibrated horizontal field of view in radians.
    pub horizontal_fov: f64,
    /// Start phase two regardless of yaw drift.
    #[serde(default)]
    pub ignore_orientation_check: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StereoResult {
    pub distance: f64,
    pub corrected_distance: f64,
    /// Mean marker offset from the midline, phase one.
    pub x_right: f64,
    /// Mean marker offset from the midline, phase two.
    pub x_left: f64,
    /// Mean yaw of phase two minus mean yaw of phase one.
    pub error_angle: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StereoPhase {
    /// Marker in the right half.
    #[default]
    Right,
    /// Marker in the left half.
    Left,
}

#[derive(Clone, Debug)]
pub struct StereoFlow {
    config: StereoConfig,
    phase: StereoPhase,
    x_right: SampleAccumulator,
    yaw_right: SampleAccumulator,
    x_left: SampleAccumulator,
    yaw_left: SampleAccumulator,
    yaw: ContinuousAngleWrapper,
    mean_yaw_right: f64,
    deviation: f64,
}

impl StereoFlow {
    pub fn new(config: StereoConfig) -> Self {
        Self {
            config,
            phase: StereoPhase::Right,
            x_right: SampleAccumulator::new(DEFAULT_SAMPLE_SIZE),
            yaw_right: SampleAccumulator::new(DEFAULT_SAMPLE_SIZE),
            x_left: SampleAccumulator::new(DEFAULT_SAMPLE_SIZE),
            yaw_left: SampleAccumulator::new(DEFAULT_SAMPLE_SIZE),
            yaw: ContinuousAngleWrapper::new(),
            mean_yaw_right: 0.0,
            deviation: 0.0,
        }
    }

    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.x_right = SampleAccumulator::new(n);
        self.yaw_right = SampleAccumulator::new(n);
        self.x_left = SampleAccumulator::new(n);
        self.yaw_left = SampleAccumulator::new(n);
        self
    }

    pub fn config(&self) -> &StereoConfig {
        &self.config
    }

    pub fn phase(&self) -> StereoPhase {
        self.phase
    }

    /// Current yaw minus the phase-one mean; only meaningful in phase two.
    pub fn deviation(&self) -> f64 {
        self.deviation
    }

    pub fn full_yaw(&self) -> f64 {
        self.yaw.full_angle()
    }

    fn accumulators(&self) -> (&SampleAccumulator, &SampleAccumulator) {
        match self.phase {
            StereoPhase::Right => (&self.x_right, &self.yaw_right),
            StereoPhase::Left => (&self.x_left, &self.yaw_left),
        }
    }

    /// Feed a bounded yaw reading. Samples are kept only while `sampling`.
    pub fn on_orientation(&mut self, yaw: f64, sampling: bool) {
        self.yaw.update(yaw);
        let full = self.yaw.full_angle();
        if self.phase == StereoPhase::Left {
            self.deviation = full - self.mean_yaw_right;
        }
        if !sampling {
            return;
        }
        match self.phase {
            StereoPhase::Right => self.yaw_right.push(full),
            StereoPhase::Left => self.yaw_left.push(full),
        };
    }

    fn result(&self, frame: FrameSize) -> StereoResult {
        let midline = frame.midline() as f64;
        let m = StereoMeasurement {
            camera_distance: self.config.camera_distance,
            horizontal_fov: self.config.horizontal_fov,
            frame_width: frame.width as f64,
            xr: self.x_right.average() - midline,
            xl: self.x_left.average() - midline,
            error_angle: self.yaw_left.average() - self.yaw_right.average(),
        };
        let solved = m.solve();
        log::debug!(
            "xr={:.3} xl={:.3} error angle={:.3}° corrected xl={:.3}",
            m.xr,
            m.xl,
            m.error_angle.to_degrees(),
            solved.corrected_xl
        );
        StereoResult {
            distance: solved.distance,
            corrected_distance: solved.corrected_distance,
            x_right: m.xr,
            x_left: m.xl,
            error_angle: m.error_angle,
        }
    }
}

impl MeasurementFlow for StereoFlow {
    type Output = StereoResult;

    const LOG_PREFIX: &'static str = "stereo";

    fn contour_filter(&self) -> ContourFilter {
        ContourFilter::CircleLike
    }

    fn begin_round(&mut self) -> Result<(), Rejection> {
        self.x_left.clear();
        self.yaw_left.clear();
        match self.phase {
            StereoPhase::Right => {
                self.x_right.clear();
                self.yaw_right.clear();
            }
            StereoPhase::Left => {
                if self.deviation.abs() > MAX_YAW_DEVIATION && !self.config.ignore_orientation_check
                {
                    return Err(Rejection::OrientationDrift {
                        deviation: self.deviation,
                    });
                }
            }
        }
        Ok(())
    }

    fn judge(&self, observation: &MarkerObservation, frame: FrameSize) -> Verdict {
        let x = observation.center.x;
        let midline = frame.midline() as f64;
        let wrong_half = match self.phase {
            StereoPhase::Right => x < midline,
            StereoPhase::Left => x > midline,
        };
        if wrong_half {
            Verdict::Reject(Rejection::WrongHalf)
        } else {
            Verdict::Accept
        }
    }

    fn record(&mut self, observation: &MarkerObservation, _frame: FrameSize) {
        let x = observation.center.x;
        match self.phase {
            StereoPhase::Right => self.x_right.push(x),
            StereoPhase::Left => self.x_left.push(x),
        };
    }

    fn progress(&self) -> f32 {
        let (x, yaw) = self.accumulators();
        let total = x.capacity() + yaw.capacity();
        if total == 0 {
            return 1.0;
        }
        (x.len() + yaw.len()) as f32 / total as f32
    }

    fn completion(&mut self, frame: FrameSize) -> Completion<StereoResult> {
        let (x, yaw) = self.accumulators();
        if !(x.is_full() && yaw.is_full()) {
            return Completion::Continue;
        }
        match self.phase {
            StereoPhase::Right => {
                self.mean_yaw_right = self.yaw_right.average();
                self.deviation = self.yaw.full_angle() - self.mean_yaw_right;
                self.phase = StereoPhase::Left;
                log::info!(
                    "right capture done, mean yaw {:.3}°",
                    self.mean_yaw_right.to_degrees()
                );
                Completion::PhaseComplete
            }
            StereoPhase::Left => {
                let result = self.result(frame);
                log::info!(
                    "stereo distance {:.2}, corrected {:.2}",
                    result.distance,
                    result.corrected_distance
                );
                Completion::Finished(result)
            }
        }
    }

    fn step_back(&mut self) -> bool {
        if self.phase == StereoPhase::Left {
            self.phase = StereoPhase::Right;
            true
        } else {
            false
        }
    }

    fn sample_table(&self) -> SampleTable {
        SampleTable::from_accumulators(&[
            ("yaw_right", &self.yaw_right),
            ("x_right", &self.x_right),
            ("yaw_left", &self.yaw_left),
            ("x_left", &self.x_left),
        ])
    }
}

impl Session<StereoFlow> {
    /// Orientation sensor callback with a bounded yaw in `[-π, π]`.
    pub fn on_orientation(&mut self, yaw: f64) {
        let sampling = matches!(self.state, SessionState::Sampling(_));
        self.flow.on_orientation(yaw, sampling);
    }
}
