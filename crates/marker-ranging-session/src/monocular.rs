//! Single-camera flow: calibrate a marker's pixel radius at a known
//! distance, or measure the distance to a calibrated marker.

use marker_ranging_core::geometry::monocular_distance;
use marker_ranging_core::{
    CalibratedProfile, CalibrationProfile, FrameSize, MarkerProfile, SampleAccumulator,
    DEFAULT_SAMPLE_SIZE,
};
use marker_ranging_vision::{ContourFilter, ContourParams, MarkerObservation, ProcessingConfig};
use serde::{Deserialize, Serialize};

use crate::flow::{Completion, MeasurementFlow, Rejection, Verdict};
use crate::table::SampleTable;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MonocularMode {
    /// Record the marker's pixel radius at its calibration distance.
    Calibrate { marker: MarkerProfile },
    /// Estimate the distance to a calibrated marker.
    Measure {
        profile: CalibratedProfile,
        /// Camera focal length in centimeters.
        focal_length_cm: f64,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonocularOutput {
    Calibrated { profile: CalibratedProfile },
    Distance {
        distance: f64,
        mean_pixel_radius: f64,
    },
}

#[derive(Clone, Debug)]
pub struct MonocularFlow {
    mode: MonocularMode,
    radii: SampleAccumulator,
}

impl MonocularFlow {
    pub fn new(mode: MonocularMode) -> Self {
        Self {
            mode,
            radii: SampleAccumulator::new(DEFAULT_SAMPLE_SIZE),
        }
    }

    pub fn calibrate(marker: MarkerProfile) -> Self {
        Self::new(MonocularMode::Calibrate { marker })
    }

    pub fn measure(profile: CalibratedProfile, focal_length_cm: f64) -> Self {
        Self::new(MonocularMode::Measure {
            profile,
            focal_length_cm,
        })
    }

    /// Calibrate an uncalibrated profile, measure with a calibrated one.
    pub fn for_profile(profile: CalibrationProfile, focal_length_cm: f64) -> Self {
        match profile {
            CalibrationProfile::Uncalibrated(marker) => Self::calibrate(marker),
            CalibrationProfile::Calibrated(profile) => Self::measure(profile, focal_length_cm),
        }
    }

    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.radii = SampleAccumulator::new(n);
        self
    }

    pub fn mode(&self) -> &MonocularMode {
        &self.mode
    }

    pub fn radii(&self) -> &SampleAccumulator {
        &self.radii
    }
}

impl MeasurementFlow for MonocularFlow {
    type Output = MonocularOutput;

    const LOG_PREFIX: &'static str = "cao";

    fn contour_filter(&self) -> ContourFilter {
        ContourFilter::EllipseFittable
    }

    fn processing(&self) -> ProcessingConfig {
        ProcessingConfig::with_contours(ContourParams::tight_search())
    }

    fn begin_round(&mut self) -> Result<(), Rejection> {
        self.radii.clear();
        Ok(())
    }

    fn judge(&self, _observation: &MarkerObservation, _frame: FrameSize) -> Verdict {
        Verdict::Accept
    }

    fn record(&mut self, observation: &MarkerObservation, _frame: FrameSize) {
        let radius = observation.pixel_radius();
        self.radii.push(radius);
        log::debug!("radius sample {}: {:.3}", self.radii.len(), radius);
    }

    fn progress(&self) -> f32 {
        self.radii.progress()
    }

    fn completion(&mut self, _frame: FrameSize) -> Completion<MonocularOutput> {
        if !self.radii.is_full() {
            return Completion::Continue;
        }
        let mean_pixel_radius = self.radii.average();
        let output = match &self.mode {
            MonocularMode::Calibrate { marker } => {
                log::info!("{} calibrated: pixel radius {:.3}", marker.name, mean_pixel_radius);
                MonocularOutput::Calibrated {
                    profile: marker.clone().calibrate(mean_pixel_radius),
                }
            }
            MonocularMode::Measure {
                profile,
                focal_length_cm,
            } => {
                let distance = monocular_distance(profile, mean_pixel_radius, *focal_length_cm);
                log::info!("distance to {}: {:.2}", profile.name(), distance);
                MonocularOutput::Distance {
                    distance,
                    mean_pixel_radius,
                }
            }
        };
        Completion::Finished(output)
    }

    fn sample_table(&self) -> SampleTable {
        SampleTable::from_accumulators(&[("radius", &self.radii)])
    }
}
