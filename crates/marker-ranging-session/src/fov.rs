//! Horizontal field-of-view calibration against a marker of known size held
//! at a known distance in the middle of the frame.

use marker_ranging_core::geometry::horizontal_fov;
use marker_ranging_core::{FrameSize, Region, SampleAccumulator, DEFAULT_SAMPLE_SIZE};
use marker_ranging_vision::{ContourFilter, ContourParams, MarkerObservation, ProcessingConfig};
use serde::{Deserialize, Serialize};

use crate::flow::{Completion, MeasurementFlow, Rejection, Verdict};
use crate::table::SampleTable;

/// Side of the search square relative to the shorter frame side.
pub const SEARCH_AREA_RATIO: f64 = 0.5;
/// Allowed marker center offset relative to the shorter frame side.
pub const MAX_CENTER_DEVIATION: f64 = 0.015;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FovConfig {
    /// Physical marker radius.
    pub marker_radius: f64,
    /// Camera to marker distance, same unit as the radius.
    pub marker_distance: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FovResult {
    /// Radians.
    pub horizontal_fov: f64,
    pub mean_pixel_radius: f64,
}

#[derive(Clone, Debug)]
pub struct FovFlow {
    config: FovConfig,
    radii: SampleAccumulator,
}

impl FovFlow {
    pub fn new(config: FovConfig) -> Self {
        Self {
            config,
            radii: SampleAccumulator::new(DEFAULT_SAMPLE_SIZE),
        }
    }

    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.radii = SampleAccumulator::new(n);
        self
    }

    pub fn config(&self) -> &FovConfig {
        &self.config
    }

    pub fn radii(&self) -> &SampleAccumulator {
        &self.radii
    }

    /// Centered square searched for the marker.
    pub fn search_region(frame: FrameSize) -> Region {
        let side = (frame.min_side() as f64 * SEARCH_AREA_RATIO).round() as u32;
        Region::centered_square(frame.center(), side)
    }

    pub fn max_center_offset(frame: FrameSize) -> f64 {
        (frame.min_side() as f64 * MAX_CENTER_DEVIATION).round()
    }
}

impl MeasurementFlow for FovFlow {
    type Output = FovResult;

    const LOG_PREFIX: &'static str = "calib";

    fn contour_filter(&self) -> ContourFilter {
        ContourFilter::CircleLike
    }

    fn processing(&self) -> ProcessingConfig {
        ProcessingConfig::with_contours(ContourParams::wide_search())
    }

    fn fixed_region(&self, frame: FrameSize) -> Option<Region> {
        Some(Self::search_region(frame))
    }

    fn begin_round(&mut self) -> Result<(), Rejection> {
        self.radii.clear();
        Ok(())
    }

    fn judge(&self, observation: &MarkerObservation, frame: FrameSize) -> Verdict {
        let offset = (observation.center - frame.center()).norm();
        if offset > Self::max_center_offset(frame) {
            Verdict::Skip(Rejection::OffCenter)
        } else {
            Verdict::Accept
        }
    }

    fn record(&mut self, observation: &MarkerObservation, _frame: FrameSize) {
        let radius = observation.pixel_radius();
        self.radii.push(radius);
        log::debug!("fov sample {}: radius={:.3}", self.radii.len(), radius);
    }

    fn progress(&self) -> f32 {
        self.radii.progress()
    }

    fn completion(&mut self, frame: FrameSize) -> Completion<FovResult> {
        if !self.radii.is_full() {
            return Completion::Continue;
        }
        let mean_pixel_radius = self.radii.average();
        let fov = horizontal_fov(
            self.config.marker_radius,
            self.config.marker_distance,
            mean_pixel_radius,
            frame.width as f64,
        );
        log::info!(
            "horizontal fov {:.2}° (pixel radius {:.3})",
            fov.to_degrees(),
            mean_pixel_radius
        );
        Completion::Finished(FovResult {
            horizontal_fov: fov,
            mean_pixel_radius,
        })
    }

    fn sample_table(&self) -> SampleTable {
        SampleTable::from_accumulators(&[("radius", &self.radii)])
    }
}
