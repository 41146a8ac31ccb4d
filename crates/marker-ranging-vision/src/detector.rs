use image::GrayImage;
use marker_ranging_core::{GrayImageView, Region};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::contours::ContourExtractor;
use crate::ellipse::{fit_ellipse, Ellipse};
use crate::params::{ContourFilter, ProcessingConfig};
use crate::preprocess::{ImagePreprocessor, PreprocessError};

/// One fitted marker candidate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerObservation {
    /// Ellipse center in frame coordinates.
    pub center: Point2<f64>,
    /// Fitted ellipse in crop coordinates.
    pub ellipse: Ellipse,
}

impl MarkerObservation {
    pub fn pixel_radius(&self) -> f64 {
        self.ellipse.radius()
    }
}

/// Copy `region` (clamped to the frame) out of `frame`.
pub fn crop(frame: &GrayImageView<'_>, region: Region) -> (Region, GrayImage) {
    let region = region.clamp_to(frame.size());
    let img = GrayImage::from_fn(region.width, region.height, |x, y| {
        let idx = (region.y + y) as usize * frame.width + (region.x + x) as usize;
        image::Luma([frame.data[idx]])
    });
    (region, img)
}

/// Preprocess → contours → ellipse fit over a frame region.
#[derive(Clone, Debug)]
pub struct MarkerDetector {
    preprocessor: ImagePreprocessor,
    extractor: ContourExtractor,
}

impl MarkerDetector {
    pub fn new(config: ProcessingConfig) -> Result<Self, PreprocessError> {
        Ok(Self {
            preprocessor: ImagePreprocessor::new(config.preprocess)?,
            extractor: ContourExtractor::new(config.contours),
        })
    }

    pub fn preprocessor(&self) -> &ImagePreprocessor {
        &self.preprocessor
    }

    pub fn extractor(&self) -> &ContourExtractor {
        &self.extractor
    }

    /// Fitted candidates inside `region`, in contour search order.
    ///
    /// An empty region (or one outside the frame) yields no observations
    /// without touching the pixels. Contours whose fit fails are skipped.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(x = region.x, y = region.y, w = region.width, h = region.height))
    )]
    pub fn observe(
        &self,
        frame: &GrayImageView<'_>,
        region: Region,
        filter: ContourFilter,
    ) -> Vec<MarkerObservation> {
        if region.is_empty() {
            return Vec::new();
        }
        let (region, mut img) = crop(frame, region);
        if region.is_empty() {
            return Vec::new();
        }
        self.preprocessor.apply(&mut img);
        let origin = region.origin();
        self.extractor
            .extract(&img, filter)
            .iter()
            .filter_map(|c| fit_ellipse(&c.points_f64()))
            .map(|ellipse| MarkerObservation {
                center: origin + ellipse.center.coords,
                ellipse,
            })
            .collect()
    }
}
