use serde::{Deserialize, Serialize};

/// Smoothing filter applied before binarization.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlurFilter {
    /// Edge-preserving; slow, runs through an auxiliary buffer.
    Bilateral,
    #[default]
    Gaussian,
    /// Normalized box (mean) filter.
    Box,
}

/// Grayscale normalization parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessParams {
    /// Multiplicative intensity gain.
    pub contrast: f32,
    /// Additive intensity offset, applied after `contrast`.
    pub brightness: f32,
    /// Blur kernel side length in pixels; odd, or 0 to disable blurring.
    pub blur_kernel_length: u32,
    pub blur_filter: BlurFilter,
    /// Color and space sigma of the bilateral filter.
    pub bilateral_sigma: f32,
    /// Value written for pixels above the Otsu level.
    pub thresh_max_val: u8,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            contrast: 1.0,
            brightness: 0.0,
            blur_kernel_length: 5,
            blur_filter: BlurFilter::Gaussian,
            bilateral_sigma: 50.0,
            thresh_max_val: 255,
        }
    }
}

/// Contour acceptance thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourParams {
    /// Minimum enclosed area (px²).
    pub min_contour_area: f64,
    /// Maximum deviation of the bounding box aspect ratio from 1.
    pub circle_aspect_threshold: f32,
}

impl Default for ContourParams {
    fn default() -> Self {
        Self {
            min_contour_area: 50.0,
            circle_aspect_threshold: 0.1,
        }
    }
}

impl ContourParams {
    /// Large search area around a centered marker.
    pub fn wide_search() -> Self {
        Self {
            min_contour_area: 500.0,
            ..Self::default()
        }
    }

    /// User-drawn selection tightly around the marker.
    pub fn tight_search() -> Self {
        Self {
            min_contour_area: 200.0,
            ..Self::default()
        }
    }
}

/// Which contours survive extraction.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourFilter {
    /// Area threshold only.
    #[default]
    Area,
    /// Area plus near-square bounding box.
    CircleLike,
    /// Area plus enough points for an ellipse fit.
    EllipseFittable,
}

/// Immutable processing configuration handed to a detector at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub preprocess: PreprocessParams,
    pub contours: ContourParams,
}

impl ProcessingConfig {
    pub fn with_contours(contours: ContourParams) -> Self {
        Self {
            contours,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: ProcessingConfig = serde_json::from_str(
            r#"{"preprocess": {"blur_filter": "box", "contrast": 1.5}, "contours": {"min_contour_area": 200}}"#,
        )
        .expect("parse");
        assert_eq!(cfg.preprocess.blur_filter, BlurFilter::Box);
        assert_eq!(cfg.preprocess.contrast, 1.5);
        assert_eq!(cfg.preprocess.blur_kernel_length, 5);
        assert_eq!(cfg.contours, ContourParams::tight_search());
    }
}
