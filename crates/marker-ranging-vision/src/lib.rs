//! Circular marker detection in a frame region.
//!
//! Design:
//! - Normalize the crop (contrast, blur, stretch) and binarize it with Otsu.
//! - Follow borders of the foreground and keep contours passing a
//!   [`ContourFilter`].
//! - Fit an ellipse to each survivor and report it in frame coordinates.

pub mod contours;
pub mod detector;
pub mod ellipse;
pub mod params;
pub mod preprocess;

pub use contours::{BoundingBox, Contour, ContourExtractor};
pub use detector::{crop, MarkerDetector, MarkerObservation};
pub use ellipse::{fit_ellipse, Ellipse, MIN_FIT_POINTS};
pub use params::{BlurFilter, ContourFilter, ContourParams, PreprocessParams, ProcessingConfig};
pub use preprocess::{ImagePreprocessor, PreprocessError};
