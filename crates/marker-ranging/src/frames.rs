//! `image` crate adapters.

use std::path::{Path, PathBuf};

use marker_ranging_core::{GrayImageView, Region};
use marker_ranging_vision::{
    ContourFilter, MarkerDetector, MarkerObservation, PreprocessError, ProcessingConfig,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum FrameLoadError {
    #[error("failed to load frame {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Convert an `image::GrayImage` into the lightweight core view type.
pub fn gray_view(img: &image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Load any supported image file as 8-bit luma.
pub fn load_gray(path: impl AsRef<Path>) -> Result<image::GrayImage, FrameLoadError> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|source| FrameLoadError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_luma8())
}

/// Run the marker pipeline once over `region` of `img`.
///
/// `None` searches the whole image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, config), fields(width = img.width(), height = img.height()))
)]
pub fn detect_markers(
    img: &image::GrayImage,
    region: Option<Region>,
    filter: ContourFilter,
    config: ProcessingConfig,
) -> Result<Vec<MarkerObservation>, PreprocessError> {
    let detector = MarkerDetector::new(config)?;
    let view = gray_view(img);
    let region = region.unwrap_or_else(|| Region::new(0, 0, img.width(), img.height()));
    Ok(detector.observe(&view, region, filter))
}
