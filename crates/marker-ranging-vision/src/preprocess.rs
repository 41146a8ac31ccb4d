//! Grayscale normalization ahead of contour search.
//!
//! The pipeline is contrast/brightness → blur → min–max stretch → Otsu
//! binarization, all in place on one `image::GrayImage`.

use image::GrayImage;
use imageproc::contrast::{otsu_level, stretch_contrast_mut, threshold_mut, ThresholdType};
use imageproc::filter::{bilateral_filter, box_filter, gaussian_blur_f32};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::params::{BlurFilter, PreprocessParams};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum PreprocessError {
    #[error("blur kernel length must be odd or 0, got {0}")]
    EvenKernelLength(u32),
    #[error("bilateral sigma must be positive and finite, got {0}")]
    InvalidSigma(f32),
}

/// Blur kernel derived from the kernel length and filter kind.
#[derive(Clone, Copy, Debug, PartialEq)]
enum BlurKernel {
    Disabled,
    Gaussian { sigma: f32 },
    Box { radius: u32 },
    Bilateral { window: u32, sigma: f32 },
}

impl BlurKernel {
    fn build(params: &PreprocessParams) -> Result<Self, PreprocessError> {
        let k = params.blur_kernel_length;
        if k == 0 {
            return Ok(Self::Disabled);
        }
        if k % 2 == 0 {
            return Err(PreprocessError::EvenKernelLength(k));
        }
        Ok(match params.blur_filter {
            BlurFilter::Gaussian => Self::Gaussian {
                sigma: gaussian_sigma(k),
            },
            BlurFilter::Box => Self::Box { radius: k / 2 },
            BlurFilter::Bilateral => {
                let sigma = params.bilateral_sigma;
                if !(sigma.is_finite() && sigma > 0.0) {
                    return Err(PreprocessError::InvalidSigma(sigma));
                }
                Self::Bilateral { window: k, sigma }
            }
        })
    }
}

/// Gaussian sigma matching a kernel of side `k`.
pub fn gaussian_sigma(k: u32) -> f32 {
    0.3 * ((k as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Stateful preprocessor; the blur kernel is recomputed whenever its
/// parameters change.
#[derive(Clone, Debug)]
pub struct ImagePreprocessor {
    params: PreprocessParams,
    kernel: BlurKernel,
}

impl ImagePreprocessor {
    pub fn new(params: PreprocessParams) -> Result<Self, PreprocessError> {
        let kernel = BlurKernel::build(&params)?;
        Ok(Self { params, kernel })
    }

    pub fn params(&self) -> &PreprocessParams {
        &self.params
    }

    /// Change the blur kernel length. Odd values or 0 only; on error the
    /// previous kernel stays in place.
    pub fn set_blur_kernel_length(&mut self, length: u32) -> Result<(), PreprocessError> {
        let params = PreprocessParams {
            blur_kernel_length: length,
            ..self.params
        };
        self.kernel = BlurKernel::build(&params)?;
        self.params = params;
        Ok(())
    }

    pub fn set_blur_filter(&mut self, filter: BlurFilter) -> Result<(), PreprocessError> {
        let params = PreprocessParams {
            blur_filter: filter,
            ..self.params
        };
        self.kernel = BlurKernel::build(&params)?;
        self.params = params;
        Ok(())
    }

    /// Run the whole pipeline in place. Returns the Otsu level used.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, img), fields(width = img.width(), height = img.height()))
    )]
    pub fn apply(&self, img: &mut GrayImage) -> u8 {
        adjust_contrast(img, self.params.contrast, self.params.brightness);
        self.blur(img);
        stretch(img);
        binarize(img, self.params.thresh_max_val)
    }

    fn blur(&self, img: &mut GrayImage) {
        match self.kernel {
            BlurKernel::Disabled => {}
            BlurKernel::Gaussian { sigma } => *img = gaussian_blur_f32(img, sigma),
            BlurKernel::Box { radius } => *img = box_filter(img, radius, radius),
            BlurKernel::Bilateral { window, sigma } => {
                if !img.is_empty() {
                    *img = bilateral_filter(img, window, sigma, sigma);
                }
            }
        }
    }
}

/// `out = saturate(round(contrast * in + brightness))`.
pub fn adjust_contrast(img: &mut GrayImage, contrast: f32, brightness: f32) {
    if contrast == 1.0 && brightness == 0.0 {
        return;
    }
    for v in img.iter_mut() {
        *v = (contrast * *v as f32 + brightness).round().clamp(0.0, 255.0) as u8;
    }
}

/// Min–max stretch to the full `[0, 255]` range. A constant image becomes
/// all zeros.
pub fn stretch(img: &mut GrayImage) {
    let (Some(&min), Some(&max)) = (img.iter().min(), img.iter().max()) else {
        return;
    };
    if min == max {
        img.fill(0);
        return;
    }
    stretch_contrast_mut(img, min, max, 0, 255);
}

/// Otsu binarization in place: pixels strictly above the level become
/// `max_val`, the rest 0. Returns the level.
pub fn binarize(img: &mut GrayImage, max_val: u8) -> u8 {
    if img.is_empty() {
        return 0;
    }
    let level = otsu_level(img);
    threshold_mut(img, level, ThresholdType::Binary);
    if max_val != u8::MAX {
        for v in img.iter_mut().filter(|v| **v != 0) {
            *v = max_val;
        }
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn disk(w: u32, h: u32, cx: f32, cy: f32, r: f32, fg: u8, bg: u8) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let (dx, dy) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
            Luma([if dx * dx + dy * dy <= r * r { fg } else { bg }])
        })
    }

    #[test]
    fn sigma_from_kernel_length() {
        assert!((gaussian_sigma(5) - 1.1).abs() < 1e-6);
        assert!((gaussian_sigma(3) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn even_kernel_length_is_rejected_and_keeps_previous() {
        let mut p = ImagePreprocessor::new(PreprocessParams::default()).expect("defaults");
        assert_eq!(
            p.set_blur_kernel_length(4),
            Err(PreprocessError::EvenKernelLength(4))
        );
        assert_eq!(p.params().blur_kernel_length, 5);
        p.set_blur_kernel_length(7).expect("odd");
        assert_eq!(p.kernel, BlurKernel::Gaussian { sigma: gaussian_sigma(7) });
        p.set_blur_filter(BlurFilter::Box).expect("box");
        assert_eq!(p.kernel, BlurKernel::Box { radius: 3 });
        p.set_blur_kernel_length(0).expect("disable");
        assert_eq!(p.kernel, BlurKernel::Disabled);
    }

    #[test]
    fn contrast_saturates() {
        let mut img = GrayImage::from_raw(3, 1, vec![10, 100, 200]).expect("buffer");
        adjust_contrast(&mut img, 2.0, 5.0);
        assert_eq!(img.as_raw(), &vec![25, 205, 255]);
    }

    #[test]
    fn stretch_maps_to_full_range() {
        let mut img = GrayImage::from_raw(3, 1, vec![50, 75, 100]).expect("buffer");
        stretch(&mut img);
        assert_eq!(img.as_raw(), &vec![0, 127, 255]);

        let mut flat = GrayImage::from_pixel(4, 4, Luma([77]));
        stretch(&mut flat);
        assert!(flat.iter().all(|&v| v == 0));
    }

    #[test]
    fn pipeline_yields_binary_disk_for_every_filter() {
        for filter in [BlurFilter::Gaussian, BlurFilter::Box, BlurFilter::Bilateral] {
            let params = PreprocessParams {
                blur_filter: filter,
                ..PreprocessParams::default()
            };
            let pre = ImagePreprocessor::new(params).expect("params");
            let mut img = disk(40, 40, 20.0, 20.0, 10.0, 180, 60);
            pre.apply(&mut img);
            assert!(img.iter().all(|&v| v == 0 || v == 255), "{filter:?}");
            assert_eq!(img.get_pixel(20, 20).0[0], 255, "{filter:?}");
            assert_eq!(img.get_pixel(2, 2).0[0], 0, "{filter:?}");
        }
    }

    #[test]
    fn bilateral_blur_preserves_step_edge() {
        let params = PreprocessParams {
            blur_filter: BlurFilter::Bilateral,
            bilateral_sigma: 10.0,
            ..PreprocessParams::default()
        };
        let pre = ImagePreprocessor::new(params).expect("params");
        assert_eq!(pre.kernel, BlurKernel::Bilateral { window: 5, sigma: 10.0 });
        let mut img = GrayImage::from_fn(10, 4, |x, _| Luma([if x < 5 { 0 } else { 250 }]));
        pre.blur(&mut img);
        assert_eq!(img.get_pixel(4, 1).0[0], 0);
        assert_eq!(img.get_pixel(5, 1).0[0], 250);
    }

    #[test]
    fn binarize_separates_bimodal_levels() {
        let mut img = GrayImage::from_fn(20, 20, |x, y| {
            Luma([match (x < 12, (x + y) % 7 == 0) {
                (true, false) => 20,
                (true, true) => 22,
                (false, false) => 200,
                (false, true) => 198,
            }])
        });
        let level = binarize(&mut img, 200);
        assert!((22..198).contains(&level), "level {level}");
        assert_eq!(img.get_pixel(3, 3).0[0], 0);
        assert_eq!(img.get_pixel(15, 3).0[0], 200);
        assert!(img.iter().all(|&v| v == 0 || v == 200));
    }

    #[test]
    fn constant_image_binarizes_to_zero() {
        let mut img = GrayImage::from_pixel(4, 4, Luma([90]));
        stretch(&mut img);
        binarize(&mut img, 255);
        assert!(img.iter().all(|&v| v == 0));
    }
}
