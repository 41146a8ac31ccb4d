use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Errors raised when wrapping raw frame buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid grayscale buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },
    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

impl<'a> GrayImageView<'a> {
    /// Wrap a row-major buffer, checking its length.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, FrameError> {
        let expected = width
            .checked_mul(height)
            .ok_or(FrameError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(FrameError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width as u32, self.height as u32)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }
}

#[derive(Clone, Debug)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize, fill: u8) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

/// Frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn min_side(&self) -> u32 {
        self.width.min(self.height)
    }

    /// Exact geometric center.
    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Vertical line splitting the frame into a left and a right half,
    /// on the integer pixel grid.
    pub fn midline(&self) -> u32 {
        self.width / 2
    }
}

/// Axis-aligned rectangle in frame coordinates.
///
/// A region with zero area means "no selection".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized rectangle spanned by two corner points, in either order.
    ///
    /// Negative coordinates are clamped to zero.
    pub fn from_corners(p1: (i32, i32), p2: (i32, i32)) -> Self {
        let x0 = p1.0.min(p2.0).max(0);
        let y0 = p1.1.min(p2.1).max(0);
        let x1 = p1.0.max(p2.0).max(0);
        let y1 = p1.1.max(p2.1).max(0);
        Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        }
    }

    /// Square of side `side` centered on `center`, clamped at the origin.
    pub fn centered_square(center: Point2<f64>, side: u32) -> Self {
        let half = (side / 2) as f64;
        let x = (center.x - half).max(0.0) as u32;
        let y = (center.y - half).max(0.0) as u32;
        Self::new(x, y, side, side)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Top-left corner; the offset from crop to parent coordinates.
    pub fn origin(&self) -> Point2<f64> {
        Point2::new(self.x as f64, self.y as f64)
    }

    /// Intersection with the frame. Returns an empty region when disjoint.
    pub fn clamp_to(&self, frame: FrameSize) -> Self {
        let x0 = self.x.min(frame.width);
        let y0 = self.y.min(frame.height);
        let x1 = self.x.saturating_add(self.width).min(frame.width);
        let y1 = self.y.saturating_add(self.height).min(frame.height);
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }
}
