//! Border-following contour extraction and filtering.

use image::GrayImage;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::ellipse::MIN_FIT_POINTS;
use crate::params::{ContourFilter, ContourParams};

/// Closed, chain-compressed pixel contour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<Point2<i32>>,
}

/// Inclusive pixel bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl Contour {
    pub fn new(points: Vec<Point2<i32>>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shoelace area; sign follows the traversal direction.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let p = self.points[i];
                let q = self.points[(i + 1) % n];
                p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64
            })
            .sum();
        twice as f64 / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.points.first()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Some(BoundingBox {
            x: x0,
            y: y0,
            width: x1 - x0 + 1,
            height: y1 - y0 + 1,
        })
    }

    pub fn points_f64(&self) -> Vec<Point2<f64>> {
        self.points
            .iter()
            .map(|p| Point2::new(p.x as f64, p.y as f64))
            .collect()
    }
}

/// Drop every point lying in the middle of a straight run of equal steps.
fn chain_compress(mut points: Vec<Point2<i32>>) -> Vec<Point2<i32>> {
    points.dedup();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    let n = points.len();
    if n < 3 {
        return points;
    }
    let kept: Vec<Point2<i32>> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            cur - prev != next - cur
        })
        .map(|i| points[i])
        .collect();
    if kept.is_empty() {
        // Every step identical: a degenerate straight loop.
        points.into_iter().take(1).collect()
    } else {
        kept
    }
}

/// Finds and filters marker candidate contours in binary images.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContourExtractor {
    params: ContourParams,
}

impl ContourExtractor {
    pub fn new(params: ContourParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ContourParams {
        &self.params
    }

    /// All borders (outer and hole) of the nonzero pixels in search order.
    pub fn find(binary: &GrayImage) -> Vec<Contour> {
        imageproc::contours::find_contours::<i32>(binary)
            .into_iter()
            .map(|c| {
                let points = c.points.into_iter().map(|p| Point2::new(p.x, p.y)).collect();
                Contour::new(chain_compress(points))
            })
            .collect()
    }

    /// Whether `contour` passes `filter` under the configured thresholds.
    pub fn accepts(&self, contour: &Contour, filter: ContourFilter) -> bool {
        if contour.area() < self.params.min_contour_area {
            return false;
        }
        match filter {
            ContourFilter::Area => true,
            ContourFilter::CircleLike => contour.bounding_box().is_some_and(|b| {
                (1.0 - b.aspect()).abs() <= self.params.circle_aspect_threshold
            }),
            ContourFilter::EllipseFittable => contour.len() >= MIN_FIT_POINTS,
        }
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, binary), fields(width = binary.width(), height = binary.height()))
    )]
    pub fn extract(&self, binary: &GrayImage, filter: ContourFilter) -> Vec<Contour> {
        let found = Self::find(binary);
        let total = found.len();
        let kept: Vec<Contour> = found
            .into_iter()
            .filter(|c| self.accepts(c, filter))
            .collect();
        log::trace!("contours: {} found, {} kept ({:?})", total, kept.len(), filter);
        kept
    }
}
