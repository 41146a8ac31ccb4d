#![allow(dead_code)]

use marker_ranging_core::GrayImage;

pub const BACKGROUND: u8 = 40;
pub const MARKER: u8 = 210;

/// Bright disk on a dark background; a pixel belongs to the disk when its
/// center lies inside the circle.
pub fn disk_frame(width: usize, height: usize, cx: f64, cy: f64, r: f64) -> GrayImage {
    let mut frame = GrayImage::new(width, height, BACKGROUND);
    paint_disk(&mut frame, cx, cy, r);
    frame
}

pub fn paint_disk(frame: &mut GrayImage, cx: f64, cy: f64, r: f64) {
    for y in 0..frame.height {
        for x in 0..frame.width {
            let (dx, dy) = (x as f64 + 0.5 - cx, y as f64 + 0.5 - cy);
            if dx * dx + dy * dy <= r * r {
                frame.data[y * frame.width + x] = MARKER;
            }
        }
    }
}

pub fn blank_frame(width: usize, height: usize) -> GrayImage {
    GrayImage::new(width, height, BACKGROUND)
}
