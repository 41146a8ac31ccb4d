#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Bright disk on a dark background.
pub fn disk_png(dir: &Path, name: &str, w: u32, h: u32, cx: f32, cy: f32, r: f32) -> PathBuf {
    let img = image::GrayImage::from_fn(w, h, |x, y| {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        if dx * dx + dy * dy <= r * r {
            image::Luma([210])
        } else {
            image::Luma([40])
        }
    });
    let path = dir.join(name);
    img.save(&path).expect("write png");
    path
}

pub fn write_json(dir: &Path, name: &str, value: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).expect("json")).expect("write json");
    path
}
