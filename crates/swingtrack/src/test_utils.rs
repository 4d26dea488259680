//! Shared test utilities: synthetic marker images and scratch directories.

use std::f64::consts::PI;
use std::path::PathBuf;

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::series::MemorySource;

pub(crate) const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub(crate) const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

fn in_disk(x: u32, y: u32, center: [i32; 2], radius: i32) -> bool {
    let dx = x as i64 - center[0] as i64;
    let dy = y as i64 - center[1] as i64;
    let r = radius as i64;
    dx * dx + dy * dy <= r * r
}

/// Binary mask (0/255) with one filled disk.
///
/// The disk is symmetric about `center`, so its pixel centroid is exactly
/// `center` as long as it lies fully inside the image.
pub(crate) fn draw_disk_mask(w: u32, h: u32, center: [i32; 2], radius: i32) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        if in_disk(x, y, center, radius) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Black RGB frame with solid-colored disks painted in order.
pub(crate) fn draw_disk_frame(w: u32, h: u32, disks: &[([i32; 2], i32, Rgb<u8>)]) -> RgbImage {
    let mut img = RgbImage::new(w, h);
    for &(center, radius, color) in disks {
        for y in 0..h {
            for x in 0..w {
                if in_disk(x, y, center, radius) {
                    img.put_pixel(x, y, color);
                }
            }
        }
    }
    img
}

/// Per-process scratch directory under the system temp dir (not created).
pub(crate) fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("swingtrack_{}_{}", name, std::process::id()))
}

/// Pendulum swinging with a 1 s period: the bob sits 20 px below the pivot,
/// offset sideways by `round(10·sin(2πt))` px, so the angle is monotone
/// between turning points.
pub(crate) fn swinging_source(fps: f64, seconds: f64) -> MemorySource {
    let n = (fps * seconds) as usize;
    let frames = (0..n)
        .map(|i| {
            let t = i as f64 / fps;
            let dx = (10.0 * (2.0 * PI * t).sin()).round() as i32;
            let img = draw_disk_frame(60, 50, &[([30 + dx, 30], 3, RED), ([30, 10], 2, GREEN)]);
            (i as f64 * 1000.0 / fps, img)
        })
        .collect();
    MemorySource::new(frames)
}
