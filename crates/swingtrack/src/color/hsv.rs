//! RGB → HSV conversion in the 8-bit convention used by common vision
//! toolkits: hue in `[0, 180]` (degrees halved), saturation and value in
//! `[0, 255]`.

use image::{Rgb, RgbImage};

/// Three-channel image whose channels hold `(hue, saturation, value)`.
pub type HsvImage = image::ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Convert a single RGB pixel to 8-bit HSV.
#[inline]
pub fn rgb_pixel_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    if v == 0 {
        return [0, 0, 0];
    }
    let delta = (v - min) as f32;
    let s = (255.0 * delta / v as f32).round() as u8;
    if delta == 0.0 {
        return [0, s, v];
    }

    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let mut h = if v == r {
        60.0 * (gf - bf) / delta
    } else if v == g {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }
    let h = (h / 2.0).round().clamp(0.0, 180.0) as u8;
    [h, s, v]
}

/// Convert a whole frame to HSV once, so several thresholds can be applied
/// against the same converted buffer.
pub fn rgb_to_hsv(frame: &RgbImage) -> HsvImage {
    let (w, h) = frame.dimensions();
    let mut out = HsvImage::new(w, h);
    for (src, dst) in frame.pixels().zip(out.pixels_mut()) {
        let [r, g, b] = src.0;
        *dst = Rgb(rgb_pixel_to_hsv(r, g, b));
    }
    out
}
