//! Largest-blob localisation in a binary mask.
//!
//! Foreground regions are 8-connected components of the mask. The region
//! with the largest pixel mass wins and its centroid is taken from the
//! first-order spatial moments.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::color::{HsvImage, Threshold};

/// Mask value used for foreground pixels.
pub const MASK_ON: u8 = 255;

/// Integer pixel coordinate of a blob centroid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Centroid {
    pub x: i32,
    pub y: i32,
}

impl Centroid {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The selected region of a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blob {
    pub centroid: Centroid,
    /// Zeroth moment (pixel count) of the region.
    pub area: u32,
}

/// Result of a blob search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobOutcome {
    Found(Blob),
    NotFound,
}

impl BlobOutcome {
    pub fn centroid(&self) -> Option<Centroid> {
        match self {
            Self::Found(blob) => Some(blob.centroid),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Raw image moments of one labelled region.
#[derive(Debug, Clone, Copy, Default)]
struct RegionMoments {
    m00: u64,
    m10: u64,
    m01: u64,
    /// Raster index of the first pixel seen; breaks area ties.
    first_seen: usize,
}

impl RegionMoments {
    fn centroid(&self) -> Option<Centroid> {
        if self.m00 == 0 {
            return None;
        }
        let x = i32::try_from(self.m10 / self.m00).ok()?;
        let y = i32::try_from(self.m01 / self.m00).ok()?;
        Some(Centroid::new(x, y))
    }
}

/// Binary mask of the pixels that fall inside `threshold`.
pub fn threshold_mask(hsv: &HsvImage, threshold: &Threshold) -> GrayImage {
    let (w, h) = hsv.dimensions();
    let mut mask = GrayImage::new(w, h);
    for (src, dst) in hsv.pixels().zip(mask.pixels_mut()) {
        let [hh, s, v] = src.0;
        if threshold.contains(hh, s, v) {
            *dst = Luma([MASK_ON]);
        }
    }
    mask
}

/// Locate the largest foreground region of `mask` and return its centroid.
///
/// Returns [`BlobOutcome::NotFound`] when the mask has no foreground pixels
/// or when the selected region has zero mass.
pub fn locate_blob(mask: &GrayImage) -> BlobOutcome {
    let (w, h) = mask.dimensions();
    if w == 0 || h == 0 || mask.as_raw().iter().all(|&p| p == 0) {
        return BlobOutcome::NotFound;
    }

    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let mut regions: Vec<RegionMoments> = Vec::new();
    for (idx, (x, y, label)) in labels.enumerate_pixels().enumerate() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if regions.len() <= label {
            regions.resize(label + 1, RegionMoments::default());
        }
        let region = &mut regions[label];
        if region.m00 == 0 {
            region.first_seen = idx;
        }
        region.m00 += 1;
        region.m10 += x as u64;
        region.m01 += y as u64;
    }

    let best = regions
        .iter()
        .filter(|r| r.m00 > 0)
        .max_by(|a, b| {
            a.m00
                .cmp(&b.m00)
                .then_with(|| b.first_seen.cmp(&a.first_seen))
        });

    let Some(best) = best else {
        return BlobOutcome::NotFound;
    };
    match best.centroid() {
        Some(centroid) => BlobOutcome::Found(Blob {
            centroid,
            area: best.m00.min(u32::MAX as u64) as u32,
        }),
        None => BlobOutcome::NotFound,
    }
}

/// Threshold an HSV frame and locate the largest blob in one call.
///
/// The mask is returned alongside the outcome for diagnostics.
pub fn find_blob(hsv: &HsvImage, threshold: &Threshold) -> (BlobOutcome, GrayImage) {
    let mask = threshold_mask(hsv, threshold);
    let outcome = locate_blob(&mask);
    (outcome, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::draw_disk_mask;

    #[test]
    fn empty_mask_is_not_found() {
        let mask = GrayImage::new(32, 24);
        assert_eq!(locate_blob(&mask), BlobOutcome::NotFound);
    }

    #[test]
    fn zero_sized_mask_is_not_found() {
        let mask = GrayImage::new(0, 0);
        assert_eq!(locate_blob(&mask), BlobOutcome::NotFound);
    }

    #[test]
    fn single_pixel_returns_its_coordinate() {
        let mut mask = GrayImage::new(20, 20);
        mask.put_pixel(7, 13, Luma([MASK_ON]));
        let outcome = locate_blob(&mask);
        assert_eq!(
            outcome,
            BlobOutcome::Found(Blob {
                centroid: Centroid::new(7, 13),
                area: 1,
            })
        );
    }

    #[test]
    fn disk_centroid_is_its_center() {
        let mask = draw_disk_mask(64, 48, [30, 20], 6);
        assert_eq!(locate_blob(&mask).centroid(), Some(Centroid::new(30, 20)));
    }

    #[test]
    fn largest_region_wins() {
        let mut mask = draw_disk_mask(80, 80, [60, 60], 8);
        let small = draw_disk_mask(80, 80, [12, 12], 3);
        for (dst, src) in mask.pixels_mut().zip(small.pixels()) {
            dst[0] = dst[0].max(src[0]);
        }
        let outcome = locate_blob(&mask);
        assert_eq!(outcome.centroid(), Some(Centroid::new(60, 60)));
    }

    #[test]
    fn diagonal_neighbours_form_one_region() {
        let mut mask = GrayImage::new(10, 10);
        for i in 2..6 {
            mask.put_pixel(i, i, Luma([MASK_ON]));
        }
        match locate_blob(&mask) {
            BlobOutcome::Found(blob) => {
                assert_eq!(blob.area, 4);
                assert_eq!(blob.centroid, Centroid::new(3, 3));
            }
            BlobOutcome::NotFound => panic!("diagonal run should be found"),
        }
    }

    #[test]
    fn equal_areas_prefer_first_in_raster_order() {
        let mut mask = GrayImage::new(20, 20);
        mask.put_pixel(15, 2, Luma([MASK_ON]));
        mask.put_pixel(3, 10, Luma([MASK_ON]));
        assert_eq!(locate_blob(&mask).centroid(), Some(Centroid::new(15, 2)));
    }
}
