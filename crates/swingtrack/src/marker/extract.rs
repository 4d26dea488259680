//! Per-frame extraction of the bob and pivot markers.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

use super::blob::{find_blob, BlobOutcome, Centroid};
use super::diagnostics::write_failure_images;
use super::{MarkerError, MarkerKind, MarkerPolicy};
use crate::color::{rgb_to_hsv, HsvRange, Threshold};

/// Thresholds and optional rescaling applied to every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractConfig {
    /// Independent `[fx, fy]` rescaling factors applied before conversion.
    pub scale: Option<[f32; 2]>,
    pub bob: Threshold,
    pub pivot: Threshold,
}

impl ExtractConfig {
    pub fn new(scale: Option<[f32; 2]>, bob: &HsvRange, pivot: &HsvRange) -> Self {
        Self {
            scale,
            bob: Threshold::from_range(bob),
            pivot: Threshold::from_range(pivot),
        }
    }
}

/// Both marker detections for one frame, with the masks used.
#[derive(Debug, Clone)]
pub struct FrameMarkers {
    pub bob: BlobOutcome,
    pub pivot: BlobOutcome,
    pub bob_mask: GrayImage,
    pub pivot_mask: GrayImage,
    /// The rescaled RGB frame the masks were computed on.
    pub working: RgbImage,
}

impl FrameMarkers {
    /// Angle from the downward vertical, positive toward increasing x.
    ///
    /// Defined only when both markers are present.
    pub fn angle(&self) -> Option<f64> {
        let bob = self.bob.centroid()?;
        let pivot = self.pivot.centroid()?;
        Some(pendulum_angle(bob, pivot))
    }

    /// First marker that is missing, bob before pivot.
    pub fn missing(&self) -> Option<MarkerKind> {
        if !self.bob.is_found() {
            Some(MarkerKind::Bob)
        } else if !self.pivot.is_found() {
            Some(MarkerKind::Pivot)
        } else {
            None
        }
    }

    /// Apply the caller's not-found policy.
    ///
    /// Lenient: `Ok(None)` for an incomplete frame. Strict: failure images
    /// are written to `diagnostics_dir` and the error is returned.
    pub fn resolve(
        &self,
        policy: MarkerPolicy,
        diagnostics_dir: &Path,
    ) -> Result<Option<f64>, MarkerError> {
        let Some(marker) = self.missing() else {
            return Ok(self.angle());
        };
        match policy {
            MarkerPolicy::Lenient => Ok(None),
            MarkerPolicy::Strict => {
                let mask = match marker {
                    MarkerKind::Bob => &self.bob_mask,
                    MarkerKind::Pivot => &self.pivot_mask,
                };
                let diagnostics =
                    match write_failure_images(diagnostics_dir, &self.working, mask, marker) {
                        Ok(paths) => Some(paths),
                        Err(e) => {
                            tracing::warn!("failed to write failure images: {}", e);
                            None
                        }
                    };
                Err(MarkerError::NotFound {
                    marker,
                    diagnostics,
                })
            }
        }
    }
}

/// `atan2(bob.x - pivot.x, bob.y - pivot.y)` in image coordinates.
pub fn pendulum_angle(bob: Centroid, pivot: Centroid) -> f64 {
    let dx = (bob.x - pivot.x) as f64;
    let dy = (bob.y - pivot.y) as f64;
    dx.atan2(dy)
}

fn rescale(frame: &RgbImage, scale: Option<[f32; 2]>) -> RgbImage {
    let Some([fx, fy]) = scale else {
        return frame.clone();
    };
    let (w, h) = frame.dimensions();
    let nw = ((w as f32 * fx).round() as u32).max(1);
    let nh = ((h as f32 * fy).round() as u32).max(1);
    if nw == w && nh == h {
        return frame.clone();
    }
    imageops::resize(frame, nw, nh, FilterType::Triangle)
}

/// Locate the bob and pivot markers in a raw frame.
///
/// The frame is rescaled and converted to HSV once; both detections run
/// against that buffer and do not depend on each other.
pub fn extract_markers(frame: &RgbImage, config: &ExtractConfig) -> FrameMarkers {
    let working = rescale(frame, config.scale);
    let hsv = rgb_to_hsv(&working);
    let (bob, bob_mask) = find_blob(&hsv, &config.bob);
    let (pivot, pivot_mask) = find_blob(&hsv, &config.pivot);
    tracing::trace!(
        "markers: bob={:?} pivot={:?}",
        bob.centroid(),
        pivot.centroid()
    );
    FrameMarkers {
        bob,
        pivot,
        bob_mask,
        pivot_mask,
        working,
    }
}
