//! Failure artifacts written when a marker is lost in strict mode.
//!
//! File names are fixed so that debugging scripts can rely on them.

use std::path::{Path, PathBuf};

use image::{GrayImage, ImageError, RgbImage};

use super::MarkerKind;

/// Working (rescaled) frame that failed.
pub const FAILURE_IMAGE: &str = "failure_img.png";
/// Bob mask of the failed frame.
pub const FAILURE_BINARY: &str = "failure_binary.png";
/// Pivot mask of the failed frame.
pub const FAILURE_PIVOT_BINARY: &str = "failure_pivot_binary.png";

/// Paths of the two images persisted for one failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticPaths {
    pub image: PathBuf,
    pub mask: PathBuf,
}

/// Mask file name used for a given marker.
pub fn mask_file_name(marker: MarkerKind) -> &'static str {
    match marker {
        MarkerKind::Bob => FAILURE_BINARY,
        MarkerKind::Pivot => FAILURE_PIVOT_BINARY,
    }
}

/// Persist the frame and the mask of the marker that was not found.
pub fn write_failure_images(
    dir: &Path,
    frame: &RgbImage,
    mask: &GrayImage,
    marker: MarkerKind,
) -> Result<DiagnosticPaths, ImageError> {
    std::fs::create_dir_all(dir)?;
    let paths = DiagnosticPaths {
        image: dir.join(FAILURE_IMAGE),
        mask: dir.join(mask_file_name(marker)),
    };
    frame.save(&paths.image)?;
    mask.save(&paths.mask)?;
    Ok(paths)
}
