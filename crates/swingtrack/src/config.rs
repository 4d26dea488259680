//! Tracker configuration.
//!
//! All fields have defaults so partial JSON files are accepted; the defaults
//! describe a red bob on a green pivot filmed at full HD and tracked at
//! roughly one third of the native resolution.

use std::path::{Path, PathBuf};

use crate::color::{HsvBound, HsvRange};
use crate::extrema::ExtremaConfig;
use crate::marker::{ExtractConfig, MarkerPolicy};
use crate::period::PeriodConfig;

const DEFAULT_SCALE: [f32; 2] = [0.35, 0.35];
const DEFAULT_SKIP_FRAMES: usize = 3;

/// Red bob; the hue range wraps through 0.
pub fn default_bob_range() -> HsvRange {
    HsvRange::new(HsvBound::new(174, 153, 100), HsvBound::new(15, 255, 255))
}

/// Green pivot.
pub fn default_pivot_range() -> HsvRange {
    HsvRange::new(HsvBound::new(60, 63, 150), HsvBound::new(80, 255, 255))
}

/// Full configuration of the tracking + analysis pipeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Independent `[fx, fy]` frame rescaling; `None` keeps native size.
    pub scale: Option<[f32; 2]>,
    /// HSV range of the bob marker.
    pub bob: HsvRange,
    /// HSV range of the pivot marker.
    pub pivot: HsvRange,
    /// Frames read and discarded after every recorded sample.
    pub skip_frames: usize,
    /// Behaviour when a marker is missing from a frame.
    pub policy: MarkerPolicy,
    /// Where failure images go in strict mode.
    pub diagnostics_dir: PathBuf,
    /// Peak detection and merging.
    pub extrema: ExtremaConfig,
    /// Period pairing and uncertainty policy.
    pub period: PeriodConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            scale: Some(DEFAULT_SCALE),
            bob: default_bob_range(),
            pivot: default_pivot_range(),
            skip_frames: DEFAULT_SKIP_FRAMES,
            policy: MarkerPolicy::default(),
            diagnostics_dir: PathBuf::from("."),
            extrema: ExtremaConfig::default(),
            period: PeriodConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Thresholds derived from the configured HSV ranges.
    pub fn extract_config(&self) -> ExtractConfig {
        ExtractConfig::new(self.scale, &self.bob, &self.pivot)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
