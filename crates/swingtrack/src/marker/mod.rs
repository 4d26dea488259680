//! Color-marker detection: the bob and the pivot are each a solid-colored
//! patch, located as the centroid of the largest matching blob.

pub mod blob;
pub mod diagnostics;
pub mod extract;

pub use blob::{find_blob, locate_blob, threshold_mask, Blob, BlobOutcome, Centroid};
pub use diagnostics::DiagnosticPaths;
pub use extract::{extract_markers, pendulum_angle, ExtractConfig, FrameMarkers};

/// Which of the two markers a detection refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Bob,
    Pivot,
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bob => write!(f, "bob"),
            Self::Pivot => write!(f, "pivot"),
        }
    }
}

/// What to do when a marker is absent from a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerPolicy {
    /// Abort the run after writing failure images.
    #[default]
    Strict,
    /// Drop the sample and keep going.
    Lenient,
}

/// Marker detection failure under [`MarkerPolicy::Strict`].
///
/// Zero-mass regions are reported the same way as absent ones.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerError {
    NotFound {
        marker: MarkerKind,
        /// Failure images, when they could be written.
        diagnostics: Option<DiagnosticPaths>,
    },
}

impl std::fmt::Display for MarkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound {
                marker,
                diagnostics: Some(paths),
            } => write!(
                f,
                "{} not found in image; failure images written to {} and {}",
                marker,
                paths.image.display(),
                paths.mask.display()
            ),
            Self::NotFound {
                marker,
                diagnostics: None,
            } => write!(f, "{} not found in image", marker),
        }
    }
}

impl std::error::Error for MarkerError {}
