//! Frame-by-frame accumulation of an [`AngleSeries`].

use std::path::PathBuf;

use super::source::FrameSource;
use super::AngleSeries;
use crate::marker::{extract_markers, ExtractConfig, MarkerError, MarkerPolicy};

/// Time range and sampling stride of one run.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SeriesConfig {
    /// First timestamp (ms) to read.
    pub start_ms: f64,
    /// Exclusive end (ms); `None` reads to end of stream.
    pub stop_ms: Option<f64>,
    /// Frames read and discarded after every processed frame.
    pub skip_frames: usize,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            start_ms: 0.0,
            stop_ms: None,
            skip_frames: 0,
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesReport {
    pub series: AngleSeries,
    /// Frames dropped because they reported a zero timestamp after the first.
    pub n_skipped_zero_time: usize,
    /// Frames with a missing marker under the lenient policy.
    pub n_incomplete: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesError {
    /// Strict policy and a marker could not be found.
    Marker { time_ms: f64, source: MarkerError },
}

impl std::fmt::Display for SeriesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Marker { time_ms, source } => {
                write!(f, "frame at {:.1} ms: {}", time_ms, source)
            }
        }
    }
}

impl std::error::Error for SeriesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Marker { source, .. } => Some(source),
        }
    }
}

/// Drives one frame source through marker extraction.
///
/// The builder borrows the source exclusively for the duration of
/// [`SeriesBuilder::build`]; it keeps no cursor of its own.
#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    pub config: SeriesConfig,
    pub extract: ExtractConfig,
    pub policy: MarkerPolicy,
    pub diagnostics_dir: PathBuf,
}

impl SeriesBuilder {
    pub fn new(config: SeriesConfig, extract: ExtractConfig) -> Self {
        Self {
            config,
            extract,
            policy: MarkerPolicy::default(),
            diagnostics_dir: PathBuf::from("."),
        }
    }

    pub fn with_policy(mut self, policy: MarkerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_diagnostics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = dir.into();
        self
    }

    /// Read frames in `[start_ms, stop_ms)` and collect `(seconds, radians)`
    /// samples.
    ///
    /// End of stream and read failures end the run normally. Under the
    /// strict policy the first frame with a missing marker aborts the run.
    pub fn build(&self, source: &mut dyn FrameSource) -> Result<SeriesReport, SeriesError> {
        let mut report = SeriesReport::default();
        let mut n_read = 0usize;
        source.seek_ms(self.config.start_ms);

        while let Some(frame) = source.read() {
            let time_ms = source.position_ms();
            if let Some(stop) = self.config.stop_ms {
                if time_ms >= stop {
                    break;
                }
            }
            n_read += 1;

            if time_ms == 0.0 && n_read > 1 {
                tracing::warn!(
                    "skipping frame {} with zero timestamp (end-of-stream artifact)",
                    n_read
                );
                report.n_skipped_zero_time += 1;
                continue;
            }

            let markers = extract_markers(&frame, &self.extract);
            match markers.resolve(self.policy, &self.diagnostics_dir) {
                Ok(Some(angle)) => {
                    let time = time_ms / 1000.0;
                    if !report.series.push(time, angle) {
                        tracing::warn!("dropping out-of-order sample at {:.1} ms", time_ms);
                    } else {
                        tracing::trace!("t={:.4}s angle={:.5}", time, angle);
                    }
                }
                Ok(None) => {
                    tracing::debug!(
                        "incomplete sample at {:.1} ms: {:?} not found",
                        time_ms,
                        markers.missing()
                    );
                    report.n_incomplete += 1;
                }
                Err(source) => return Err(SeriesError::Marker { time_ms, source }),
            }

            for _ in 0..self.config.skip_frames {
                if source.read().is_none() {
                    break;
                }
            }
        }

        tracing::info!(
            "series: {} samples from {} frames ({} zero-time, {} incomplete)",
            report.series.len(),
            n_read,
            report.n_skipped_zero_time,
            report.n_incomplete
        );
        Ok(report)
    }
}
