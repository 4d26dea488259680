//! High-level tracking API.
//!
//! [`Tracker`] wraps a [`TrackerConfig`] and runs the two halves of the
//! pipeline: frames to an angle series, and an angle series to a period.
//! Create once, track many sources.

use crate::config::TrackerConfig;
use crate::extrema::{Extrema, ExtremaExtractor};
use crate::marker::ExtractConfig;
use crate::period::{estimate_period, PeriodError, PeriodEstimate};
use crate::series::{AngleSeries, FrameSource, SeriesBuilder, SeriesConfig, SeriesError, SeriesReport};

/// Extrema and period of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub extrema: Extrema,
    pub period: PeriodEstimate,
}

/// Primary tracking interface.
#[derive(Debug, Clone)]
pub struct Tracker {
    config: TrackerConfig,
    extract: ExtractConfig,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        let extract = config.extract_config();
        Self { config, extract }
    }

    /// Access the current configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Builder for frames in `[start_ms, stop_ms)`.
    pub fn series_builder(&self, start_ms: f64, stop_ms: Option<f64>) -> SeriesBuilder {
        let config = SeriesConfig {
            start_ms,
            stop_ms,
            skip_frames: self.config.skip_frames,
        };
        SeriesBuilder::new(config, self.extract.clone())
            .with_policy(self.config.policy)
            .with_diagnostics_dir(self.config.diagnostics_dir.clone())
    }

    /// Track the pendulum through `[start_ms, stop_ms)` of `source`.
    pub fn track(
        &self,
        source: &mut dyn FrameSource,
        start_ms: f64,
        stop_ms: Option<f64>,
    ) -> Result<SeriesReport, SeriesError> {
        self.series_builder(start_ms, stop_ms).build(source)
    }

    /// Merged maxima and minima.
    pub fn extrema(&self, series: &AngleSeries) -> Extrema {
        ExtremaExtractor::new(self.config.extrema).extract(series)
    }

    /// Extrema followed by the period estimate.
    pub fn analyze(&self, series: &AngleSeries) -> Result<Analysis, PeriodError> {
        let extrema = self.extrema(series);
        let period = estimate_period(&extrema, &self.config.period)?;
        Ok(Analysis { extrema, period })
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
