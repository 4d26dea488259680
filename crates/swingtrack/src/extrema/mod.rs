//! Maxima and minima of an angle series.
//!
//! Raw extrema come from [`find_local_maxima`]; clusters of raw extrema
//! closer than the merge threshold are collapsed by [`merge_peaks`]. Minima
//! are the maxima of the negated series with the angle negated back.

mod find;
mod merge;

pub use find::{find_local_maxima, prominence, PeakOptions};
pub use merge::{merge_peaks, MergePolicy, Peak, RawPeak};

use crate::series::AngleSeries;

/// Merge threshold used when none is configured, in seconds.
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.25;

/// Peak detection and merging parameters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExtremaConfig {
    /// Raw peaks closer than this (seconds) to the previous one are merged.
    pub merge_threshold: f64,
    pub options: PeakOptions,
    pub policy: MergePolicy,
}

impl Default for ExtremaConfig {
    fn default() -> Self {
        Self {
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            options: PeakOptions::default(),
            policy: MergePolicy::default(),
        }
    }
}

/// Merged maxima and minima of one series, each in ascending time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extrema {
    pub maxima: Vec<Peak>,
    pub minima: Vec<Peak>,
}

impl Extrema {
    /// Both kinds interleaved by time; on equal times minima come first.
    pub fn interleaved(&self) -> Vec<Peak> {
        let mut out = Vec::with_capacity(self.maxima.len() + self.minima.len());
        let (mut i, mut j) = (0, 0);
        while i < self.minima.len() && j < self.maxima.len() {
            if self.minima[i].time < self.maxima[j].time {
                out.push(self.minima[i]);
                i += 1;
            } else {
                out.push(self.maxima[j]);
                j += 1;
            }
        }
        out.extend_from_slice(&self.minima[i..]);
        out.extend_from_slice(&self.maxima[j..]);
        out
    }
}

/// Raw maxima of `values` sampled at `times`.
pub fn raw_maxima(times: &[f64], values: &[f64], options: &PeakOptions) -> Vec<RawPeak> {
    find_local_maxima(values, options)
        .into_iter()
        .map(|i| RawPeak {
            time: times[i],
            angle: values[i],
        })
        .collect()
}

/// Raw minima of `values`; angles keep their original sign.
pub fn raw_minima(times: &[f64], values: &[f64], options: &PeakOptions) -> Vec<RawPeak> {
    let negated: Vec<f64> = values.iter().map(|v| -v).collect();
    let mut peaks = raw_maxima(times, &negated, options);
    for p in &mut peaks {
        p.angle = -p.angle;
    }
    peaks
}

/// Extracts merged extrema from angle series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExtremaExtractor {
    pub config: ExtremaConfig,
}

impl ExtremaExtractor {
    pub fn new(config: ExtremaConfig) -> Self {
        Self { config }
    }

    /// Merged maxima of `(times, values)`.
    ///
    /// The two slices must have equal length.
    pub fn maxima_of(&self, times: &[f64], values: &[f64]) -> Vec<Peak> {
        debug_assert_eq!(times.len(), values.len());
        let raw = raw_maxima(times, values, &self.config.options);
        merge_peaks(&raw, self.config.merge_threshold, self.config.policy)
    }

    /// Merged minima of `(times, values)`.
    pub fn minima_of(&self, times: &[f64], values: &[f64]) -> Vec<Peak> {
        debug_assert_eq!(times.len(), values.len());
        let negated: Vec<f64> = values.iter().map(|v| -v).collect();
        self.maxima_of(times, &negated)
            .into_iter()
            .map(|p| Peak {
                angle: -p.angle,
                ..p
            })
            .collect()
    }

    pub fn maxima(&self, series: &AngleSeries) -> Vec<Peak> {
        self.maxima_of(&series.times(), &series.angles())
    }

    pub fn minima(&self, series: &AngleSeries) -> Vec<Peak> {
        self.minima_of(&series.times(), &series.angles())
    }

    pub fn extract(&self, series: &AngleSeries) -> Extrema {
        let times = series.times();
        let angles = series.angles();
        let extrema = Extrema {
            maxima: self.maxima_of(&times, &angles),
            minima: self.minima_of(&times, &angles),
        };
        let worst = extrema
            .maxima
            .iter()
            .chain(&extrema.minima)
            .map(|p| p.time_uncertainty)
            .fold(0.0, f64::max);
        tracing::debug!(
            "{} maxima, {} minima, largest time uncertainty {:.4}s",
            extrema.maxima.len(),
            extrema.minima.len(),
            worst
        );
        extrema
    }
}
