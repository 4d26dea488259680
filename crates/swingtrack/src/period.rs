//! Period estimation from merged extrema.
//!
//! Consecutive peaks are paired into period samples, either same-kind
//! (maximum to maximum, minimum to minimum) or across kinds with the gap
//! doubled. The run's period is the mean of its samples; how the spread of
//! the samples and the peak timing uncertainties combine into one number is
//! selected by [`UncertaintyCombination`].

use crate::data_file::DataPoint;
use crate::extrema::{Extrema, Peak};

/// How consecutive peaks are paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingPolicy {
    /// Maximum to next maximum and minimum to next minimum.
    #[default]
    FullOscillation,
    /// Every adjacent pair of the time-interleaved peaks, gap times two.
    HalfOscillation,
}

/// How the aggregate period uncertainty is formed before floors apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncertaintyCombination {
    /// Standard error of the mean of the period samples.
    #[default]
    StandardError,
    /// Largest per-sample uncertainty.
    MaxEndpoint,
    /// Standard error and largest per-sample uncertainty in quadrature.
    Quadrature,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PeriodConfig {
    pub pairing: PairingPolicy,
    pub combination: UncertaintyCombination,
    /// Lower bound on the reported uncertainty, seconds.
    pub absolute_floor: f64,
    /// Lower bound on the reported uncertainty as a fraction of the period.
    pub relative_floor: f64,
    /// Consecutive merged maxima closer than this (seconds) are rejected.
    pub min_peak_spacing: Option<f64>,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            pairing: PairingPolicy::default(),
            combination: UncertaintyCombination::default(),
            absolute_floor: 0.0,
            relative_floor: 0.0,
            min_peak_spacing: None,
        }
    }
}

/// One measured period.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PeriodSample {
    /// Time of the first peak of the pair.
    pub start_time: f64,
    pub period: f64,
    pub uncertainty: f64,
    /// Angle of the first peak of the pair.
    pub amplitude: f64,
}

/// Aggregate period of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodEstimate {
    pub period: f64,
    pub uncertainty: f64,
    pub samples: Vec<PeriodSample>,
    /// Merged peaks that took part in the pairing.
    pub n_peaks: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeriodError {
    /// Not enough merged peaks to form a single period sample.
    InsufficientPeaks { found: usize },
    /// Two consecutive maxima closer than the sanity threshold.
    AnomalousPeakSpacing {
        first: f64,
        second: f64,
        min_spacing: f64,
    },
}

impl std::fmt::Display for PeriodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientPeaks { found } => write!(
                f,
                "insufficient peaks: {} found, at least 2 of one kind are needed",
                found
            ),
            Self::AnomalousPeakSpacing {
                first,
                second,
                min_spacing,
            } => write!(
                f,
                "anomalous peak spacing: maxima at {:.4}s and {:.4}s are closer than {}s",
                first, second, min_spacing
            ),
        }
    }
}

impl std::error::Error for PeriodError {}

fn pair(a: &Peak, b: &Peak, scale: f64) -> PeriodSample {
    PeriodSample {
        start_time: a.time,
        period: (b.time - a.time) * scale,
        uncertainty: a.time_uncertainty.max(b.time_uncertainty) * scale,
        amplitude: a.angle,
    }
}

fn consecutive(peaks: &[Peak], scale: f64) -> impl Iterator<Item = PeriodSample> + '_ {
    peaks.windows(2).map(move |w| pair(&w[0], &w[1], scale))
}

/// Period samples of one run under `pairing`.
///
/// Full oscillations list the minima pairs first, then the maxima pairs.
pub fn period_samples(extrema: &Extrema, pairing: PairingPolicy) -> Vec<PeriodSample> {
    match pairing {
        PairingPolicy::FullOscillation => consecutive(&extrema.minima, 1.0)
            .chain(consecutive(&extrema.maxima, 1.0))
            .collect(),
        PairingPolicy::HalfOscillation => consecutive(&extrema.interleaved(), 2.0).collect(),
    }
}

/// `amplitude period` rows for a period-vs-amplitude data file.
///
/// Full oscillations run from the most negative amplitude to the most
/// positive: minima pairs in time order tagged with the earlier minimum, then
/// maxima pairs in reverse time order tagged with the later maximum. Half
/// oscillations are tagged as in [`period_samples`].
pub fn amplitude_period_points(extrema: &Extrema, pairing: PairingPolicy) -> Vec<DataPoint> {
    match pairing {
        PairingPolicy::FullOscillation => {
            let minima =
                consecutive(&extrema.minima, 1.0).map(|s| DataPoint::new(s.amplitude, s.period));
            let maxima = extrema
                .maxima
                .windows(2)
                .rev()
                .map(|w| DataPoint::new(w[1].angle, w[1].time - w[0].time));
            minima.chain(maxima).collect()
        }
        PairingPolicy::HalfOscillation => period_samples(extrema, pairing)
            .iter()
            .map(|s| DataPoint::new(s.amplitude, s.period))
            .collect(),
    }
}

/// Reject consecutive maxima closer than `min_spacing` seconds.
pub fn check_peak_spacing(maxima: &[Peak], min_spacing: f64) -> Result<(), PeriodError> {
    for w in maxima.windows(2) {
        if w[1].time - w[0].time < min_spacing {
            return Err(PeriodError::AnomalousPeakSpacing {
                first: w[0].time,
                second: w[1].time,
                min_spacing,
            });
        }
    }
    Ok(())
}

fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

/// Population standard deviation over `sqrt(n)`.
fn standard_error(v: &[f64]) -> f64 {
    let n = v.len() as f64;
    let m = mean(v);
    let var = v.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / n;
    (var / n).sqrt()
}

/// Pair, average and bound the uncertainty of a run's period.
pub fn estimate_period(extrema: &Extrema, config: &PeriodConfig) -> Result<PeriodEstimate, PeriodError> {
    if let Some(min_spacing) = config.min_peak_spacing {
        check_peak_spacing(&extrema.maxima, min_spacing)?;
    }

    let samples = period_samples(extrema, config.pairing);
    let n_peaks = extrema.maxima.len() + extrema.minima.len();
    if samples.is_empty() {
        return Err(PeriodError::InsufficientPeaks { found: n_peaks });
    }

    let periods: Vec<f64> = samples.iter().map(|s| s.period).collect();
    let period = mean(&periods);
    let spread = standard_error(&periods);
    let endpoint = samples.iter().map(|s| s.uncertainty).fold(0.0, f64::max);
    let combined = match config.combination {
        UncertaintyCombination::StandardError => spread,
        UncertaintyCombination::MaxEndpoint => endpoint,
        UncertaintyCombination::Quadrature => spread.hypot(endpoint),
    };
    let uncertainty = combined
        .max(config.absolute_floor)
        .max((period * config.relative_floor).abs());

    tracing::debug!(
        "period {:.5}s +/- {:.5}s from {} samples over {} peaks",
        period,
        uncertainty,
        samples.len(),
        n_peaks
    );
    Ok(PeriodEstimate {
        period,
        uncertainty,
        samples,
        n_peaks,
    })
}
