//! Quality factor by counting oscillations.
//!
//! An oscillator with quality factor `Q` loses a factor `e^(-π/D)` of its
//! amplitude after `Q/D` oscillations. Counting the oscillations until the
//! first raw extremum at or below that fraction of the initial angle gives
//! `Q` without any curve fitting.

use crate::extrema::{raw_maxima, raw_minima, PeakOptions, RawPeak};
use crate::period::PeriodError;
use crate::series::AngleSeries;

/// Divisor used when none is given.
pub const DEFAULT_Q_DIVISOR: f64 = 3.0;

/// Consecutive raw maxima closer than this (seconds) indicate a spurious
/// double detection.
pub const MIN_RAW_PEAK_SPACING: f64 = 0.5;

/// Result of an oscillation count.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QCount {
    pub q: f64,
    /// Oscillations counted, in half steps.
    pub oscillations: f64,
    /// The extremum where counting stopped.
    pub time: f64,
    pub angle: f64,
    /// Amplitude the extremum had to reach.
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QCountError {
    EmptySeries,
    InvalidDivisor(f64),
    Spacing(PeriodError),
    /// No extremum decayed to the threshold within the series.
    NoQualifyingPeak { threshold: f64 },
}

impl std::fmt::Display for QCountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySeries => write!(f, "angle series is empty"),
            Self::InvalidDivisor(d) => write!(f, "Q divisor must be positive, got {}", d),
            Self::Spacing(e) => write!(f, "{}", e),
            Self::NoQualifyingPeak { threshold } => write!(
                f,
                "no peak found with amplitude <= {}; try adjusting the Q divisor",
                threshold
            ),
        }
    }
}

impl std::error::Error for QCountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spacing(e) => Some(e),
            _ => None,
        }
    }
}

fn check_raw_spacing(maxima: &[RawPeak]) -> Result<(), PeriodError> {
    for w in maxima.windows(2) {
        if w[1].time - w[0].time < MIN_RAW_PEAK_SPACING {
            return Err(PeriodError::AnomalousPeakSpacing {
                first: w[0].time,
                second: w[1].time,
                min_spacing: MIN_RAW_PEAK_SPACING,
            });
        }
    }
    Ok(())
}

/// Count oscillations until the amplitude falls to `e^(-π/divisor)` of the
/// first sample's, and return `Q = count · divisor`.
///
/// An extremum of the same sign as the first sample completes a whole
/// oscillation; one of the opposite sign completes a half. When the i-th
/// maximum and i-th minimum both qualify, the larger of the two wins.
pub fn count_quality_factor(series: &AngleSeries, divisor: f64) -> Result<QCount, QCountError> {
    if !(divisor.is_finite() && divisor > 0.0) {
        return Err(QCountError::InvalidDivisor(divisor));
    }
    let first = series.samples().first().ok_or(QCountError::EmptySeries)?;
    let threshold = (-std::f64::consts::PI / divisor).exp() * first.angle.abs();

    let times = series.times();
    let angles = series.angles();
    let options = PeakOptions::default();
    let maxima = raw_maxima(&times, &angles, &options);
    let minima = raw_minima(&times, &angles, &options);
    check_raw_spacing(&maxima).map_err(QCountError::Spacing)?;

    let started_positive = first.angle > 0.0;
    let started_negative = first.angle < 0.0;
    for (i, (max, min)) in maxima.iter().zip(&minima).enumerate() {
        let max_diff = threshold - max.angle.abs();
        let min_diff = threshold - min.angle.abs();
        let pick_max = match (max_diff >= 0.0, min_diff >= 0.0) {
            (true, true) => max_diff < min_diff,
            (true, false) => true,
            (false, true) => false,
            (false, false) => continue,
        };
        let (peak, same_sign) = if pick_max {
            (max, started_positive)
        } else {
            (min, started_negative)
        };
        let oscillations = i as f64 + if same_sign { 1.0 } else { 0.5 };
        tracing::info!(
            "found peak: t={} angle={} after {} oscillations",
            peak.time,
            peak.angle,
            oscillations
        );
        return Ok(QCount {
            q: oscillations * divisor,
            oscillations,
            time: peak.time,
            angle: peak.angle,
            threshold,
        });
    }
    Err(QCountError::NoQualifyingPeak { threshold })
}
