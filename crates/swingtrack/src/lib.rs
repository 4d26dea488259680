//! swingtrack — pendulum tracking from video frames and oscillation analysis.
//!
//! A colored bob and a differently colored pivot are located in every frame;
//! the angle of the bob from the downward vertical becomes a time series
//! that is reduced to periods, or fitted to a damped oscillation. The
//! stages are:
//!
//! 1. **Color** – RGB→HSV conversion and (hue-wrapping) HSV thresholds.
//! 2. **Marker** – largest 8-connected blob per marker, pendulum angle.
//! 3. **Series** – frame source traversal into an angle time series.
//! 4. **Extrema** – local maxima/minima, merged when closer than a threshold.
//! 5. **Period** – pairing of merged peaks into period samples and an
//!    aggregate period with uncertainty.
//! 6. **Fit** – least-squares and orthogonal-distance fits of decay, length
//!    and polynomial models; quality factor from the decay fit.
//!
//! # Public API
//! - [`Tracker`] and [`TrackerConfig`] as primary entry points
//! - [`ExperimentConfig`] for batch period extraction over many clips
//! - [`fit::fit`] with the models in [`fit`] for curve fitting
//! - [`SpringCorrection`] for period-vs-mass data taken on a spring
//! - stage modules for finer control

pub mod color;
pub mod config;
pub mod data_file;
pub mod experiment;
pub mod extrema;
pub mod fit;
pub mod marker;
pub mod period;
pub mod qcount;
pub mod series;
pub mod spring;
pub mod timing;
pub mod tracker;
pub mod uncertainty;

#[cfg(test)]
pub(crate) mod test_utils;

pub use color::{HsvBound, HsvRange, Threshold};
pub use config::TrackerConfig;
pub use data_file::{DataFileError, DataPoint};
pub use experiment::{run_experiment, ExperimentConfig, ExperimentReport, TrialError};
pub use extrema::{Extrema, ExtremaConfig, ExtremaExtractor, MergePolicy, Peak, PeakOptions};
pub use fit::{FitData, FitError, FitMode, FitResult, QualityFactor, SolverOptions};
pub use marker::{extract_markers, ExtractConfig, FrameMarkers, MarkerError, MarkerKind, MarkerPolicy};
pub use period::{
    amplitude_period_points, estimate_period, PairingPolicy, PeriodConfig, PeriodError,
    PeriodEstimate, PeriodSample, UncertaintyCombination,
};
pub use qcount::{count_quality_factor, QCount, QCountError};
pub use series::{
    AngleSample, AngleSeries, AngleUnit, FrameSource, ImageSequenceSource, MemorySource,
    SeriesBuilder, SeriesConfig, SeriesError, SeriesReport, TimeUnit,
};
pub use spring::SpringCorrection;
pub use tracker::{Analysis, Tracker};
pub use uncertainty::UncertaintyFloors;
