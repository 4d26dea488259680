//! Batch period extraction.
//!
//! An experiment file lists trials, each a time range of a recording taken
//! at one value of the independent variable (release angle, string length,
//! ...). Every trial is tracked and analyzed on its own and contributes one
//! `x period x_unc period_unc` row to the output data file.
//!
//! Experiment JSON follows a versioned schema (`swingtrack.experiment.v1`):
//!
//! ```json
//! {
//!   "schema": "swingtrack.experiment.v1",
//!   "fps": 30,
//!   "frames": "clips/run1",
//!   "x_start": 10, "x_step": 5,
//!   "uncertainty": { "x_abs": 0.5, "y_rel": 0.002 },
//!   "trials": [
//!     { "range": "2s-14s" },
//!     { "x": 40, "range": "450f-900f", "frames": "clips/run2" }
//!   ]
//! }
//! ```
//!
//! Trials without an `x` take the next auto-step value. Relative frame
//! directories resolve against the experiment file's directory.

use std::path::{Path, PathBuf};

use crate::config::TrackerConfig;
use crate::data_file::DataPoint;
use crate::period::PeriodError;
use crate::series::{FrameSource, ImageSequenceSource, SeriesError};
use crate::timing::{parse_time_range, TimeParseError, DEFAULT_FRAME_RATE};
use crate::tracker::{Analysis, Tracker};
use crate::uncertainty::UncertaintyFloors;

pub const EXPERIMENT_SCHEMA_V1: &str = "swingtrack.experiment.v1";

fn default_fps() -> f64 {
    DEFAULT_FRAME_RATE
}

/// One clip of the recording.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrialSpec {
    /// Independent variable; `None` takes the next auto-step value.
    #[serde(default)]
    pub x: Option<f64>,
    /// `start-stop` in time tokens.
    pub range: String,
    /// Frame directory overriding the experiment-wide one.
    #[serde(default)]
    pub frames: Option<PathBuf>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    pub schema: String,
    /// Frame rate of the recording; also resolves `f` time tokens.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Default frame directory for all trials.
    #[serde(default)]
    pub frames: Option<PathBuf>,
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// First auto-step x value.
    #[serde(default)]
    pub x_start: f64,
    /// Increment after each auto-step trial.
    #[serde(default)]
    pub x_step: f64,
    /// Subtracted from every x before negation.
    #[serde(default)]
    pub x_offset: f64,
    #[serde(default)]
    pub x_negate: bool,
    /// Floors for the x uncertainty and the period uncertainty.
    #[serde(default)]
    pub uncertainty: UncertaintyFloors,
    pub trials: Vec<TrialSpec>,
}

impl ExperimentConfig {
    /// Empty experiment with defaults.
    pub fn new() -> Self {
        Self {
            schema: EXPERIMENT_SCHEMA_V1.to_string(),
            fps: DEFAULT_FRAME_RATE,
            frames: None,
            tracker: TrackerConfig::default(),
            x_start: 0.0,
            x_step: 0.0,
            x_offset: 0.0,
            x_negate: false,
            uncertainty: UncertaintyFloors::default(),
            trials: Vec::new(),
        }
    }

    /// Parse and validate experiment JSON; paths are left as written.
    pub fn from_json_str(data: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Load an experiment file and resolve relative frame directories
    /// against its directory.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        let mut config = Self::from_json_str(&data)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.schema != EXPERIMENT_SCHEMA_V1 {
            return Err(format!(
                "unsupported experiment schema '{}' (expected '{}')",
                self.schema, EXPERIMENT_SCHEMA_V1
            ));
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err("fps must be finite and > 0".to_string());
        }
        Ok(())
    }

    /// Prefix relative frame directories with `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(p) = self.frames.as_mut() {
            resolve(p);
        }
        for trial in &mut self.trials {
            if let Some(p) = trial.frames.as_mut() {
                resolve(p);
            }
        }
    }

    /// Run every trial over still-frame directories on disk.
    pub fn run(&self) -> ExperimentReport {
        let fps = self.fps;
        run_experiment(self, |dir| {
            let source = ImageSequenceSource::open(dir, fps)?;
            Ok(Box::new(source) as Box<dyn FrameSource>)
        })
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a trial produced no data row.
#[derive(Debug)]
pub enum TrialError {
    Time(TimeParseError),
    /// Neither the trial nor the experiment names a frame directory.
    NoFrames,
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    Series(SeriesError),
    Period(PeriodError),
}

impl std::fmt::Display for TrialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Time(e) => write!(f, "{}", e),
            Self::NoFrames => write!(f, "no frame directory given for trial"),
            Self::Open { path, source } => {
                write!(f, "cannot open frames at {}: {}", path.display(), source)
            }
            Self::Series(e) => write!(f, "{}", e),
            Self::Period(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for TrialError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Time(e) => Some(e),
            Self::NoFrames => None,
            Self::Open { source, .. } => Some(source),
            Self::Series(e) => Some(e),
            Self::Period(e) => Some(e),
        }
    }
}

impl From<TimeParseError> for TrialError {
    fn from(e: TimeParseError) -> Self {
        Self::Time(e)
    }
}

impl From<SeriesError> for TrialError {
    fn from(e: SeriesError) -> Self {
        Self::Series(e)
    }
}

impl From<PeriodError> for TrialError {
    fn from(e: PeriodError) -> Self {
        Self::Period(e)
    }
}

/// A trial that was logged and left out.
#[derive(Debug)]
pub struct SkippedTrial {
    /// Position in the experiment's trial list.
    pub index: usize,
    pub range: String,
    pub error: TrialError,
}

#[derive(Debug, Default)]
pub struct ExperimentReport {
    /// One `x period x_unc period_unc` row per successful trial.
    pub points: Vec<DataPoint>,
    pub skipped: Vec<SkippedTrial>,
}

/// Largest relative timing uncertainty over the merged peaks.
fn relative_timing_uncertainty(analysis: &Analysis) -> f64 {
    analysis
        .extrema
        .maxima
        .iter()
        .chain(&analysis.extrema.minima)
        .filter(|p| p.time > 0.0)
        .map(|p| p.time_uncertainty / p.time)
        .fold(0.0, f64::max)
}

fn run_trial(
    config: &ExperimentConfig,
    tracker: &Tracker,
    trial: &TrialSpec,
    x: f64,
    open: &mut dyn FnMut(&Path) -> std::io::Result<Box<dyn FrameSource>>,
) -> Result<DataPoint, TrialError> {
    let (start_ms, stop_ms) = parse_time_range(&trial.range, config.fps)?;
    let dir = trial
        .frames
        .as_deref()
        .or(config.frames.as_deref())
        .ok_or(TrialError::NoFrames)?;
    let mut source = open(dir).map_err(|source| TrialError::Open {
        path: dir.to_path_buf(),
        source,
    })?;

    tracing::info!("processing x={}, range {}ms to {}ms", x, start_ms, stop_ms);
    let report = tracker.track(source.as_mut(), start_ms, Some(stop_ms))?;
    let analysis = tracker.analyze(&report.series)?;
    let period = analysis.period.period;
    tracing::info!(
        "averaged {} peaks for a period of {}s",
        analysis.period.n_peaks,
        period
    );

    let (x_unc, y_floor) = config.uncertainty.pair(x, period);
    let period_unc = analysis
        .period
        .uncertainty
        .max(y_floor)
        .max((period * relative_timing_uncertainty(&analysis)).abs());
    Ok(DataPoint::with_uncertainties(x, period, x_unc, period_unc))
}

/// Track and analyze every trial.
///
/// `open` yields a frame source for a trial's frame directory. Failing
/// trials are logged and reported in [`ExperimentReport::skipped`]; the
/// auto-step x still advances past them.
pub fn run_experiment<F>(config: &ExperimentConfig, mut open: F) -> ExperimentReport
where
    F: FnMut(&Path) -> std::io::Result<Box<dyn FrameSource>>,
{
    let tracker = Tracker::new(config.tracker.clone());
    let mut report = ExperimentReport::default();
    let mut next_x = config.x_start;

    for (index, trial) in config.trials.iter().enumerate() {
        let raw_x = match trial.x {
            Some(x) => x,
            None => {
                let x = next_x;
                next_x += config.x_step;
                x
            }
        };
        let shifted = raw_x - config.x_offset;
        let x = if config.x_negate { -shifted } else { shifted };

        match run_trial(config, &tracker, trial, x, &mut open) {
            Ok(point) => report.points.push(point),
            Err(error) => {
                tracing::warn!("skipping trial {} ({}): {}", index, trial.range, error);
                report.skipped.push(SkippedTrial {
                    index,
                    range: trial.range.clone(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        "experiment: {} trials, {} data points, {} skipped",
        config.trials.len(),
        report.points.len(),
        report.skipped.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{swinging_source, temp_dir};
    use approx::assert_relative_eq;

    fn trial(x: Option<f64>, range: &str) -> TrialSpec {
        TrialSpec {
            x,
            range: range.to_string(),
            frames: None,
        }
    }

    fn experiment(trials: Vec<TrialSpec>) -> ExperimentConfig {
        ExperimentConfig {
            frames: Some(PathBuf::from("clips")),
            tracker: TrackerConfig {
                scale: None,
                skip_frames: 0,
                ..Default::default()
            },
            x_start: 10.0,
            x_step: 5.0,
            x_offset: 1.0,
            x_negate: true,
            uncertainty: UncertaintyFloors {
                x_abs: 0.5,
                y_abs: 0.01,
                ..Default::default()
            },
            trials,
            ..ExperimentConfig::new()
        }
    }

    fn open_swing(dir: &Path) -> std::io::Result<Box<dyn FrameSource>> {
        assert_eq!(dir, Path::new("clips"));
        Ok(Box::new(swinging_source(30.0, 4.0)))
    }

    #[test]
    fn trials_produce_period_rows_and_failures_are_skipped() {
        let config = experiment(vec![
            trial(None, "0s-4s"),
            trial(Some(3.0), "0s-500ms"),
            trial(None, "0f-120f"),
        ]);
        let report = run_experiment(&config, open_swing);

        assert_eq!(report.points.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert!(matches!(
            report.skipped[0].error,
            TrialError::Period(PeriodError::InsufficientPeaks { .. })
        ));

        let first = report.points[0];
        assert_relative_eq!(first.x, -9.0);
        assert_relative_eq!(first.y, 1.0, epsilon = 1e-9);
        assert_eq!(first.x_unc, Some(0.5));
        assert_relative_eq!(first.y_unc.unwrap_or(0.0), 0.01);
        assert_relative_eq!(report.points[1].x, -14.0);
    }

    #[test]
    fn missing_frames_and_bad_ranges_are_trial_errors() {
        let mut config = experiment(vec![trial(None, "4s-1s"), trial(None, "0s-4s")]);
        config.frames = None;
        let report = run_experiment(&config, open_swing);
        assert!(report.points.is_empty());
        assert!(matches!(report.skipped[0].error, TrialError::Time(_)));
        assert!(matches!(report.skipped[1].error, TrialError::NoFrames));
    }

    #[test]
    fn open_failure_is_reported() {
        let config = experiment(vec![trial(None, "0s-4s")]);
        let report = run_experiment(&config, |_| {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
        });
        assert!(matches!(report.skipped[0].error, TrialError::Open { .. }));
    }

    #[test]
    fn schema_is_checked() {
        let raw = r#"{ "schema": "swingtrack.experiment.v0", "trials": [] }"#;
        let err = ExperimentConfig::from_json_str(raw).expect_err("old schema");
        assert!(err.to_string().contains("unsupported experiment schema"));

        let raw = r#"{ "schema": "swingtrack.experiment.v1", "trials": [], "video": "a.mp4" }"#;
        assert!(ExperimentConfig::from_json_str(raw).is_err());
    }

    #[test]
    fn file_paths_resolve_against_config_dir() {
        let dir = temp_dir("experiment");
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("exp.json");
        let raw = r#"{
            "schema": "swingtrack.experiment.v1",
            "fps": 60,
            "frames": "clips",
            "trials": [
                { "range": "1s-2s" },
                { "x": 2.5, "range": "3s-4s", "frames": "/abs/clips" }
            ]
        }"#;
        std::fs::write(&path, raw).expect("write");
        let config = ExperimentConfig::from_json_file(&path).expect("config");
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(config.fps, 60.0);
        assert_eq!(config.frames, Some(dir.join("clips")));
        assert_eq!(config.trials[0].x, None);
        assert_eq!(config.trials[1].frames, Some(PathBuf::from("/abs/clips")));
        assert_eq!(config.tracker.skip_frames, 3);
    }
}
