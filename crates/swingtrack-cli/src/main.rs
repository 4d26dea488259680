//! swingtrack CLI — pendulum tracking and oscillation analysis.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use swingtrack::data_file::{load_points, save_points};
use swingtrack::extrema::DEFAULT_MERGE_THRESHOLD;
use swingtrack::fit::{
    fit, DampedCosine, DampedCosineNoPhase, FitData, FitMode, FitResult, Model, Polynomial,
    PowerLaw, QualityFactor, SolverOptions, MAX_POLYNOMIAL_DEGREE,
};
use swingtrack::period::{amplitude_period_points, PairingPolicy};
use swingtrack::qcount::{count_quality_factor, DEFAULT_Q_DIVISOR};
use swingtrack::timing::DEFAULT_FRAME_RATE;
use swingtrack::{
    AngleSeries, AngleUnit, ExperimentConfig, ExtremaConfig, ExtremaExtractor,
    ImageSequenceSource, MarkerPolicy, SpringCorrection, TimeUnit, Tracker, TrackerConfig,
    UncertaintyFloors,
};
use swingtrack::spring::DEFAULT_GRAVITY;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "swingtrack")]
#[command(about = "Track a pendulum in video frames and analyze its oscillation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track the bob and pivot through a frame directory and write the angle series.
    Track(TrackArgs),

    /// Merge extrema of an angle series and write amplitude/period rows.
    Extrema(ExtremaArgs),

    /// Run a batch experiment file and write x/period rows.
    Periods {
        /// Experiment JSON (schema swingtrack.experiment.v1).
        experiment: PathBuf,
        /// Output data file.
        out: PathBuf,
    },

    /// Fit a damped cosine to an angle series and report Q.
    FitDecay(FitDecayArgs),

    /// Fit T = k·(L + L0)^n to period-vs-length data.
    FitLength(FitLengthArgs),

    /// Fit a power series in the amplitude to period-vs-amplitude data.
    FitPoly(FitPolyArgs),

    /// Assign uncertainty columns to a data file.
    Uncert(UncertArgs),

    /// Remove spring stretch from period-vs-mass data.
    CorrectPeriod(CorrectPeriodArgs),

    /// Estimate Q by counting oscillations until the amplitude decays.
    FindQ {
        /// Angle series file.
        input: PathBuf,
        /// Amplitude must fall to e^(-π/D) of the initial angle.
        #[arg(long, default_value_t = DEFAULT_Q_DIVISOR)]
        divisor: f64,
    },
}

#[derive(Debug, Clone, Args)]
struct TrackArgs {
    /// Directory of numbered still frames.
    #[arg(long)]
    frames: PathBuf,

    /// Frame rate of the recording.
    #[arg(long, default_value_t = DEFAULT_FRAME_RATE)]
    fps: f64,

    /// Path to write the angle series.
    #[arg(long)]
    out: PathBuf,

    /// Tracker configuration (JSON). Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// First timestamp to process (ms).
    #[arg(long, default_value_t = 0.0)]
    start_ms: f64,

    /// Stop at this timestamp (ms, exclusive).
    #[arg(long)]
    stop_ms: Option<f64>,

    /// Frames discarded after every processed frame.
    #[arg(long)]
    skip_frames: Option<usize>,

    /// Horizontal rescale factor.
    #[arg(long)]
    fx: Option<f32>,

    /// Vertical rescale factor.
    #[arg(long)]
    fy: Option<f32>,

    /// Drop frames with a missing marker instead of aborting.
    #[arg(long)]
    lenient: bool,

    /// Where failure images are written.
    #[arg(long)]
    diagnostics_dir: Option<PathBuf>,
}

impl TrackArgs {
    fn to_config(&self) -> CliResult<TrackerConfig> {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::from_json_file(path)?,
            None => TrackerConfig::default(),
        };
        if self.fx.is_some() || self.fy.is_some() {
            let base = config.scale.unwrap_or([1.0, 1.0]);
            let scale = [self.fx.unwrap_or(base[0]), self.fy.unwrap_or(base[1])];
            if scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
                return Err("--fx/--fy must be finite and > 0".into());
            }
            config.scale = Some(scale);
        }
        if let Some(n) = self.skip_frames {
            config.skip_frames = n;
        }
        if self.lenient {
            config.policy = MarkerPolicy::Lenient;
        }
        if let Some(dir) = &self.diagnostics_dir {
            config.diagnostics_dir = dir.clone();
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Args)]
struct ExtremaArgs {
    /// Angle series file.
    input: PathBuf,

    /// Output amplitude/period file.
    out: PathBuf,

    /// Peaks closer than this (s) are merged.
    #[arg(long, short = 'm', default_value_t = DEFAULT_MERGE_THRESHOLD)]
    merge_threshold: f64,

    /// Pair adjacent maxima and minima (gap doubled) instead of same-kind peaks.
    #[arg(long)]
    half_oscillations: bool,

    /// Shift times so the series starts at zero.
    #[arg(long)]
    rebase: bool,

    /// Use only the first N samples.
    #[arg(short = 'n')]
    n: Option<usize>,

    /// Minimum peak height (default 0).
    #[arg(long)]
    min_height: Option<f64>,

    /// Minimum rise over both neighbours (default 0).
    #[arg(long)]
    min_threshold: Option<f64>,

    /// Minimum distance between peaks, in samples.
    #[arg(long)]
    min_distance: Option<usize>,

    /// Minimum topographic prominence.
    #[arg(long)]
    min_prominence: Option<f64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AngleFormatArg {
    Rad,
    Deg,
}

impl AngleFormatArg {
    fn to_core(self) -> AngleUnit {
        match self {
            Self::Rad => AngleUnit::Radians,
            Self::Deg => AngleUnit::Degrees,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TimeFormatArg {
    Sec,
    Frames,
}

impl TimeFormatArg {
    fn to_core(self) -> TimeUnit {
        match self {
            Self::Sec => TimeUnit::Seconds,
            Self::Frames => TimeUnit::Frames,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct FitDecayArgs {
    /// Angle series file. Times are shifted so the first sample is at zero.
    input: PathBuf,

    /// Fit without the phase term.
    #[arg(long)]
    no_phase: bool,

    /// Unit of the angle column.
    #[arg(long, value_enum, default_value = "rad")]
    angle_format: AngleFormatArg,

    /// Unit of the time column.
    #[arg(long, value_enum, default_value = "sec")]
    time_format: TimeFormatArg,

    /// Frame rate for `--time-format frames`.
    #[arg(long, default_value_t = DEFAULT_FRAME_RATE)]
    fps: f64,

    /// Initial guess: A TAU T [PHI].
    #[arg(long, num_args = 3..=4, value_names = ["A", "TAU", "T", "PHI"])]
    guess: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Args)]
struct FitLengthArgs {
    /// Period-vs-length data file.
    input: PathBuf,

    /// Orthogonal distance regression using the uncertainty columns.
    #[arg(long)]
    odr: bool,

    /// Initial guess: K N L0.
    #[arg(long, num_args = 3, value_names = ["K", "N", "L0"])]
    guess: Option<Vec<f64>>,

    /// Column separator (default: any whitespace).
    #[arg(long, short = 's')]
    sep: Option<String>,

    /// Write `x residual x_unc y_unc` rows here.
    #[arg(long)]
    save_residuals: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct FitPolyArgs {
    /// Period-vs-amplitude data file.
    input: PathBuf,

    /// Highest power of the amplitude.
    #[arg(long, short = 'd', default_value_t = 0)]
    degree: usize,

    /// Starting value of the constant term (s).
    #[arg(long, short = 'p', default_value_t = 1.0)]
    guess_period: f64,

    /// Drop points with |amplitude| above this.
    #[arg(long)]
    limit_angles: Option<f64>,

    /// Column separator (default: any whitespace).
    #[arg(long, short = 's')]
    sep: Option<String>,

    /// Write `x residual x_unc y_unc` rows here.
    #[arg(long)]
    save_residuals: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct UncertArgs {
    input: PathBuf,
    out: PathBuf,
    /// Absolute uncertainty for every x value.
    #[arg(long, default_value_t = 0.0)]
    x_uncert: f64,
    /// Absolute uncertainty for every y value.
    #[arg(long, default_value_t = 0.0)]
    y_uncert: f64,
    /// Relative uncertainty for every x value.
    #[arg(long, default_value_t = 0.0)]
    x_rel_uncert: f64,
    /// Relative uncertainty for every y value.
    #[arg(long, default_value_t = 0.0)]
    y_rel_uncert: f64,
    /// Widen x to the relative uncertainty of y.
    #[arg(long)]
    x_dep: bool,
    /// Widen y to the relative uncertainty of x.
    #[arg(long)]
    y_dep: bool,
    /// Column separator (default: any whitespace).
    #[arg(long, short = 's')]
    sep: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct CorrectPeriodArgs {
    /// `mass period [mass_unc period_unc]` data, mass in grams.
    input: PathBuf,
    out: PathBuf,
    /// Spring constant (N/m).
    #[arg(long)]
    spring_k: f64,
    /// Nominal pendulum length (m).
    #[arg(long)]
    length: f64,
    /// Fitted period-vs-length law: K N L0.
    #[arg(long, num_args = 3, value_names = ["K", "N", "L0"], allow_negative_numbers = true)]
    law: Vec<f64>,
    #[arg(long, default_value_t = DEFAULT_GRAVITY)]
    gravity: f64,
    /// Column separator (default: any whitespace).
    #[arg(long, short = 's')]
    sep: Option<String>,
}

impl CorrectPeriodArgs {
    fn correction(&self) -> CliResult<SpringCorrection> {
        let law: [f64; 3] = self
            .law
            .as_slice()
            .try_into()
            .map_err(|_| -> CliError { "--law takes exactly K N L0".into() })?;
        if !(self.spring_k.is_finite() && self.spring_k > 0.0) {
            return Err("--spring-k must be finite and > 0".into());
        }
        Ok(SpringCorrection {
            gravity: self.gravity,
            ..SpringCorrection::new(self.spring_k, self.length, law)
        })
    }
}

impl UncertArgs {
    fn floors(&self) -> UncertaintyFloors {
        UncertaintyFloors {
            x_abs: self.x_uncert,
            x_rel: self.x_rel_uncert,
            y_abs: self.y_uncert,
            y_rel: self.y_rel_uncert,
            x_dependent: self.x_dep,
            y_dependent: self.y_dep,
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Track(args) => run_track(&args),
        Commands::Extrema(args) => run_extrema(&args),
        Commands::Periods { experiment, out } => run_periods(&experiment, &out),
        Commands::FitDecay(args) => run_fit_decay(&args),
        Commands::FitLength(args) => run_fit_length(&args),
        Commands::FitPoly(args) => run_fit_poly(&args),
        Commands::Uncert(args) => run_uncert(&args),
        Commands::CorrectPeriod(args) => run_correct_period(&args),
        Commands::FindQ { input, divisor } => run_find_q(&input, divisor),
    }
}

fn run_track(args: &TrackArgs) -> CliResult<()> {
    let config = args.to_config()?;
    let mut source = ImageSequenceSource::open(&args.frames, args.fps).map_err(|e| -> CliError {
        format!("Failed to open frames {}: {}", args.frames.display(), e).into()
    })?;
    tracing::info!(
        "Tracking {} frames from {} at {} fps",
        source.len(),
        args.frames.display(),
        args.fps
    );

    let tracker = Tracker::new(config);
    let report = tracker.track(&mut source, args.start_ms, args.stop_ms)?;
    report.series.save(&args.out)?;
    tracing::info!(
        "Wrote {} samples to {}",
        report.series.len(),
        args.out.display()
    );
    Ok(())
}

fn run_extrema(args: &ExtremaArgs) -> CliResult<()> {
    let mut series = AngleSeries::load(&args.input)?;
    if args.rebase {
        series = series.rebased();
    }
    if let Some(n) = args.n {
        series = series.truncated(n);
    }

    let mut config = ExtremaConfig {
        merge_threshold: args.merge_threshold,
        ..Default::default()
    };
    if let Some(h) = args.min_height {
        config.options.min_height = Some(h);
    }
    if let Some(t) = args.min_threshold {
        config.options.min_threshold = Some(t);
    }
    config.options.min_distance = args.min_distance;
    config.options.min_prominence = args.min_prominence;

    let extrema = ExtremaExtractor::new(config).extract(&series);
    let max_stdev = extrema
        .interleaved()
        .iter()
        .map(|p| p.time_uncertainty)
        .fold(0.0, f64::max);
    tracing::info!(
        "{} maxima, {} minima; largest peak time uncertainty {}",
        extrema.maxima.len(),
        extrema.minima.len(),
        max_stdev
    );

    let pairing = if args.half_oscillations {
        PairingPolicy::HalfOscillation
    } else {
        PairingPolicy::FullOscillation
    };
    let rows = amplitude_period_points(&extrema, pairing);
    save_points(&args.out, &rows)?;
    println!("Wrote {} amplitude/period rows to {}", rows.len(), args.out.display());
    Ok(())
}

fn run_periods(experiment: &Path, out: &Path) -> CliResult<()> {
    let config = ExperimentConfig::from_json_file(experiment)?;
    let report = config.run();
    save_points(out, &report.points)?;
    println!(
        "Wrote {} period rows to {} ({} trials skipped)",
        report.points.len(),
        out.display(),
        report.skipped.len()
    );
    for skipped in &report.skipped {
        println!("  skipped trial {} ({}): {}", skipped.index, skipped.range, skipped.error);
    }
    Ok(())
}

fn print_fit(result: &FitResult) {
    println!("Qty\tValue\t\t\tStdev/Uncertainty");
    for ((name, value), stdev) in result.names.iter().zip(&result.params).zip(&result.stdevs) {
        println!("{}\t{}\t{}", name, value, stdev);
    }
    tracing::debug!(
        "chi^2 = {} after {} iterations",
        result.chi_squared,
        result.iterations
    );
}

fn print_domain(data: &FitData) {
    let start = data.x.iter().copied().fold(f64::INFINITY, f64::min);
    let stop = data.x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    println!("Domain: [{}, {}]", start, stop);
}

fn save_residuals(path: Option<&Path>, result: &FitResult, data: &FitData) -> CliResult<()> {
    if let Some(path) = path {
        save_points(path, &result.residual_points(data))?;
        tracing::info!("Residuals written to {}", path.display());
    }
    Ok(())
}

/// Seconds and radians, starting at t = 0.
fn decay_data(series: &AngleSeries, args: &FitDecayArgs) -> FitData {
    let series = series
        .converted(args.time_format.to_core(), args.angle_format.to_core(), args.fps)
        .rebased();
    FitData::new(series.times(), series.angles())
}

fn run_fit_decay(args: &FitDecayArgs) -> CliResult<()> {
    let frames = matches!(args.time_format, TimeFormatArg::Frames);
    if frames && !(args.fps.is_finite() && args.fps > 0.0) {
        return Err("--fps must be finite and > 0".into());
    }
    let series = AngleSeries::load(&args.input)?;
    let data = decay_data(&series, args);
    let model: &dyn Model = if args.no_phase {
        &DampedCosineNoPhase
    } else {
        &DampedCosine
    };
    let guess = args.guess.clone().unwrap_or_else(|| model.default_guess());
    let result = fit(
        model,
        &data,
        &guess,
        FitMode::LeastSquares,
        &SolverOptions::default(),
    )?;
    print_fit(&result);
    if let Some(q) = QualityFactor::from_decay_fit(&result) {
        println!("Q\t{}\t{}", q.q, q.uncertainty);
    }
    Ok(())
}

fn run_fit_length(args: &FitLengthArgs) -> CliResult<()> {
    let points = load_points(&args.input, args.sep.as_deref())?;
    let data = FitData::from_points(&points);
    let guess = args.guess.clone().unwrap_or_else(|| PowerLaw.default_guess());
    let mode = if args.odr {
        FitMode::OrthogonalDistance
    } else {
        FitMode::LeastSquares
    };
    let result = fit(&PowerLaw, &data, &guess, mode, &SolverOptions::default())?;
    print_fit(&result);
    print_domain(&data);
    save_residuals(args.save_residuals.as_deref(), &result, &data)
}

fn run_fit_poly(args: &FitPolyArgs) -> CliResult<()> {
    let model = Polynomial::new(args.degree)
        .ok_or_else(|| -> CliError {
            format!(
                "unsupported degree {} (supported: 0 to {})",
                args.degree, MAX_POLYNOMIAL_DEGREE
            )
            .into()
        })?
        .with_guess_t0(args.guess_period);
    let points = load_points(&args.input, args.sep.as_deref())?;
    let mut data = FitData::from_points(&points);
    if let Some(limit) = args.limit_angles {
        data = data.retain_abs_x_at_most(limit);
    }
    let result = fit(
        &model,
        &data,
        &model.default_guess(),
        FitMode::LeastSquares,
        &SolverOptions::default(),
    )?;
    print_fit(&result);
    print_domain(&data);
    save_residuals(args.save_residuals.as_deref(), &result, &data)
}

fn run_uncert(args: &UncertArgs) -> CliResult<()> {
    let points = load_points(&args.input, args.sep.as_deref())?;
    let out = args.floors().assign(&points);
    save_points(&args.out, &out)?;
    println!("Wrote {} points to {}", out.len(), args.out.display());
    Ok(())
}

fn run_correct_period(args: &CorrectPeriodArgs) -> CliResult<()> {
    let correction = args.correction()?;
    let points = load_points(&args.input, args.sep.as_deref())?;
    let out = correction.apply(&points);
    save_points(&args.out, &out)?;
    println!("Wrote {} corrected points to {}", out.len(), args.out.display());
    Ok(())
}

fn run_find_q(input: &Path, divisor: f64) -> CliResult<()> {
    let series = AngleSeries::load(input)?;
    let count = count_quality_factor(&series, divisor)?;
    println!("Found peak: t={}, angle={}", count.time, count.angle);
    println!("Q: {}", count.q);
    Ok(())
}
