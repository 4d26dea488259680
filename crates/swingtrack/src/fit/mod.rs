//! Nonlinear curve fitting with parameter uncertainties.
//!
//! Two modes are exposed and never chosen implicitly:
//!
//! - [`FitMode::LeastSquares`]: ordinary least squares in y. Data
//!   uncertainties are ignored; the covariance is `(JᵀJ)⁻¹·χ²/(m−n)`.
//! - [`FitMode::OrthogonalDistance`]: errors-in-variables fit that also moves
//!   each x within its uncertainty. Both uncertainty vectors are required.
//!   The covariance is the parameter block of `(JᵀJ)⁻¹` over all unknowns,
//!   scaled by the residual variance.
//!
//! Standard deviations are the square roots of the covariance diagonal.

mod lm;
mod model;
mod odr;
mod quality;

use nalgebra::{DMatrix, DVector};

pub use model::{
    DampedCosine, DampedCosineNoPhase, Model, Polynomial, PowerLaw, MAX_POLYNOMIAL_DEGREE,
};
pub use quality::QualityFactor;

use crate::data_file::DataPoint;
use lm::{invert_normal, minimize};
use odr::{OrdinaryResiduals, OrthogonalResiduals};

/// Observations to fit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub x_sigma: Option<Vec<f64>>,
    pub y_sigma: Option<Vec<f64>>,
}

impl FitData {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            x,
            y,
            x_sigma: None,
            y_sigma: None,
        }
    }

    pub fn with_uncertainties(mut self, x_sigma: Vec<f64>, y_sigma: Vec<f64>) -> Self {
        self.x_sigma = Some(x_sigma);
        self.y_sigma = Some(y_sigma);
        self
    }

    /// Collect data-file points. An uncertainty column present on any point
    /// is kept, with missing entries read as zero.
    pub fn from_points(points: &[DataPoint]) -> Self {
        let column = |get: fn(&DataPoint) -> Option<f64>| {
            points
                .iter()
                .any(|p| get(p).is_some())
                .then(|| points.iter().map(|p| get(p).unwrap_or(0.0)).collect::<Vec<f64>>())
        };
        Self {
            x: points.iter().map(|p| p.x).collect(),
            y: points.iter().map(|p| p.y).collect(),
            x_sigma: column(|p| p.x_unc),
            y_sigma: column(|p| p.y_unc),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Keep only points with `|x| <= limit`.
    pub fn retain_abs_x_at_most(&self, limit: f64) -> Self {
        let keep: Vec<bool> = self.x.iter().map(|x| x.abs() <= limit).collect();
        let pick = |v: &[f64]| -> Vec<f64> {
            v.iter()
                .zip(&keep)
                .filter_map(|(&x, &k)| k.then_some(x))
                .collect()
        };
        Self {
            x: pick(&self.x),
            y: pick(&self.y),
            x_sigma: self.x_sigma.as_deref().map(pick),
            y_sigma: self.y_sigma.as_deref().map(pick),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    #[default]
    LeastSquares,
    OrthogonalDistance,
}

/// Levenberg–Marquardt stopping rules.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub max_iters: usize,
    /// Stop when an accepted step lowers the cost by less than this fraction.
    pub ftol: f64,
    /// Stop when an accepted step is shorter than this relative to the parameters.
    pub xtol: f64,
    /// Stop when the gradient's largest component is at most this.
    pub gtol: f64,
    pub initial_lambda: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iters: 200,
            ftol: 1e-14,
            xtol: 1e-14,
            gtol: 1e-16,
            initial_lambda: 1e-3,
        }
    }
}

/// Best-fit parameters and their standard deviations.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub names: Vec<&'static str>,
    pub params: Vec<f64>,
    pub stdevs: Vec<f64>,
    pub covariance: DMatrix<f64>,
    /// `y - f(x)` at the data x, one per point.
    pub residuals: Vec<f64>,
    /// Final cost: plain sum of squares, or weighted for orthogonal distance.
    pub chi_squared: f64,
    pub iterations: usize,
}

impl FitResult {
    /// `(value, stdev)` of a named parameter.
    pub fn get(&self, name: &str) -> Option<(f64, f64)> {
        let i = self.names.iter().position(|n| *n == name)?;
        Some((self.params[i], self.stdevs[i]))
    }

    /// Residual rows `x residual x_unc y_unc` for writing back as a data file.
    pub fn residual_points(&self, data: &FitData) -> Vec<DataPoint> {
        data.x
            .iter()
            .zip(&self.residuals)
            .enumerate()
            .map(|(i, (&x, &r))| {
                let xu = data.x_sigma.as_ref().map_or(0.0, |s| s[i]);
                let yu = data.y_sigma.as_ref().map_or(0.0, |s| s[i]);
                DataPoint::with_uncertainties(x, r, xu, yu)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    TooFewPoints { points: usize, params: usize },
    LengthMismatch { what: &'static str, expected: usize, found: usize },
    GuessLength { expected: usize, found: usize },
    NonFiniteData { index: usize },
    /// Orthogonal distance needs both x and y uncertainties.
    MissingUncertainties,
    InvalidUncertainty { axis: char, index: usize, value: f64 },
    /// The model is not finite at the initial guess.
    NonFiniteModel,
    /// The parameters are not identifiable from the data.
    SingularMatrix,
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { points, params } => write!(
                f,
                "too few points: {} points for {} parameters",
                points, params
            ),
            Self::LengthMismatch {
                what,
                expected,
                found,
            } => write!(f, "{} has {} entries, expected {}", what, found, expected),
            Self::GuessLength { expected, found } => write!(
                f,
                "initial guess has {} values, the model has {} parameters",
                found, expected
            ),
            Self::NonFiniteData { index } => write!(f, "data point {} is not finite", index),
            Self::MissingUncertainties => write!(
                f,
                "orthogonal distance fitting requires both x and y uncertainties"
            ),
            Self::InvalidUncertainty { axis, index, value } => write!(
                f,
                "invalid {} uncertainty {} at point {}",
                axis, value, index
            ),
            Self::NonFiniteModel => write!(f, "model is not finite at the initial guess"),
            Self::SingularMatrix => write!(f, "singular normal matrix; parameters not identifiable"),
        }
    }
}

impl std::error::Error for FitError {}

fn check_lengths(data: &FitData) -> Result<(), FitError> {
    let m = data.x.len();
    let check = |what, len| {
        if len == m {
            Ok(())
        } else {
            Err(FitError::LengthMismatch {
                what,
                expected: m,
                found: len,
            })
        }
    };
    check("y", data.y.len())?;
    if let Some(s) = &data.x_sigma {
        check("x uncertainty", s.len())?;
    }
    if let Some(s) = &data.y_sigma {
        check("y uncertainty", s.len())?;
    }
    if let Some(index) = data
        .x
        .iter()
        .zip(&data.y)
        .position(|(x, y)| !x.is_finite() || !y.is_finite())
    {
        return Err(FitError::NonFiniteData { index });
    }
    Ok(())
}

fn stdevs_from(covariance: &DMatrix<f64>) -> Vec<f64> {
    (0..covariance.nrows())
        .map(|i| covariance[(i, i)].max(0.0).sqrt())
        .collect()
}

fn residual_variance(cost: f64, m: usize, n: usize) -> f64 {
    if m > n {
        cost / (m - n) as f64
    } else {
        tracing::warn!("no degrees of freedom left; parameter uncertainties are unbounded");
        f64::INFINITY
    }
}

fn fit_least_squares(
    model: &dyn Model,
    data: &FitData,
    guess: &[f64],
    opts: &SolverOptions,
) -> Result<FitResult, FitError> {
    let problem = OrdinaryResiduals {
        model,
        x: &data.x,
        y: &data.y,
    };
    let out = minimize(&problem, DVector::from_column_slice(guess), opts)?;
    let n = guess.len();
    let scale = residual_variance(out.cost, data.len(), n);
    let covariance = invert_normal(&out.normal)? * scale;
    Ok(FitResult {
        names: model.param_names(),
        params: out.params.iter().copied().collect(),
        stdevs: stdevs_from(&covariance),
        covariance,
        residuals: out.residuals.iter().map(|r| -r).collect(),
        chi_squared: out.cost,
        iterations: out.iterations,
    })
}

fn fit_orthogonal(
    model: &dyn Model,
    data: &FitData,
    guess: &[f64],
    opts: &SolverOptions,
) -> Result<FitResult, FitError> {
    let (Some(x_sigma), Some(y_sigma)) = (&data.x_sigma, &data.y_sigma) else {
        return Err(FitError::MissingUncertainties);
    };
    for (index, &value) in x_sigma.iter().enumerate() {
        if !(value.is_finite() && value >= 0.0) {
            return Err(FitError::InvalidUncertainty {
                axis: 'x',
                index,
                value,
            });
        }
    }
    for (index, &value) in y_sigma.iter().enumerate() {
        if !(value.is_finite() && value > 0.0) {
            return Err(FitError::InvalidUncertainty {
                axis: 'y',
                index,
                value,
            });
        }
    }

    let problem = OrthogonalResiduals::new(model, &data.x, &data.y, x_sigma, y_sigma);
    let n = guess.len();
    let mut x0 = DVector::zeros(n + problem.free.len());
    x0.rows_mut(0, n).copy_from_slice(guess);
    let out = minimize(&problem, x0, opts)?;

    let scale = residual_variance(out.cost, data.len(), n);
    let full = invert_normal(&out.normal)?;
    let covariance = full.view((0, 0), (n, n)).into_owned() * scale;
    let params: Vec<f64> = out.params.rows(0, n).iter().copied().collect();
    let residuals = data
        .x
        .iter()
        .zip(&data.y)
        .map(|(&x, &y)| y - model.eval(x, &params))
        .collect();
    Ok(FitResult {
        names: model.param_names(),
        params,
        stdevs: stdevs_from(&covariance),
        covariance,
        residuals,
        chi_squared: out.cost,
        iterations: out.iterations,
    })
}

/// Fit `model` to `data` from `guess`.
pub fn fit(
    model: &dyn Model,
    data: &FitData,
    guess: &[f64],
    mode: FitMode,
    opts: &SolverOptions,
) -> Result<FitResult, FitError> {
    check_lengths(data)?;
    let n = model.n_params();
    if guess.len() != n {
        return Err(FitError::GuessLength {
            expected: n,
            found: guess.len(),
        });
    }
    if data.len() < n {
        return Err(FitError::TooFewPoints {
            points: data.len(),
            params: n,
        });
    }

    let result = match mode {
        FitMode::LeastSquares => fit_least_squares(model, data, guess, opts),
        FitMode::OrthogonalDistance => fit_orthogonal(model, data, guess, opts),
    }?;
    tracing::debug!(
        "{:?} fit: {} points, chi2={:.6e}, {} iterations",
        mode,
        data.len(),
        result.chi_squared,
        result.iterations
    );
    Ok(result)
}
