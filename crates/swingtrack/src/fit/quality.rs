//! Quality factor of a damped oscillation.

use std::f64::consts::PI;

use super::FitResult;

/// `Q = π·τ/T` with a conservative uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QualityFactor {
    pub q: f64,
    pub uncertainty: f64,
}

impl QualityFactor {
    /// The uncertainty is `|Q|` times the larger of the two relative
    /// uncertainties, not their quadrature sum.
    pub fn new(tau: f64, tau_sigma: f64, period: f64, period_sigma: f64) -> Self {
        let q = PI * tau / period;
        let rel = (tau_sigma / tau).abs().max((period_sigma / period).abs());
        Self {
            q,
            uncertainty: q.abs() * rel,
        }
    }

    /// From a damped-cosine fit with parameters named `tau` and `T`.
    pub fn from_decay_fit(fit: &FitResult) -> Option<Self> {
        let (tau, tau_sigma) = fit.get("tau")?;
        let (period, period_sigma) = fit.get("T")?;
        Some(Self::new(tau, tau_sigma, period, period_sigma))
    }
}

impl std::fmt::Display for QualityFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} +/- {}", self.q, self.uncertainty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn larger_relative_error_wins() {
        let q = QualityFactor::new(20.0, 1.0, 2.0, 0.01);
        assert_relative_eq!(q.q, 10.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(q.uncertainty, 10.0 * PI * 0.05, epsilon = 1e-12);

        let q = QualityFactor::new(20.0, 0.1, 2.0, 0.2);
        assert_relative_eq!(q.uncertainty, 10.0 * PI * 0.1, epsilon = 1e-12);
    }
}
