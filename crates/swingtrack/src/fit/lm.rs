//! Dense Levenberg–Marquardt on the normal equations.
//!
//! Solved on nalgebra directly rather than through tiny-solver, which does
//! not return `JᵀJ` at the solution; the parameter covariance needs it.

use nalgebra::{DMatrix, DVector};

use super::{FitError, SolverOptions};

/// A nonlinear least-squares problem `min ||r(p)||²`.
pub(super) trait Residuals {
    fn n_unknowns(&self) -> usize;

    /// `None` when the model is not finite at `p`.
    fn residuals(&self, p: &DVector<f64>) -> Option<DVector<f64>>;

    fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64>;
}

pub(super) struct LmOutcome {
    pub params: DVector<f64>,
    pub residuals: DVector<f64>,
    /// `JᵀJ` at the solution.
    pub normal: DMatrix<f64>,
    /// Sum of squared residuals.
    pub cost: f64,
    pub iterations: usize,
}

const LAMBDA_MAX: f64 = 1e16;
const LAMBDA_MIN: f64 = 1e-15;

fn solve_damped(normal: &DMatrix<f64>, g: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let mut a = normal.clone();
    for i in 0..a.nrows() {
        let d = normal[(i, i)].max(1e-12);
        a[(i, i)] += lambda * d;
    }
    let rhs = -g;
    match a.clone().cholesky() {
        Some(chol) => Some(chol.solve(&rhs)),
        None => a.lu().solve(&rhs),
    }
}

fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

pub(super) fn minimize(
    problem: &dyn Residuals,
    x0: DVector<f64>,
    opts: &SolverOptions,
) -> Result<LmOutcome, FitError> {
    debug_assert_eq!(x0.len(), problem.n_unknowns());
    let mut p = x0;
    let mut r = problem
        .residuals(&p)
        .filter(all_finite)
        .ok_or(FitError::NonFiniteModel)?;
    let mut cost = r.norm_squared();
    let mut lambda = opts.initial_lambda;
    let mut iterations = 0;

    while iterations < opts.max_iters && cost > 0.0 {
        iterations += 1;
        let j = problem.jacobian(&p);
        let normal = j.transpose() * &j;
        let g = j.transpose() * &r;
        if g.amax() <= opts.gtol {
            break;
        }

        let mut accepted = false;
        let mut converged = false;
        while lambda <= LAMBDA_MAX {
            let Some(step) = solve_damped(&normal, &g, lambda).filter(all_finite) else {
                lambda *= 10.0;
                continue;
            };
            let candidate = &p + &step;
            match problem.residuals(&candidate).filter(all_finite) {
                Some(r_new) if r_new.norm_squared() < cost => {
                    let cost_new = r_new.norm_squared();
                    let reduction = cost - cost_new;
                    converged = reduction <= opts.ftol * cost
                        || step.norm() <= opts.xtol * (p.norm() + opts.xtol);
                    p = candidate;
                    r = r_new;
                    cost = cost_new;
                    lambda = (lambda / 10.0).max(LAMBDA_MIN);
                    accepted = true;
                    break;
                }
                _ => lambda *= 10.0,
            }
        }
        tracing::trace!("lm iter {}: cost={:.6e} lambda={:.1e}", iterations, cost, lambda);
        if !accepted || converged {
            break;
        }
    }

    let j = problem.jacobian(&p);
    Ok(LmOutcome {
        normal: j.transpose() * &j,
        params: p,
        residuals: r,
        cost,
        iterations,
    })
}

/// `(JᵀJ)⁻¹`, or `SingularMatrix` when the parameters are not identifiable.
pub(super) fn invert_normal(normal: &DMatrix<f64>) -> Result<DMatrix<f64>, FitError> {
    normal
        .clone()
        .cholesky()
        .map(|c| c.inverse())
        .or_else(|| normal.clone().try_inverse())
        .filter(|inv| inv.iter().all(|v| v.is_finite()))
        .ok_or(FitError::SingularMatrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Rosenbrock as residuals `[10(y - x²), 1 - x]`.
    struct Rosenbrock;

    impl Residuals for Rosenbrock {
        fn n_unknowns(&self) -> usize {
            2
        }

        fn residuals(&self, p: &DVector<f64>) -> Option<DVector<f64>> {
            Some(DVector::from_vec(vec![10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]]))
        }

        fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_row_slice(2, 2, &[-20.0 * p[0], 10.0, -1.0, 0.0])
        }
    }

    #[test]
    fn rosenbrock_reaches_the_valley_floor() {
        let out = minimize(
            &Rosenbrock,
            DVector::from_vec(vec![-1.2, 1.0]),
            &SolverOptions::default(),
        )
        .expect("converges");
        assert_relative_eq!(out.params[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(out.params[1], 1.0, epsilon = 1e-6);
        assert!(out.cost < 1e-12);
    }

    #[test]
    fn singular_normal_matrix_is_reported() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(matches!(invert_normal(&m), Err(FitError::SingularMatrix)));
    }
}
