//! Residual systems for ordinary and orthogonal-distance fitting.

use nalgebra::{DMatrix, DVector};

use super::lm::Residuals;
use super::model::Model;

/// `r_i = f(x_i; β) - y_i`.
pub(super) struct OrdinaryResiduals<'a> {
    pub model: &'a dyn Model,
    pub x: &'a [f64],
    pub y: &'a [f64],
}

impl Residuals for OrdinaryResiduals<'_> {
    fn n_unknowns(&self) -> usize {
        self.model.n_params()
    }

    fn residuals(&self, p: &DVector<f64>) -> Option<DVector<f64>> {
        let beta = p.as_slice();
        let r = DVector::from_iterator(
            self.x.len(),
            self.x
                .iter()
                .zip(self.y)
                .map(|(&x, &y)| self.model.eval(x, beta) - y),
        );
        Some(r)
    }

    fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
        let beta = p.as_slice();
        let n = beta.len();
        let mut j = DMatrix::zeros(self.x.len(), n);
        let mut row = vec![0.0; n];
        for (i, &x) in self.x.iter().enumerate() {
            self.model.param_gradient(x, beta, &mut row);
            for (k, &v) in row.iter().enumerate() {
                j[(i, k)] = v;
            }
        }
        j
    }
}

/// Errors-in-variables system.
///
/// Unknowns are the model parameters followed by one x correction `δ` per
/// point with a positive x uncertainty; points with zero x uncertainty keep
/// their x fixed. Residuals are the weighted y misfits at the corrected x,
/// followed by the weighted corrections.
pub(super) struct OrthogonalResiduals<'a> {
    pub model: &'a dyn Model,
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub x_sigma: &'a [f64],
    pub y_sigma: &'a [f64],
    /// Points whose x is free to move.
    pub free: Vec<usize>,
}

impl<'a> OrthogonalResiduals<'a> {
    pub fn new(
        model: &'a dyn Model,
        x: &'a [f64],
        y: &'a [f64],
        x_sigma: &'a [f64],
        y_sigma: &'a [f64],
    ) -> Self {
        let free = x_sigma
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| (s > 0.0).then_some(i))
            .collect();
        Self {
            model,
            x,
            y,
            x_sigma,
            y_sigma,
            free,
        }
    }

    /// Corrected x of every point.
    pub fn shifted_x(&self, p: &DVector<f64>) -> Vec<f64> {
        let n = self.model.n_params();
        let mut xs = self.x.to_vec();
        for (k, &i) in self.free.iter().enumerate() {
            xs[i] += p[n + k];
        }
        xs
    }
}

impl Residuals for OrthogonalResiduals<'_> {
    fn n_unknowns(&self) -> usize {
        self.model.n_params() + self.free.len()
    }

    fn residuals(&self, p: &DVector<f64>) -> Option<DVector<f64>> {
        let n = self.model.n_params();
        let beta = &p.as_slice()[..n];
        let xs = self.shifted_x(p);
        let m = self.x.len();
        let mut r = DVector::zeros(m + self.free.len());
        for i in 0..m {
            r[i] = (self.model.eval(xs[i], beta) - self.y[i]) / self.y_sigma[i];
        }
        for (k, &i) in self.free.iter().enumerate() {
            r[m + k] = p[n + k] / self.x_sigma[i];
        }
        Some(r)
    }

    fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
        let n = self.model.n_params();
        let beta = &p.as_slice()[..n];
        let xs = self.shifted_x(p);
        let m = self.x.len();
        let mut j = DMatrix::zeros(m + self.free.len(), n + self.free.len());
        let mut row = vec![0.0; n];
        for i in 0..m {
            self.model.param_gradient(xs[i], beta, &mut row);
            for (k, &v) in row.iter().enumerate() {
                j[(i, k)] = v / self.y_sigma[i];
            }
        }
        for (k, &i) in self.free.iter().enumerate() {
            j[(i, n + k)] = self.model.x_derivative(xs[i], beta) / self.y_sigma[i];
            j[(m + k, n + k)] = 1.0 / self.x_sigma[i];
        }
        j
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::model::PowerLaw;
    use approx::assert_relative_eq;

    #[test]
    fn fixed_points_get_no_correction_unknown() {
        let x = [0.2, 0.4, 0.6];
        let y = [1.0, 1.3, 1.6];
        let sx = [0.01, 0.0, 0.02];
        let sy = [0.05, 0.05, 0.05];
        let sys = OrthogonalResiduals::new(&PowerLaw, &x, &y, &sx, &sy);
        assert_eq!(sys.free, vec![0, 2]);
        assert_eq!(sys.n_unknowns(), 5);

        let p = DVector::from_vec(vec![2.0, 0.5, 0.0, 0.001, -0.002]);
        let j = sys.jacobian(&p);
        assert_eq!(j.shape(), (5, 5));
        assert_eq!(j[(1, 3)], 0.0);
        assert_eq!(j[(1, 4)], 0.0);
        assert_relative_eq!(j[(3, 3)], 100.0, epsilon = 1e-9);
        assert_relative_eq!(j[(4, 4)], 50.0, epsilon = 1e-9);
        let xs = sys.shifted_x(&p);
        assert_eq!(xs[1], 0.4);
        assert!((xs[2] - 0.598).abs() < 1e-12);
    }
}
