//! Parametric models for curve fitting.

use std::f64::consts::PI;

/// A scalar function of one independent variable and a parameter vector.
///
/// Derivatives default to central differences; models with cheap closed
/// forms override them.
pub trait Model {
    /// Parameter names in the order of the parameter vector.
    fn param_names(&self) -> Vec<&'static str>;

    fn eval(&self, x: f64, params: &[f64]) -> f64;

    /// Starting point used when the caller has no better guess.
    fn default_guess(&self) -> Vec<f64>;

    fn n_params(&self) -> usize {
        self.param_names().len()
    }

    /// Partial derivatives with respect to every parameter, written to `out`.
    fn param_gradient(&self, x: f64, params: &[f64], out: &mut [f64]) {
        let mut p = params.to_vec();
        for (j, g) in out.iter_mut().enumerate() {
            let h = step_for(params[j]);
            p[j] = params[j] + h;
            let up = self.eval(x, &p);
            p[j] = params[j] - h;
            let down = self.eval(x, &p);
            p[j] = params[j];
            *g = (up - down) / (2.0 * h);
        }
    }

    /// Derivative with respect to the independent variable.
    fn x_derivative(&self, x: f64, params: &[f64]) -> f64 {
        let h = step_for(x);
        (self.eval(x + h, params) - self.eval(x - h, params)) / (2.0 * h)
    }
}

fn step_for(v: f64) -> f64 {
    1e-6 * v.abs().max(1.0)
}

/// `a·exp(-t/tau)·cos(2πt/T + phi)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DampedCosine;

impl Model for DampedCosine {
    fn param_names(&self) -> Vec<&'static str> {
        vec!["a", "tau", "T", "phi"]
    }

    fn eval(&self, t: f64, p: &[f64]) -> f64 {
        p[0] * (-t / p[1]).exp() * (2.0 * PI * t / p[2] + p[3]).cos()
    }

    fn default_guess(&self) -> Vec<f64> {
        vec![0.6, 25.0, 0.75, 0.0]
    }

    fn param_gradient(&self, t: f64, p: &[f64], out: &mut [f64]) {
        let (a, tau, period) = (p[0], p[1], p[2]);
        let decay = (-t / tau).exp();
        let arg = 2.0 * PI * t / period + p[3];
        let (s, c) = arg.sin_cos();
        out[0] = decay * c;
        out[1] = a * decay * c * t / (tau * tau);
        out[2] = a * decay * s * 2.0 * PI * t / (period * period);
        out[3] = -a * decay * s;
    }
}

/// `a·exp(-t/tau)·cos(2πt/T)`, for series that start at a turning point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DampedCosineNoPhase;

impl Model for DampedCosineNoPhase {
    fn param_names(&self) -> Vec<&'static str> {
        vec!["a", "tau", "T"]
    }

    fn eval(&self, t: f64, p: &[f64]) -> f64 {
        p[0] * (-t / p[1]).exp() * (2.0 * PI * t / p[2]).cos()
    }

    fn default_guess(&self) -> Vec<f64> {
        vec![0.8, 50.0, 1.8]
    }
}

/// `k·(L + L0)^n`: period against pendulum length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerLaw;

impl Model for PowerLaw {
    fn param_names(&self) -> Vec<&'static str> {
        vec!["k", "n", "L0"]
    }

    fn eval(&self, l: f64, p: &[f64]) -> f64 {
        p[0] * (l + p[2]).powf(p[1])
    }

    fn default_guess(&self) -> Vec<f64> {
        vec![2.0, 0.5, 0.0]
    }

    fn param_gradient(&self, l: f64, p: &[f64], out: &mut [f64]) {
        let base = l + p[2];
        let pow = base.powf(p[1]);
        out[0] = pow;
        out[1] = p[0] * pow * base.ln();
        out[2] = p[0] * p[1] * base.powf(p[1] - 1.0);
    }

    fn x_derivative(&self, l: f64, p: &[f64]) -> f64 {
        p[0] * p[1] * (l + p[2]).powf(p[1] - 1.0)
    }
}

/// Highest supported polynomial degree.
pub const MAX_POLYNOMIAL_DEGREE: usize = 6;

const POLYNOMIAL_NAMES: [&str; MAX_POLYNOMIAL_DEGREE + 1] = ["t0", "b", "c", "d", "e", "f", "g"];

/// `t0 + b·θ + c·θ² + …`: period against amplitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polynomial {
    degree: usize,
    /// Constant-term starting value.
    pub guess_t0: f64,
}

impl Polynomial {
    /// `None` above [`MAX_POLYNOMIAL_DEGREE`].
    pub fn new(degree: usize) -> Option<Self> {
        (degree <= MAX_POLYNOMIAL_DEGREE).then_some(Self {
            degree,
            guess_t0: 1.0,
        })
    }

    pub fn with_guess_t0(mut self, t0: f64) -> Self {
        self.guess_t0 = t0;
        self
    }

    pub fn degree(&self) -> usize {
        self.degree
    }
}

impl Model for Polynomial {
    fn param_names(&self) -> Vec<&'static str> {
        POLYNOMIAL_NAMES[..=self.degree].to_vec()
    }

    fn eval(&self, x: f64, p: &[f64]) -> f64 {
        p.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    fn default_guess(&self) -> Vec<f64> {
        let mut g = vec![0.0; self.degree + 1];
        g[0] = self.guess_t0;
        g
    }

    fn param_gradient(&self, x: f64, _p: &[f64], out: &mut [f64]) {
        let mut pow = 1.0;
        for g in out.iter_mut() {
            *g = pow;
            pow *= x;
        }
    }

    fn x_derivative(&self, x: f64, p: &[f64]) -> f64 {
        p.iter()
            .enumerate()
            .skip(1)
            .rev()
            .fold(0.0, |acc, (k, c)| acc * x + k as f64 * c)
    }
}
