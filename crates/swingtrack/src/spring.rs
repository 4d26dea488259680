//! Removal of spring stretch from period-vs-mass data.
//!
//! A bob hung from a spring lengthens the pendulum by `m·g/k_spring`. Given a
//! fitted period-vs-length law `T = k·(L + L0)^n`, each period is corrected
//! by the difference the extra length makes at the nominal length.

use crate::data_file::DataPoint;
use crate::fit::{Model, PowerLaw};

/// Standard gravity used when none is configured, m/s².
pub const DEFAULT_GRAVITY: f64 = 9.806;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpringCorrection {
    /// Spring constant, N/m.
    pub spring_k: f64,
    /// Nominal pendulum length, m.
    pub length: f64,
    /// Fitted `[k, n, L0]` of the period-vs-length law.
    pub law: [f64; 3],
    #[serde(default = "default_gravity")]
    pub gravity: f64,
}

fn default_gravity() -> f64 {
    DEFAULT_GRAVITY
}

impl SpringCorrection {
    pub fn new(spring_k: f64, length: f64, law: [f64; 3]) -> Self {
        Self {
            spring_k,
            length,
            law,
            gravity: DEFAULT_GRAVITY,
        }
    }

    /// Extension of the spring under a mass given in grams, m.
    pub fn stretch(&self, mass_g: f64) -> f64 {
        mass_g / 1000.0 * self.gravity / self.spring_k
    }

    /// Period added by the stretch for a mass in grams.
    pub fn period_shift(&self, mass_g: f64) -> f64 {
        let law = PowerLaw;
        law.eval(self.length + self.stretch(mass_g), &self.law) - law.eval(self.length, &self.law)
    }

    /// Subtract the stretch from every `mass period` point; uncertainties are kept.
    pub fn apply(&self, points: &[DataPoint]) -> Vec<DataPoint> {
        points
            .iter()
            .map(|p| DataPoint {
                y: p.y - self.period_shift(p.x),
                ..*p
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn correction() -> SpringCorrection {
        SpringCorrection {
            gravity: 10.0,
            ..SpringCorrection::new(200.0, 1.0, [2.0, 0.5, 0.0])
        }
    }

    #[test]
    fn stretch_lengthens_by_weight_over_spring_constant() {
        assert_relative_eq!(correction().stretch(400.0), 0.02, epsilon = 1e-15);
    }

    #[test]
    fn period_is_reduced_by_the_stretch_contribution() {
        // 2·sqrt(1.02) − 2·sqrt(1.0)
        let shift = 0.019_900_987_672_4;
        let points = [
            DataPoint::with_uncertainties(400.0, 2.1, 1.0, 0.01),
            DataPoint::new(0.0, 2.0),
        ];
        let out = correction().apply(&points);

        assert_relative_eq!(correction().period_shift(400.0), shift, epsilon = 1e-12);
        assert_relative_eq!(out[0].y, 2.1 - shift, epsilon = 1e-12);
        assert_eq!(out[0].x, 400.0);
        assert_eq!(out[0].x_unc, Some(1.0));
        assert_eq!(out[0].y_unc, Some(0.01));
        assert_eq!(out[1], points[1]);
    }

    #[test]
    fn gravity_defaults_when_absent_from_json() {
        let c: SpringCorrection =
            serde_json::from_str(r#"{"spring_k":194,"length":1.0745,"law":[2.018,0.4965,-0.0127]}"#)
                .expect("parse");
        assert_eq!(c.gravity, DEFAULT_GRAVITY);
    }
}
