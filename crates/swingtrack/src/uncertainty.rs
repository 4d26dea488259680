//! Per-point uncertainty assignment for `(x, y)` data.

use crate::data_file::DataPoint;

/// Absolute and relative floors for each axis.
///
/// With `x_dependent`, the x uncertainty is widened so its relative size is
/// at least that of y; `y_dependent` does the converse using the already
/// widened x.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UncertaintyFloors {
    pub x_abs: f64,
    pub x_rel: f64,
    pub y_abs: f64,
    pub y_rel: f64,
    pub x_dependent: bool,
    pub y_dependent: bool,
}

impl UncertaintyFloors {
    /// Uncertainty of a single x value from the x floors alone.
    pub fn x_for(&self, x: f64) -> f64 {
        self.x_abs.max((self.x_rel * x).abs())
    }

    /// Uncertainty of a single y value from the y floors alone.
    pub fn y_for(&self, y: f64) -> f64 {
        self.y_abs.max((self.y_rel * y).abs())
    }

    /// `(x_unc, y_unc)` for one point.
    pub fn pair(&self, x: f64, y: f64) -> (f64, f64) {
        let mut xu = self.x_for(x);
        let mut yu = self.y_for(y);
        if self.x_dependent && y != 0.0 {
            xu = xu.max((yu / y * x).abs());
        }
        if self.y_dependent && x != 0.0 {
            yu = yu.max((xu / x * y).abs());
        }
        (xu, yu)
    }

    /// Replace the uncertainties of every point.
    pub fn assign(&self, points: &[DataPoint]) -> Vec<DataPoint> {
        points
            .iter()
            .map(|p| {
                let (xu, yu) = self.pair(p.x, p.y);
                DataPoint::with_uncertainties(p.x, p.y, xu, yu)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn larger_of_absolute_and_relative() {
        let floors = UncertaintyFloors {
            x_abs: 0.01,
            x_rel: 0.02,
            y_abs: 0.5,
            y_rel: 0.0,
            ..Default::default()
        };
        let (xu, yu) = floors.pair(-2.0, 3.0);
        assert_relative_eq!(xu, 0.04);
        assert_relative_eq!(yu, 0.5);
        let (xu, _) = floors.pair(0.1, 3.0);
        assert_relative_eq!(xu, 0.01);
    }

    #[test]
    fn dependency_propagates_relative_size() {
        let floors = UncertaintyFloors {
            y_rel: 0.1,
            x_dependent: true,
            ..Default::default()
        };
        let (xu, yu) = floors.pair(4.0, 2.0);
        assert_relative_eq!(yu, 0.2);
        assert_relative_eq!(xu, 0.4);

        let floors = UncertaintyFloors {
            x_abs: 0.5,
            y_dependent: true,
            ..Default::default()
        };
        let (_, yu) = floors.pair(5.0, -3.0);
        assert_relative_eq!(yu, 0.3);
    }

    #[test]
    fn assign_writes_four_columns() {
        let floors = UncertaintyFloors {
            x_abs: 0.1,
            y_abs: 0.2,
            ..Default::default()
        };
        let out = floors.assign(&[DataPoint::new(1.0, 2.0)]);
        assert_eq!(out, vec![DataPoint::with_uncertainties(1.0, 2.0, 0.1, 0.2)]);
    }
}
