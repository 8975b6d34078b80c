pub mod linear;
pub mod operators;
pub mod stability;
pub mod timing;
pub mod transient;
pub mod weights;

use nalgebra::DVector;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Tolerance {
    Absolute(f64),
    Relative(f64),
    Combined(f64, f64),
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceMetric {
    L2Norm,
    #[default]
    MaxNorm,
}

/// Steady-state test on the change of the field over one time step.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct Convergence {
    pub tolerance: Tolerance,
    #[serde(default)]
    pub metric: ConvergenceMetric,
}

impl Default for Convergence {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::Absolute(1e-10),
            metric: ConvergenceMetric::MaxNorm,
        }
    }
}

impl Convergence {
    pub fn norm(&self, vector: &DVector<f64>) -> f64 {
        match self.metric {
            ConvergenceMetric::L2Norm => vector.norm(),
            ConvergenceMetric::MaxNorm => vector.amax(),
        }
    }

    /// `reference` is the norm the relative tolerances are measured against.
    pub fn check_tolerance(&self, norm: f64, reference: f64) -> bool {
        match self.tolerance {
            Tolerance::Absolute(tol) => norm < tol,
            Tolerance::Relative(tol) => norm / reference < tol,
            Tolerance::Combined(abs_tol, rel_tol) => {
                norm < abs_tol || (norm / reference) < rel_tol
            }
        }
    }

    /// Whether the step from `previous` to `current` is small enough to call
    /// the run stationary.
    pub fn is_steady(&self, previous: &DVector<f64>, current: &DVector<f64>) -> (bool, f64) {
        let update = self.norm(&(current - previous));
        let reference = self.norm(current).max(f64::MIN_POSITIVE);
        (self.check_tolerance(update, reference), update)
    }
}
