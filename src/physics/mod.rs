pub mod bc;
pub mod field;
pub mod parabolic;
pub mod poisson;
pub mod wave;

use crate::discretization::cloud::PointCloud;
use crate::error::{GfdError, Result};
use crate::numerics::linear::LinearSolverKind;
use bc::SFn;
use nalgebra::DVector;

/// Time discretization shared by the transient equations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeScheme {
    pub dt: f64,
    /// Implicitness: 0 explicit, 0.5 Crank-Nicolson, 1 backward Euler for the
    /// parabolic equations; 0 leap-frog, 0.25 and above unconditionally
    /// stable for the wave equation.
    pub theta: f64,
    pub linear_solver: LinearSolverKind,
}

impl Default for TimeScheme {
    fn default() -> Self {
        Self {
            dt: 1e-3,
            theta: 0.0,
            linear_solver: LinearSolverKind::DenseLu,
        }
    }
}

impl TimeScheme {
    pub fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(GfdError::InvalidConfiguration(format!(
                "time step must be positive, got {}",
                self.dt
            )));
        }
        if !(0.0..=1.0).contains(&self.theta) {
            return Err(GfdError::InvalidConfiguration(format!(
                "theta must lie in [0, 1], got {}",
                self.theta
            )));
        }
        Ok(())
    }

    pub fn is_explicit(&self) -> bool {
        self.theta == 0.0
    }
}

/// Source values at interior nodes, zero on the boundary.
pub(crate) fn sample_source(cloud: &PointCloud, source: Option<&SFn>, t: f64) -> DVector<f64> {
    match source {
        Some(s) => DVector::from_iterator(
            cloud.len(),
            cloud
                .nodes
                .iter()
                .map(|n| if n.kind.is_boundary() { 0.0 } else { s(t, n.position) }),
        ),
        None => DVector::zeros(cloud.len()),
    }
}
