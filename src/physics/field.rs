use std::sync::Arc;

use crate::discretization::cloud::PointCloud;
use crate::numerics::operators::DifferentialOperator;
use crate::physics::bc::SFn;
use glam::DVec2;
use nalgebra::DVector;
use num_dual::{Dual2_64, Dual64, DualNum, HyperDual64};

/// Analytic scalar field `u(x, y, t)`. Written once, generic over the number
/// type, so derivatives come from dual numbers instead of hand-derived
/// formulas.
pub trait ScalarField: Send + Sync {
    fn eval<D: DualNum<f64> + Copy>(&self, x: D, y: D, t: D) -> D;

    fn value(&self, p: DVec2, t: f64) -> f64 {
        self.eval(p.x, p.y, t)
    }

    fn gradient(&self, p: DVec2, t: f64) -> DVec2 {
        let c = |v: f64| Dual64::from(v);
        let ux = self.eval(Dual64::new(p.x, 1.0), c(p.y), c(t)).eps;
        let uy = self.eval(c(p.x), Dual64::new(p.y, 1.0), c(t)).eps;
        DVec2::new(ux, uy)
    }

    fn laplacian(&self, p: DVec2, t: f64) -> f64 {
        let c = |v: f64| Dual2_64::from(v);
        let uxx = self.eval(Dual2_64::new(p.x, 1.0, 0.0), c(p.y), c(t)).v2;
        let uyy = self.eval(c(p.x), Dual2_64::new(p.y, 1.0, 0.0), c(t)).v2;
        uxx + uyy
    }

    fn time_derivative(&self, p: DVec2, t: f64) -> f64 {
        let c = |v: f64| Dual64::from(v);
        self.eval(c(p.x), c(p.y), Dual64::new(t, 1.0)).eps
    }

    fn second_time_derivative(&self, p: DVec2, t: f64) -> f64 {
        let c = |v: f64| Dual2_64::from(v);
        self.eval(c(p.x), c(p.y), Dual2_64::new(t, 1.0, 0.0)).v2
    }

    /// `L u` for a general second-order operator.
    fn apply_operator(&self, op: &DifferentialOperator, p: DVec2, t: f64) -> f64 {
        let second = |ex: f64, ey: f64, fx: f64, fy: f64| {
            let x = HyperDual64::new(p.x, ex, fx, 0.0);
            let y = HyperDual64::new(p.y, ey, fy, 0.0);
            self.eval(x, y, HyperDual64::from(t)).eps1eps2
        };
        let grad = self.gradient(p, t);
        op.uxx * second(1.0, 0.0, 1.0, 0.0)
            + op.uxy * second(1.0, 0.0, 0.0, 1.0)
            + op.uyy * second(0.0, 1.0, 0.0, 1.0)
            + op.ux * grad.x
            + op.uy * grad.y
            + op.u * self.value(p, t)
    }

    /// Nodal values at time `t`.
    fn sample(&self, cloud: &PointCloud, t: f64) -> DVector<f64> {
        DVector::from_iterator(
            cloud.len(),
            cloud.nodes.iter().map(|n| self.value(n.position, t)),
        )
    }
}

/// Boundary-value function backed by a field.
pub fn field_values<F: ScalarField + 'static>(field: Arc<F>) -> SFn {
    Arc::new(move |t, p| field.value(p, t))
}

/// Source term `u_t - L u` that makes `field` solve `u_t = L u + s`.
pub fn parabolic_source<F: ScalarField + 'static>(field: Arc<F>, op: DifferentialOperator) -> SFn {
    Arc::new(move |t, p| field.time_derivative(p, t) - field.apply_operator(&op, p, t))
}

/// Source term `u_tt - c^2 lap(u)` that makes `field` solve the wave equation.
pub fn wave_source<F: ScalarField + 'static>(field: Arc<F>, wave_speed: f64) -> SFn {
    let c2 = wave_speed * wave_speed;
    Arc::new(move |t, p| field.second_time_derivative(p, t) - c2 * field.laplacian(p, t))
}
