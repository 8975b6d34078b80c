use crate::physics::field::ScalarField;
use num_dual::DualNum;

/// `u = 2 exp(2x + y)`, so `lap(u) = 10 exp(2x + y)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExponentialCase;

impl ScalarField for ExponentialCase {
    fn eval<D: DualNum<f64> + Copy>(&self, x: D, y: D, _t: D) -> D {
        (x * D::from(2.0) + y).exp() * D::from(2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::DVec2;

    #[test]
    fn source_matches_closed_form() {
        let p = DVec2::new(0.3, -0.4);
        let f = 10.0 * (2.0 * p.x + p.y).exp();
        assert_relative_eq!(ExponentialCase.laplacian(p, 0.0), f, epsilon = 1e-12);
    }
}
