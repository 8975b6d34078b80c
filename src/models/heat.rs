use crate::physics::field::ScalarField;
use num_dual::DualNum;
use std::f64::consts::PI;

/// Decaying mode `u = exp(-2 pi^2 nu t) cos(pi x) cos(pi y)` of `u_t = nu lap(u)`.
#[derive(Clone, Copy, Debug)]
pub struct DecayingModeCase {
    pub diffusivity: f64,
}

impl Default for DecayingModeCase {
    fn default() -> Self {
        Self { diffusivity: 0.2 }
    }
}

impl ScalarField for DecayingModeCase {
    fn eval<D: DualNum<f64> + Copy>(&self, x: D, y: D, t: D) -> D {
        let pi = D::from(PI);
        (t * D::from(-2.0 * PI * PI * self.diffusivity)).exp() * (x * pi).cos() * (y * pi).cos()
    }
}
