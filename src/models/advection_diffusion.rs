use crate::physics::field::ScalarField;
use num_dual::DualNum;

/// Gaussian pulse starting at (0.5, 0.5), carried by a constant velocity
/// while it spreads:
/// `u = exp(-((x - a t - 0.5)^2 + (y - b t - 0.5)^2) / (nu (4t + 1))) / (4t + 1)`.
#[derive(Clone, Copy, Debug)]
pub struct GaussianPulseCase {
    pub diffusivity: f64,
    pub velocity: [f64; 2],
}

impl Default for GaussianPulseCase {
    fn default() -> Self {
        Self {
            diffusivity: 0.1,
            velocity: [0.3, 0.2],
        }
    }
}

impl ScalarField for GaussianPulseCase {
    fn eval<D: DualNum<f64> + Copy>(&self, x: D, y: D, t: D) -> D {
        let spread = t * D::from(4.0) + D::from(1.0);
        let dx = x - t * D::from(self.velocity[0]) - D::from(0.5);
        let dy = y - t * D::from(self.velocity[1]) - D::from(0.5);
        (-(dx * dx + dy * dy) / (spread * D::from(self.diffusivity))).exp() / spread
    }
}
