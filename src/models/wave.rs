use crate::physics::field::ScalarField;
use num_dual::DualNum;
use std::f64::consts::{PI, SQRT_2};

/// Standing wave `u = cos(sqrt(2) pi c t) sin(pi (x + y))`.
#[derive(Clone, Copy, Debug)]
pub struct StandingWaveCase {
    pub wave_speed: f64,
}

impl Default for StandingWaveCase {
    fn default() -> Self {
        Self {
            wave_speed: 0.5_f64.sqrt(),
        }
    }
}

impl ScalarField for StandingWaveCase {
    fn eval<D: DualNum<f64> + Copy>(&self, x: D, y: D, t: D) -> D {
        (t * D::from(SQRT_2 * PI * self.wave_speed)).cos() * ((x + y) * D::from(PI)).sin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    #[test]
    fn satisfies_the_wave_equation() {
        let case = StandingWaveCase::default();
        let c2 = case.wave_speed * case.wave_speed;
        let p = DVec2::new(0.2, 0.45);
        let t = 0.7;
        let residual = case.second_time_derivative(p, t) - c2 * case.laplacian(p, t);
        assert!(residual.abs() < 1e-12);
        // zero initial velocity
        assert!(case.time_derivative(p, 0.0).abs() < 1e-15);
    }
}
