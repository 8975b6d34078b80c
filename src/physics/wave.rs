use crate::discretization::Discretization;
use crate::error::{GfdError, Result};
use crate::numerics::linear::PreparedSystem;
use crate::numerics::operators::{assemble_operator, DifferentialOperator, SparseOperator};
use crate::numerics::stability;
use crate::numerics::transient::TimeStepper;
use crate::physics::bc::{BCRegistry, SFn};
use crate::physics::{sample_source, TimeScheme};
use log::info;
use nalgebra::DVector;

/// The two most recent time levels.
#[derive(Clone, Debug)]
pub struct History {
    levels: [DVector<f64>; 2],
    head: usize,
}

impl History {
    pub fn new(previous: DVector<f64>, current: DVector<f64>) -> Self {
        Self {
            levels: [previous, current],
            head: 1,
        }
    }

    pub fn current(&self) -> &DVector<f64> {
        &self.levels[self.head]
    }

    pub fn previous(&self) -> &DVector<f64> {
        &self.levels[1 - self.head]
    }

    /// Make `next` the current level; the old current becomes previous and
    /// the oldest level is dropped.
    pub fn push(&mut self, next: DVector<f64>) {
        self.head = 1 - self.head;
        self.levels[self.head] = next;
    }
}

/// Wave equation `u_tt = c^2 lap(u) + s` with the theta-weighted three-level
/// scheme (`K = c^2 dt^2 L`):
///
/// `(I - theta K) u^{n+1} = 2 u^n + (1 - 2 theta) K u^n - u^{n-1} + theta K u^{n-1}`
///
/// `theta = 0` is explicit leap-frog. The first step is the Taylor start
/// `(I - theta K / 2) u^1 = u^0 + dt v^0 + (1 - theta) K u^0 / 2`.
pub struct WaveStepper<'a> {
    disc: &'a Discretization,
    bcs: BCRegistry,
    source: Option<SFn>,
    scheme: TimeScheme,
    /// `K` with zeroed boundary rows.
    stiffness: SparseOperator,
    start: Option<PreparedSystem>,
    system: Option<PreparedSystem>,
    /// Initial velocity, consumed by the first step.
    velocity: Option<DVector<f64>>,
    history: History,
    t: f64,
}

impl<'a> WaveStepper<'a> {
    pub fn new(
        disc: &'a Discretization,
        wave_speed: f64,
        bcs: BCRegistry,
        source: Option<SFn>,
        mut displacement: DVector<f64>,
        velocity: DVector<f64>,
        t0: f64,
        scheme: TimeScheme,
    ) -> Result<Self> {
        scheme.validate()?;
        if displacement.len() != disc.len() || velocity.len() != disc.len() {
            return Err(GfdError::InvalidConfiguration(format!(
                "initial displacement/velocity have {}/{} values for {} nodes",
                displacement.len(),
                velocity.len(),
                disc.len()
            )));
        }
        if !(wave_speed > 0.0 && wave_speed.is_finite()) {
            return Err(GfdError::InvalidConfiguration(format!(
                "wave speed must be positive, got {wave_speed}"
            )));
        }
        stability::check_wave(scheme.dt, wave_speed, disc.spacing, scheme.theta)?;
        bcs.apply(&disc.cloud, t0, &mut displacement)?;

        let mask = disc.cloud.boundary_mask();
        let k = (wave_speed * scheme.dt).powi(2);
        let laplacian = assemble_operator(&disc.cloud, &disc.weights, &DifferentialOperator::laplacian());
        let stiffness = interior_rows(&laplacian, k, &mask);

        let theta = scheme.theta;
        let (start, system) = if theta == 0.0 {
            (None, None)
        } else {
            let a1 = laplacian.affine_with_identity_rows(1.0, -0.5 * theta * k, &mask);
            let a = laplacian.affine_with_identity_rows(1.0, -theta * k, &mask);
            (
                Some(PreparedSystem::new(scheme.linear_solver, &a1)?),
                Some(PreparedSystem::new(scheme.linear_solver, &a)?),
            )
        };

        info!(
            "wave stepper: {} nodes, c = {}, dt = {:.3e}, theta = {}",
            disc.len(),
            wave_speed,
            scheme.dt,
            theta
        );

        Ok(Self {
            disc,
            bcs,
            source,
            scheme,
            stiffness,
            start,
            system,
            velocity: Some(velocity),
            history: History::new(displacement.clone(), displacement),
            t: t0,
        })
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    fn source_at(&self, t: f64) -> DVector<f64> {
        sample_source(&self.disc.cloud, self.source.as_ref(), t)
    }
}

/// `scale * a` with the masked rows emptied.
fn interior_rows(a: &SparseOperator, scale: f64, mask: &[bool]) -> SparseOperator {
    SparseOperator::from_rows(
        a.ncols(),
        (0..a.nrows()).map(|i| {
            if mask[i] {
                (Vec::new(), Vec::new())
            } else {
                let (cols, vals) = a.row(i);
                (cols.to_vec(), vals.iter().map(|v| scale * v).collect())
            }
        }),
    )
}

impl TimeStepper for WaveStepper<'_> {
    fn time(&self) -> f64 {
        self.t
    }

    fn current(&self) -> &DVector<f64> {
        self.history.current()
    }

    fn step(&mut self) -> Result<()> {
        let (dt, theta) = (self.scheme.dt, self.scheme.theta);
        let t_next = self.t + dt;
        let dt2 = dt * dt;
        let u = self.history.current();

        let (mut rhs, system) = match self.velocity.take() {
            Some(v0) => {
                let mut rhs = u + v0 * dt + self.stiffness.mul_vec(u) * (0.5 * (1.0 - theta));
                if self.source.is_some() {
                    let s = self.source_at(self.t) * (1.0 - theta) + self.source_at(t_next) * theta;
                    rhs += s * (0.5 * dt2);
                }
                (rhs, self.start.as_ref())
            }
            None => {
                let u_prev = self.history.previous();
                let mut rhs = u * 2.0 - u_prev
                    + self.stiffness.mul_vec(u) * (1.0 - 2.0 * theta)
                    + self.stiffness.mul_vec(u_prev) * theta;
                if self.source.is_some() {
                    let s = self.source_at(t_next) * theta
                        + self.source_at(self.t) * (1.0 - 2.0 * theta)
                        + self.source_at(self.t - dt) * theta;
                    rhs += s * dt2;
                }
                (rhs, self.system.as_ref())
            }
        };
        self.bcs.apply(&self.disc.cloud, t_next, &mut rhs)?;

        let next = match system {
            Some(system) => system.solve(&rhs)?,
            None => rhs,
        };
        self.history.push(next);
        self.t = t_next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::regular_grid;
    use crate::discretization::neighbors::NeighborSelector;
    use crate::physics::bc::BoundarySelector;
    use glam::DVec2;

    #[test]
    fn ring_buffer_keeps_two_levels() {
        let mut h = History::new(DVector::from_element(1, 0.0), DVector::from_element(1, 1.0));
        h.push(DVector::from_element(1, 2.0));
        assert_eq!(h.previous()[0], 1.0);
        assert_eq!(h.current()[0], 2.0);
        h.push(DVector::from_element(1, 3.0));
        assert_eq!(h.previous()[0], 2.0);
        assert_eq!(h.current()[0], 3.0);
    }

    #[test]
    fn rest_state_stays_at_rest() {
        let disc = Discretization::build(
            regular_grid(DVec2::ZERO, [1.0, 1.0], 8, 8),
            &NeighborSelector::default(),
        )
        .unwrap();
        let bcs = BCRegistry::default().dirichlet(BoundarySelector::AnyBoundary, 0.0);
        let zero = DVector::zeros(disc.len());
        for theta in [0.0, 0.5] {
            let scheme = TimeScheme {
                dt: 0.01,
                theta,
                ..Default::default()
            };
            let mut w =
                WaveStepper::new(&disc, 1.0, bcs.clone(), None, zero.clone(), zero.clone(), 0.0, scheme)
                    .unwrap();
            for _ in 0..10 {
                w.step().unwrap();
            }
            assert!(w.current().amax() < 1e-14);
        }
    }

    #[test]
    fn large_explicit_step_is_rejected() {
        let disc = Discretization::build(
            regular_grid(DVec2::ZERO, [1.0, 1.0], 8, 8),
            &NeighborSelector::default(),
        )
        .unwrap();
        let bcs = BCRegistry::default().dirichlet(BoundarySelector::AnyBoundary, 0.0);
        let zero = DVector::zeros(disc.len());
        let scheme = TimeScheme {
            dt: disc.spacing,
            ..Default::default()
        };
        let err = WaveStepper::new(&disc, 1.0, bcs, None, zero.clone(), zero, 0.0, scheme)
            .err()
            .unwrap();
        assert!(matches!(err, GfdError::UnstableTimeStep { criterion: "wave CFL", .. }));
    }
}
