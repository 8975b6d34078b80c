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

/// Theta scheme for `u_t = L u + s` with Dirichlet rows:
///
/// `(I - theta dt L) u^{n+1} = (I + (1 - theta) dt L) u^n
///     + dt ((1 - theta) s^n + theta s^{n+1})`
///
/// The implicit matrix is factorized once at construction.
pub struct ParabolicStepper<'a> {
    disc: &'a Discretization,
    bcs: BCRegistry,
    source: Option<SFn>,
    scheme: TimeScheme,
    explicit: SparseOperator,
    system: Option<PreparedSystem>,
    t: f64,
    u: DVector<f64>,
}

impl<'a> ParabolicStepper<'a> {
    /// Generic constructor without stability checks.
    pub fn new(
        disc: &'a Discretization,
        operator: &DifferentialOperator,
        bcs: BCRegistry,
        source: Option<SFn>,
        mut initial: DVector<f64>,
        t0: f64,
        scheme: TimeScheme,
    ) -> Result<Self> {
        scheme.validate()?;
        if initial.len() != disc.len() {
            return Err(GfdError::InvalidConfiguration(format!(
                "initial state has {} values for {} nodes",
                initial.len(),
                disc.len()
            )));
        }
        bcs.apply(&disc.cloud, t0, &mut initial)?;

        let mask = disc.cloud.boundary_mask();
        let spatial = assemble_operator(&disc.cloud, &disc.weights, operator);
        let dt = scheme.dt;
        let explicit = spatial.affine_with_identity_rows(1.0, (1.0 - scheme.theta) * dt, &mask);
        let system = if scheme.is_explicit() {
            None
        } else {
            let implicit = spatial.affine_with_identity_rows(1.0, -scheme.theta * dt, &mask);
            Some(PreparedSystem::new(scheme.linear_solver, &implicit)?)
        };

        info!(
            "parabolic stepper: {} nodes, dt = {:.3e}, theta = {}",
            disc.len(),
            dt,
            scheme.theta
        );

        Ok(Self {
            disc,
            bcs,
            source,
            scheme,
            explicit,
            system,
            t: t0,
            u: initial,
        })
    }

    /// Heat equation `u_t = nu lap(u) + s`.
    pub fn heat(
        disc: &'a Discretization,
        diffusivity: f64,
        bcs: BCRegistry,
        source: Option<SFn>,
        initial: DVector<f64>,
        t0: f64,
        scheme: TimeScheme,
    ) -> Result<Self> {
        if diffusivity < 0.0 {
            return Err(GfdError::InvalidConfiguration(format!(
                "diffusivity must be non-negative, got {diffusivity}"
            )));
        }
        stability::check_diffusion(scheme.dt, diffusivity, disc.spacing, scheme.theta)?;
        Self::new(
            disc,
            &DifferentialOperator::diffusion(diffusivity),
            bcs,
            source,
            initial,
            t0,
            scheme,
        )
    }

    /// Advection-diffusion `u_t + a u_x + b u_y = nu lap(u) + s` with a
    /// constant velocity `(a, b)`.
    pub fn advection_diffusion(
        disc: &'a Discretization,
        diffusivity: f64,
        velocity: [f64; 2],
        bcs: BCRegistry,
        source: Option<SFn>,
        initial: DVector<f64>,
        t0: f64,
        scheme: TimeScheme,
    ) -> Result<Self> {
        if diffusivity < 0.0 {
            return Err(GfdError::InvalidConfiguration(format!(
                "diffusivity must be non-negative, got {diffusivity}"
            )));
        }
        stability::check_advection_diffusion(
            scheme.dt,
            diffusivity,
            velocity,
            disc.spacing,
            scheme.theta,
        )?;
        Self::new(
            disc,
            &DifferentialOperator::advection_diffusion(diffusivity, velocity),
            bcs,
            source,
            initial,
            t0,
            scheme,
        )
    }

    pub fn scheme(&self) -> &TimeScheme {
        &self.scheme
    }
}

impl TimeStepper for ParabolicStepper<'_> {
    fn time(&self) -> f64 {
        self.t
    }

    fn current(&self) -> &DVector<f64> {
        &self.u
    }

    fn step(&mut self) -> Result<()> {
        let cloud = &self.disc.cloud;
        let (dt, theta) = (self.scheme.dt, self.scheme.theta);
        let t_next = self.t + dt;

        let mut rhs = self.explicit.mul_vec(&self.u);
        if self.source.is_some() {
            let s_old = sample_source(cloud, self.source.as_ref(), self.t);
            let s_new = sample_source(cloud, self.source.as_ref(), t_next);
            rhs += (s_old * (1.0 - theta) + s_new * theta) * dt;
        }
        self.bcs.apply(cloud, t_next, &mut rhs)?;

        self.u = match &self.system {
            Some(system) => system.solve(&rhs)?,
            None => rhs,
        };
        self.t = t_next;
        Ok(())
    }
}
