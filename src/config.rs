use crate::discretization::neighbors::{NeighborSelector, MIN_STENCIL_SIZE};
use crate::error::{GfdError, Result};
use crate::numerics::linear::LinearSolverKind;
use crate::numerics::operators::DifferentialOperator;
use crate::numerics::weights::WeightSolver;
use crate::numerics::Convergence;
use crate::physics::TimeScheme;
use serde::Deserialize;
use std::path::Path;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EquationKind {
    Poisson,
    Heat,
    AdvectionDiffusion,
    Wave,
}

impl EquationKind {
    pub fn is_transient(&self) -> bool {
        !matches!(self, EquationKind::Poisson)
    }

    pub fn name(&self) -> &'static str {
        match self {
            EquationKind::Poisson => "poisson",
            EquationKind::Heat => "heat",
            EquationKind::AdvectionDiffusion => "advection_diffusion",
            EquationKind::Wave => "wave",
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct StencilConfig {
    pub k_min: usize,
    pub k_max: usize,
    pub weight_power: f64,
    pub max_condition: f64,
    pub domain_aware: bool,
}

impl Default for StencilConfig {
    fn default() -> Self {
        Self {
            k_min: 8,
            k_max: 16,
            weight_power: 2.0,
            max_condition: 1e12,
            domain_aware: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeConfig {
    pub dt: f64,
    pub num_steps: usize,
    pub theta: f64,
    pub log_every: usize,
    /// Stop early once the per-step update satisfies this criterion.
    pub steady_state: Option<Convergence>,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            dt: 1e-3,
            num_steps: 100,
            theta: 0.0,
            log_every: 10,
            steady_state: None,
        }
    }
}

/// Options of one simulation run, usually read from a TOML file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SimulationConfig {
    pub equation: EquationKind,
    #[serde(default)]
    pub stencil: StencilConfig,
    #[serde(default)]
    pub time: TimeConfig,
    pub diffusivity: Option<f64>,
    pub velocity: Option<[f64; 2]>,
    pub wave_speed: Option<f64>,
    #[serde(default)]
    pub linear_solver: LinearSolverKind,
}

impl SimulationConfig {
    pub fn new(equation: EquationKind) -> Self {
        Self {
            equation,
            stencil: StencilConfig::default(),
            time: TimeConfig::default(),
            diffusivity: None,
            velocity: None,
            wave_speed: None,
            linear_solver: LinearSolverKind::default(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| GfdError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check that every option the equation needs is present and in range.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(GfdError::InvalidConfiguration(msg));
        let s = &self.stencil;
        if s.k_min < MIN_STENCIL_SIZE {
            return invalid(format!("stencil.k_min = {} must be at least {MIN_STENCIL_SIZE}", s.k_min));
        }
        if s.k_max < s.k_min {
            return invalid(format!("stencil.k_max = {} is below k_min = {}", s.k_max, s.k_min));
        }
        if !(s.weight_power >= 0.0 && s.weight_power.is_finite()) {
            return invalid(format!("stencil.weight_power = {} must be >= 0", s.weight_power));
        }
        if !(s.max_condition > 1.0) {
            return invalid(format!("stencil.max_condition = {} must exceed 1", s.max_condition));
        }

        if self.equation.is_transient() {
            self.time_scheme().validate()?;
            if self.time.num_steps == 0 {
                return invalid("time.num_steps must be positive".into());
            }
        }

        match self.equation {
            EquationKind::Poisson => {}
            EquationKind::Heat => {
                self.require_diffusivity()?;
            }
            EquationKind::AdvectionDiffusion => {
                // the moving pulse spreads with nu, so it has no nu = 0 limit
                let nu = self.require_diffusivity()?;
                if nu == 0.0 {
                    return invalid("advection_diffusion requires diffusivity > 0".into());
                }
                match self.velocity {
                    Some(v) if v.iter().all(|c| c.is_finite()) => {}
                    Some(v) => return invalid(format!("velocity {v:?} is not finite")),
                    None => return invalid("advection_diffusion requires `velocity = [a, b]`".into()),
                }
            }
            EquationKind::Wave => match self.wave_speed {
                Some(c) if c > 0.0 && c.is_finite() => {}
                Some(c) => return invalid(format!("wave_speed = {c} must be positive")),
                None => return invalid("wave requires `wave_speed`".into()),
            },
        }
        Ok(())
    }

    fn require_diffusivity(&self) -> Result<f64> {
        match self.diffusivity {
            Some(nu) if nu >= 0.0 && nu.is_finite() => Ok(nu),
            Some(nu) => Err(GfdError::InvalidConfiguration(format!(
                "diffusivity = {nu} must be non-negative"
            ))),
            None => Err(GfdError::InvalidConfiguration(format!(
                "{} requires `diffusivity`",
                self.equation.name()
            ))),
        }
    }

    pub fn selector(&self) -> NeighborSelector {
        NeighborSelector {
            k_min: self.stencil.k_min,
            k_max: self.stencil.k_max,
            domain_aware: self.stencil.domain_aware,
            solver: WeightSolver {
                weight_power: self.stencil.weight_power,
                max_condition: self.stencil.max_condition,
            },
        }
    }

    pub fn time_scheme(&self) -> TimeScheme {
        TimeScheme {
            dt: self.time.dt,
            theta: self.time.theta,
            linear_solver: self.linear_solver,
        }
    }

    /// Right-hand side operator `L` of the equation (`L u = f` for Poisson,
    /// `u_t = L u + s` otherwise, `u_tt = L u + s` for Wave).
    pub fn spatial_operator(&self) -> DifferentialOperator {
        let nu = self.diffusivity.unwrap_or(0.0);
        match self.equation {
            EquationKind::Poisson => DifferentialOperator::laplacian(),
            EquationKind::Heat => DifferentialOperator::diffusion(nu),
            EquationKind::AdvectionDiffusion => {
                DifferentialOperator::advection_diffusion(nu, self.velocity.unwrap_or([0.0, 0.0]))
            }
            EquationKind::Wave => {
                let c = self.wave_speed.unwrap_or(0.0);
                DifferentialOperator::diffusion(c * c)
            }
        }
    }
}
