//! Manufactured solutions for the four equations and a driver that runs one
//! of them end to end and measures the error against the exact field.

pub mod advection_diffusion;
pub mod heat;
pub mod poisson;
pub mod wave;

use crate::config::{EquationKind, SimulationConfig};
use crate::discretization::Discretization;
use crate::error::{GfdError, Result};
use crate::numerics::transient::{TimeStepper, TransientResult, TransientSolver};
use crate::physics::bc::{BCRegistry, BoundarySelector, SFn};
use crate::physics::field::{field_values, parabolic_source, wave_source, ScalarField};
use crate::physics::parabolic::ParabolicStepper;
use crate::physics::poisson::PoissonSolver;
use crate::physics::wave::WaveStepper;
use crate::processing::error::{ErrorEvaluator, TransientErrors};
use advection_diffusion::GaussianPulseCase;
use heat::DecayingModeCase;
use log::info;
use nalgebra::DVector;
use poisson::ExponentialCase;
use std::sync::Arc;
use wave::StandingWaveCase;

/// Result of running a manufactured case.
#[derive(Clone, Debug)]
pub struct CaseOutcome {
    /// Final computed field.
    pub solution: DVector<f64>,
    /// Exact field at the final time.
    pub exact: DVector<f64>,
    /// Error per time level (a single entry for Poisson).
    pub errors: TransientErrors,
    pub transient: Option<TransientResult>,
}

fn dirichlet_from<F: ScalarField + 'static>(case: &Arc<F>) -> BCRegistry {
    BCRegistry::default().dirichlet(BoundarySelector::AnyBoundary, field_values(Arc::clone(case)))
}

/// Run the manufactured case of `config.equation` on `disc`.
/// `observer(step, t, u)` sees every time level; `should_stop` is polled
/// between steps.
pub fn run_case<O, Q>(
    config: &SimulationConfig,
    disc: &Discretization,
    evaluator: &ErrorEvaluator,
    observer: O,
    should_stop: Q,
) -> Result<CaseOutcome>
where
    O: FnMut(usize, f64, &DVector<f64>),
    Q: FnMut(usize, f64) -> bool,
{
    config.validate()?;
    let cloud = &disc.cloud;
    let scheme = config.time_scheme();
    let op = config.spatial_operator();
    info!("running the {} case on {} nodes", config.equation.name(), disc.len());

    match config.equation {
        EquationKind::Poisson => {
            let case = Arc::new(ExponentialCase);
            let bcs = dirichlet_from(&case);
            let rhs_case = Arc::clone(&case);
            let f: SFn = Arc::new(move |t, p| rhs_case.laplacian(p, t));
            let solver = PoissonSolver {
                operator: op,
                linear_solver: config.linear_solver,
            };
            let solution = solver.solve(disc, &f, &bcs)?;
            let exact = case.sample(cloud, 0.0);
            let mut errors = TransientErrors::default();
            if let Some(e) = evaluator.evaluate(&solution, Some(&exact))? {
                errors.push(0.0, e);
            }
            Ok(CaseOutcome {
                solution,
                exact,
                errors,
                transient: None,
            })
        }
        EquationKind::Heat => {
            let nu = config.diffusivity.unwrap_or_default();
            let case = Arc::new(DecayingModeCase { diffusivity: nu });
            let source = parabolic_source(Arc::clone(&case), op);
            let mut stepper = ParabolicStepper::heat(
                disc,
                nu,
                dirichlet_from(&case),
                Some(source),
                case.sample(cloud, 0.0),
                0.0,
                scheme,
            )?;
            march(config, disc, &mut stepper, case.as_ref(), evaluator, observer, should_stop)
        }
        EquationKind::AdvectionDiffusion => {
            let nu = config.diffusivity.unwrap_or_default();
            let velocity = config.velocity.unwrap_or_default();
            let case = Arc::new(GaussianPulseCase {
                diffusivity: nu,
                velocity,
            });
            let source = parabolic_source(Arc::clone(&case), op);
            let mut stepper = ParabolicStepper::advection_diffusion(
                disc,
                nu,
                velocity,
                dirichlet_from(&case),
                Some(source),
                case.sample(cloud, 0.0),
                0.0,
                scheme,
            )?;
            march(config, disc, &mut stepper, case.as_ref(), evaluator, observer, should_stop)
        }
        EquationKind::Wave => {
            let c = config.wave_speed.unwrap_or_default();
            let case = Arc::new(StandingWaveCase { wave_speed: c });
            let velocity = DVector::from_iterator(
                cloud.len(),
                cloud.nodes.iter().map(|n| case.time_derivative(n.position, 0.0)),
            );
            let mut stepper = WaveStepper::new(
                disc,
                c,
                dirichlet_from(&case),
                Some(wave_source(Arc::clone(&case), c)),
                case.sample(cloud, 0.0),
                velocity,
                0.0,
                scheme,
            )?;
            march(config, disc, &mut stepper, case.as_ref(), evaluator, observer, should_stop)
        }
    }
}

fn march<S, F, O, Q>(
    config: &SimulationConfig,
    disc: &Discretization,
    stepper: &mut S,
    case: &F,
    evaluator: &ErrorEvaluator,
    mut observer: O,
    should_stop: Q,
) -> Result<CaseOutcome>
where
    S: TimeStepper,
    F: ScalarField,
    O: FnMut(usize, f64, &DVector<f64>),
    Q: FnMut(usize, f64) -> bool,
{
    let solver = TransientSolver {
        num_steps: config.time.num_steps,
        steady_state: config.time.steady_state,
        log_every: config.time.log_every,
    };

    let mut errors = TransientErrors::default();
    let mut failure: Option<GfdError> = None;
    let result = solver.run(
        stepper,
        |step, t, u| {
            observer(step, t, u);
            let exact = case.sample(&disc.cloud, t);
            match evaluator.evaluate(u, Some(&exact)) {
                Ok(Some(e)) => errors.push(t, e),
                Ok(None) => {}
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        },
        should_stop,
    )?;
    if let Some(e) = failure {
        return Err(e);
    }

    info!(
        "{} case finished: {} steps, mean error {:.4e}",
        config.equation.name(),
        result.steps,
        errors.mean().unwrap_or(f64::NAN)
    );

    Ok(CaseOutcome {
        solution: stepper.current().clone(),
        exact: case.sample(&disc.cloud, stepper.time()),
        errors,
        transient: Some(result),
    })
}
