use gfd_rs::config::{EquationKind, SimulationConfig};
use gfd_rs::discretization::generator::regular_grid;
use gfd_rs::discretization::neighbors::NeighborSelector;
use gfd_rs::discretization::Discretization;
use gfd_rs::error::GfdError;
use gfd_rs::models::run_case;
use gfd_rs::numerics::stability::{advection_limit, cfl_limit, diffusion_limit, wave_limit};
use gfd_rs::numerics::transient::{RunState, TimeStepper, TransientSolver};
use gfd_rs::numerics::{Convergence, ConvergenceMetric, Tolerance};
use gfd_rs::physics::bc::{BCRegistry, BoundarySelector, SFn};
use gfd_rs::physics::parabolic::ParabolicStepper;
use gfd_rs::physics::poisson::PoissonSolver;
use gfd_rs::physics::wave::WaveStepper;
use gfd_rs::physics::TimeScheme;
use gfd_rs::processing::error::{ErrorEvaluator, ErrorNorm};
use glam::DVec2;
use nalgebra::DVector;
use std::sync::Arc;

fn unit_square(n: usize) -> Discretization {
    Discretization::build(
        regular_grid(DVec2::ZERO, [1.0, 1.0], n, n),
        &NeighborSelector::default(),
    )
    .unwrap()
}

fn scheme(dt: f64, theta: f64) -> TimeScheme {
    TimeScheme {
        dt,
        theta,
        ..TimeScheme::default()
    }
}

#[test]
fn heat_relaxes_to_the_poisson_solution() {
    println!("Test: heat equation with steady boundary data");
    let disc = unit_square(10);
    let bcs = BCRegistry::default().dirichlet(BoundarySelector::AnyBoundary, |_: f64, p: DVec2| {
        p.x + p.y
    });

    let mut stepper = ParabolicStepper::heat(
        &disc,
        1.0,
        bcs.clone(),
        None,
        DVector::zeros(disc.len()),
        0.0,
        scheme(0.01, 1.0),
    )
    .unwrap();
    let solver = TransientSolver {
        num_steps: 5000,
        steady_state: Some(Convergence {
            tolerance: Tolerance::Absolute(1e-12),
            metric: ConvergenceMetric::MaxNorm,
        }),
        log_every: 0,
    };
    let result = solver.run(&mut stepper, |_, _, _| {}, |_, _| false).unwrap();
    println!("  converged after {} steps, t = {:.3}", result.steps, result.time);
    assert_eq!(result.state, RunState::Converged);

    let zero: SFn = Arc::new(|_, _| 0.0);
    let steady = PoissonSolver::default().solve(&disc, &zero, &bcs).unwrap();
    let diff = (stepper.current() - &steady).amax();
    println!("  max difference to the Poisson solution {diff:.3e}");
    assert!(diff < 1e-6);
}

#[test]
fn heat_decaying_mode_with_crank_nicolson() {
    let disc = unit_square(16);
    let mut config = SimulationConfig::new(EquationKind::Heat);
    config.diffusivity = Some(0.2);
    config.time.dt = 0.01;
    config.time.theta = 0.5;
    config.time.num_steps = 100;

    let outcome = run_case(
        &config,
        &disc,
        &ErrorEvaluator::new(ErrorNorm::Max),
        |_, _, _| {},
        |_, _| false,
    )
    .unwrap();
    let max = outcome.errors.max().unwrap();
    println!("heat, theta = 0.5: max error over time {max:.3e}");
    assert_eq!(outcome.errors.len(), 101);
    assert!(max < 1e-2);
}

#[test]
fn advection_diffusion_tracks_the_moving_pulse() {
    let disc = unit_square(20);
    let mut config = SimulationConfig::new(EquationKind::AdvectionDiffusion);
    config.diffusivity = Some(0.1);
    config.velocity = Some([0.3, 0.2]);
    config.time.dt = 0.002;
    config.time.num_steps = 250;

    let outcome = run_case(
        &config,
        &disc,
        &ErrorEvaluator::new(ErrorNorm::Max),
        |_, _, _| {},
        |_, _| false,
    )
    .unwrap();
    let result = outcome.transient.unwrap();
    let max = outcome.errors.max().unwrap();
    println!(
        "advection-diffusion: {} steps to t = {:.3}, max error {max:.3e}",
        result.steps, result.time
    );
    assert_eq!(result.state, RunState::Finished);
    assert!((result.time - 0.5).abs() < 1e-9);
    assert!(max < 0.02);
}

#[test]
fn standing_wave_explicit_and_implicit() {
    let disc = unit_square(20);
    let cases = [
        ("leap-frog", 0.01, 0.0, 100, 0.05),
        ("theta = 1/4", 0.08, 0.25, 25, 0.1),
    ];
    for (name, dt, theta, steps, tolerance) in cases {
        let mut config = SimulationConfig::new(EquationKind::Wave);
        config.wave_speed = Some(0.5_f64.sqrt());
        config.time.dt = dt;
        config.time.theta = theta;
        config.time.num_steps = steps;

        let outcome = run_case(
            &config,
            &disc,
            &ErrorEvaluator::new(ErrorNorm::Max),
            |_, _, _| {},
            |_, _| false,
        )
        .unwrap();
        let max = outcome.errors.max().unwrap();
        println!("wave, {name}: max error {max:.3e}");
        assert!(max < tolerance, "{name}: error {max:.3e}");
    }
}

#[test]
fn wave_keeps_mirror_symmetry() {
    let n = 16;
    let disc = Discretization::build(
        regular_grid(DVec2::new(-1.0, -1.0), [2.0, 2.0], n, n),
        &NeighborSelector::default(),
    )
    .unwrap();
    let bump = DVector::from_iterator(
        disc.len(),
        disc.cloud
            .nodes
            .iter()
            .map(|node| (-4.0 * node.position.length_squared()).exp()),
    );
    let bcs = BCRegistry::default().dirichlet(BoundarySelector::AnyBoundary, 0.0);
    let mut stepper = WaveStepper::new(
        &disc,
        1.0,
        bcs,
        None,
        bump,
        DVector::zeros(disc.len()),
        0.0,
        scheme(0.05, 0.0),
    )
    .unwrap();
    for _ in 0..50 {
        stepper.step().unwrap();
    }

    let u = stepper.current();
    let index = |i: usize, j: usize| j * (n + 1) + i;
    let mut worst: f64 = 0.0;
    for j in 0..=n {
        for i in 0..=n {
            let k = index(i, j);
            worst = worst
                .max((u[k] - u[index(n - i, j)]).abs())
                .max((u[k] - u[index(i, n - j)]).abs())
                .max((u[k] - u[index(j, i)]).abs());
        }
    }
    println!("wave symmetry defect after 50 steps: {worst:.3e}");
    assert!(u.amax() > 1e-3);
    assert!(worst < 1e-10);
}

#[test]
fn explicit_limits_are_enforced_at_the_boundary() {
    let disc = unit_square(10);
    assert!((disc.spacing - 0.1).abs() < 1e-12);

    let limit = diffusion_limit(1.0, disc.spacing, 0.0).unwrap();
    assert!((limit - 0.0025).abs() < 1e-12);

    let heat = |dt: f64, theta: f64| {
        ParabolicStepper::heat(
            &disc,
            1.0,
            BCRegistry::default().dirichlet(BoundarySelector::AnyBoundary, 0.0),
            None,
            DVector::zeros(disc.len()),
            0.0,
            scheme(dt, theta),
        )
        .map(|_| ())
    };
    assert!(heat(limit * (1.0 - 1e-9), 0.0).is_ok());
    match heat(limit * (1.0 + 1e-6), 0.0) {
        Err(GfdError::UnstableTimeStep { criterion, .. }) => assert_eq!(criterion, "diffusion number"),
        other => panic!("expected a diffusion number violation, got {other:?}"),
    }
    assert!(heat(100.0 * limit, 0.5).is_ok());

    // central advection needs diffusion to damp it below theta = 1/2
    let velocity = [1.0, 1.0];
    let cfl = cfl_limit(velocity, disc.spacing, 0.0).unwrap();
    let advect = |nu: f64, dt: f64| {
        ParabolicStepper::advection_diffusion(
            &disc,
            nu,
            velocity,
            BCRegistry::default().dirichlet(BoundarySelector::AnyBoundary, 0.0),
            None,
            DVector::zeros(disc.len()),
            0.0,
            scheme(dt, 0.0),
        )
        .map(|_| ())
    };
    let criterion_of = |r: Result<(), GfdError>| match r {
        Err(GfdError::UnstableTimeStep { criterion, .. }) => criterion,
        other => panic!("expected an unstable time step, got {other:?}"),
    };
    assert_eq!(criterion_of(advect(0.0, 0.5 * cfl)), "central advection");
    assert_eq!(criterion_of(advect(0.0, 1.2 * cfl)), "CFL");

    let nu = 0.01;
    let central = advection_limit(nu, velocity, 0.0).unwrap();
    assert!(central < cfl);
    assert!(advect(nu, 0.5 * central).is_ok());
    assert_eq!(criterion_of(advect(nu, 2.0 * central)), "central advection");
    assert_eq!(criterion_of(advect(nu, 1.2 * cfl)), "CFL");

    let wave = wave_limit(1.0, disc.spacing, 0.0).unwrap();
    let mut config = SimulationConfig::new(EquationKind::Wave);
    config.wave_speed = Some(1.0);
    config.time.dt = 1.01 * wave;
    let err = run_case(
        &config,
        &disc,
        &ErrorEvaluator::new(ErrorNorm::Max),
        |_, _, _| {},
        |_, _| false,
    )
    .err()
    .unwrap();
    assert!(matches!(err, GfdError::UnstableTimeStep { criterion: "wave CFL", .. }));
}

#[test]
fn run_stops_when_asked() {
    let disc = unit_square(8);
    let mut config = SimulationConfig::new(EquationKind::Heat);
    config.diffusivity = Some(0.2);
    config.time.dt = 1e-3;
    config.time.num_steps = 100;

    let mut seen = Vec::new();
    let outcome = run_case(
        &config,
        &disc,
        &ErrorEvaluator::new(ErrorNorm::Rms),
        |step, _, _| seen.push(step),
        |step, _| step >= 5,
    )
    .unwrap();
    let result = outcome.transient.unwrap();
    assert_eq!(result.state, RunState::Stopped);
    assert_eq!(result.steps, 5);
    assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
}
