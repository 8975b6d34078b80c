use gfd_rs::cache::DiscretizationCache;
use gfd_rs::config::{EquationKind, SimulationConfig};
use gfd_rs::discretization::cloud::{NodeKind, PointCloud};
use gfd_rs::discretization::generator::{perturbed_grid, square_with_hole};
use gfd_rs::discretization::neighbors::{NeighborSelector, Stencils};
use gfd_rs::discretization::Discretization;
use gfd_rs::error::GfdError;
use gfd_rs::numerics::operators::DifferentialOperator;
use gfd_rs::numerics::weights::WeightSolver;
use gfd_rs::physics::bc::{BCRegistry, BoundarySelector, SFn};
use gfd_rs::physics::poisson::PoissonSolver;
use glam::DVec2;
use std::sync::Arc;

#[test]
fn repeated_builds_are_bit_identical() {
    let cloud = square_with_hole(DVec2::ZERO, 1.0, 12, DVec2::new(0.4, 0.6), 0.15);
    let selector = NeighborSelector::default();
    let op = DifferentialOperator::advection_diffusion(0.05, [1.0, -0.5]);

    let first = Discretization::build(cloud.clone(), &selector).unwrap();
    let second = Discretization::build(cloud, &selector).unwrap();
    assert_eq!(first.stencils, second.stencils);
    assert_eq!(first.weights, second.weights);
    assert_eq!(first.spacing.to_bits(), second.spacing.to_bits());
    assert_eq!(first.assemble(&op), second.assemble(&op));
}

#[test]
fn cache_shares_one_discretization_per_cloud() {
    let mut cache = DiscretizationCache::new();
    let selector = NeighborSelector::default();
    let a = perturbed_grid(DVec2::ZERO, [1.0, 1.0], 8, 8, 0.2, 1);
    let b = perturbed_grid(DVec2::ZERO, [1.0, 1.0], 8, 8, 0.2, 2);

    let first = cache.get_or_build(&a, &selector).unwrap();
    let again = cache.get_or_build(&a, &selector).unwrap();
    let other = cache.get_or_build(&b, &selector).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert!(!Arc::ptr_eq(&first, &other));

    let wider = NeighborSelector {
        k_min: 10,
        ..selector
    };
    let rebuilt = cache.get_or_build(&a, &wider).unwrap();
    assert!(!Arc::ptr_eq(&first, &rebuilt));
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.stats(), (1, 3));
}

#[test]
fn collinear_cloud_has_no_valid_stencil() {
    let points = (0..12).map(|i| {
        let kind = if i == 0 || i == 11 {
            NodeKind::Boundary
        } else {
            NodeKind::Interior
        };
        (DVec2::new(i as f64 * 0.1, 0.0), kind)
    });
    let err = Discretization::build(PointCloud::new(points), &NeighborSelector::default())
        .err()
        .unwrap();
    println!("collinear cloud: {err}");
    assert!(matches!(err, GfdError::DegenerateStencil { .. }));
}

#[test]
fn forced_collinear_stencil_is_ill_conditioned() {
    let points = (0..7).map(|i| {
        let kind = if i == 3 {
            NodeKind::Interior
        } else {
            NodeKind::Boundary
        };
        (DVec2::new(i as f64, 0.0), kind)
    });
    let cloud = PointCloud::new(points);
    let mut lists = vec![Vec::new(); 7];
    lists[3] = vec![0, 1, 2, 4, 5, 6];
    let err = Discretization::from_stencils(cloud, Stencils::from_lists(lists), &WeightSolver::default())
        .err()
        .unwrap();
    assert!(matches!(err, GfdError::IllConditionedStencil { node: 3, .. }));
}

#[test]
fn configuration_and_boundary_errors() {
    let mut config = SimulationConfig::new(EquationKind::Poisson);
    config.stencil.k_min = 3;
    assert!(matches!(config.validate(), Err(GfdError::InvalidConfiguration(_))));

    let wave = SimulationConfig::new(EquationKind::Wave);
    assert!(matches!(wave.validate(), Err(GfdError::InvalidConfiguration(_))));

    // boundary nodes without a matching rule leave the system singular
    let disc = Discretization::build(
        square_with_hole(DVec2::ZERO, 1.0, 10, DVec2::new(0.5, 0.5), 0.2),
        &NeighborSelector::default(),
    )
    .unwrap();
    let outer_only = BCRegistry::default().dirichlet(BoundarySelector::Outer, 1.0);
    let f: SFn = Arc::new(|_, _| 0.0);
    let err = PoissonSolver::default().solve(&disc, &f, &outer_only).err().unwrap();
    assert!(matches!(err, GfdError::SingularOperator(_)));

    let both = outer_only.dirichlet(BoundarySelector::Hole(0), 0.0);
    assert!(PoissonSolver::default().solve(&disc, &f, &both).is_ok());
}
