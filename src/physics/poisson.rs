use crate::discretization::Discretization;
use crate::error::Result;
use crate::numerics::linear::{self, LinearSolverKind};
use crate::numerics::operators::{assemble_operator, DifferentialOperator};
use crate::physics::bc::{BCRegistry, SFn};
use crate::physics::sample_source;
use log::info;
use nalgebra::DVector;

/// Steady problem `L u = f` with Dirichlet values on every boundary node.
/// `L` is the Laplacian unless another operator is given.
#[derive(Clone, Debug)]
pub struct PoissonSolver {
    pub operator: DifferentialOperator,
    pub linear_solver: LinearSolverKind,
}

impl Default for PoissonSolver {
    fn default() -> Self {
        Self {
            operator: DifferentialOperator::laplacian(),
            linear_solver: LinearSolverKind::DenseLu,
        }
    }
}

impl PoissonSolver {
    pub fn solve(&self, disc: &Discretization, f: &SFn, bcs: &BCRegistry) -> Result<DVector<f64>> {
        let cloud = &disc.cloud;
        // boundary checks first: a cloud without prescribed values is singular
        let boundary = bcs.values(cloud, 0.0)?;

        let a = assemble_operator(cloud, &disc.weights, &self.operator);
        let mut rhs = sample_source(cloud, Some(f), 0.0);
        for (i, g) in boundary {
            rhs[i] = g;
        }

        let u = linear::solve(self.linear_solver, &a, &rhs)?;
        info!(
            "Poisson solve done: {} unknowns, nnz {}, max|u| = {:.4e}",
            u.len(),
            a.nnz(),
            u.amax()
        );
        Ok(u)
    }
}
