pub mod cloud;
pub mod generator;
pub mod neighbors;

use crate::error::Result;
use crate::numerics::operators::{AssembledOperators, DifferentialOperator};
use crate::numerics::weights::{StencilWeights, WeightSolver};
use cloud::PointCloud;
use log::info;
use neighbors::{NeighborSelector, Stencils};

/// Everything derived from the geometry alone: stencils and derivative
/// weights. Built once per cloud and shared by every equation and time step.
#[derive(Clone, Debug)]
pub struct Discretization {
    pub cloud: PointCloud,
    pub stencils: Stencils,
    pub weights: StencilWeights,
    /// Smallest center-to-neighbor distance over interior stencils.
    pub spacing: f64,
}

impl Discretization {
    pub fn build(cloud: PointCloud, selector: &NeighborSelector) -> Result<Self> {
        let stencils = selector.select(&cloud)?;
        Self::from_stencils(cloud, stencils, &selector.solver)
    }

    /// Weights for externally chosen stencils, e.g. from a triangulation.
    pub fn from_stencils(cloud: PointCloud, stencils: Stencils, solver: &WeightSolver) -> Result<Self> {
        let weights = solver.compute(&cloud, &stencils)?;
        let spacing = stencils.min_interior_spacing(&cloud);
        info!(
            "discretization ready: {} nodes ({} boundary), h_min = {:.4e}",
            cloud.len(),
            cloud.num_boundary(),
            spacing
        );
        Ok(Self {
            cloud,
            stencils,
            weights,
            spacing,
        })
    }

    pub fn assemble(&self, spatial: &DifferentialOperator) -> AssembledOperators {
        AssembledOperators::assemble(&self.cloud, &self.weights, spatial)
    }

    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }
}
