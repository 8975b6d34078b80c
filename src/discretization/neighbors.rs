use super::cloud::PointCloud;
use crate::error::{GfdError, Result};
use crate::numerics::weights::WeightSolver;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Number of Taylor terms of a full second-order 2D expansion.
pub const MIN_STENCIL_SIZE: usize = 5;

/// Neighbor lists of every node stored back to back, indexed by node id.
/// The center node itself is not part of its list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stencils {
    offsets: Vec<usize>,
    indices: Vec<usize>,
}

impl Stencils {
    pub fn from_lists(lists: Vec<Vec<usize>>) -> Self {
        let mut offsets = Vec::with_capacity(lists.len() + 1);
        let mut indices = Vec::with_capacity(lists.iter().map(Vec::len).sum());
        offsets.push(0);
        for list in lists {
            indices.extend(list);
            offsets.push(indices.len());
        }
        Self { offsets, indices }
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.indices[self.offsets[i]..self.offsets[i + 1]]
    }

    pub fn max_size(&self) -> usize {
        (0..self.len()).map(|i| self.neighbors(i).len()).max().unwrap_or(0)
    }

    pub fn mean_size(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.indices.len() as f64 / self.len() as f64
    }

    /// Smallest center-to-neighbor distance over the stencils of interior
    /// nodes. This is the spacing the stability bounds are expressed in.
    pub fn min_interior_spacing(&self, cloud: &PointCloud) -> f64 {
        cloud
            .interior_indices()
            .into_iter()
            .flat_map(|i| {
                let p = cloud.position(i);
                self.neighbors(i)
                    .iter()
                    .map(move |&j| p.distance(cloud.position(j)))
            })
            .fold(f64::INFINITY, f64::min)
    }
}

/// Chooses a well-conditioned k-nearest stencil for every node.
#[derive(Clone, Copy, Debug)]
pub struct NeighborSelector {
    pub k_min: usize,
    /// Hard cap when enlarging a stencil that fails validation.
    pub k_max: usize,
    /// Reject neighbors whose connecting segment runs through a hole.
    pub domain_aware: bool,
    pub solver: WeightSolver,
}

impl Default for NeighborSelector {
    fn default() -> Self {
        Self {
            k_min: 8,
            k_max: 16,
            domain_aware: true,
            solver: WeightSolver::default(),
        }
    }
}

impl NeighborSelector {
    pub fn validate(&self) -> Result<()> {
        if self.k_min < MIN_STENCIL_SIZE {
            return Err(GfdError::InvalidConfiguration(format!(
                "k_min = {} is below the {} terms of a second-order expansion",
                self.k_min, MIN_STENCIL_SIZE
            )));
        }
        if self.k_max < self.k_min {
            return Err(GfdError::InvalidConfiguration(format!(
                "k_max = {} is smaller than k_min = {}",
                self.k_max, self.k_min
            )));
        }
        Ok(())
    }

    /// Select a stencil for every node of the cloud.
    pub fn select(&self, cloud: &PointCloud) -> Result<Stencils> {
        self.validate()?;

        let lists = (0..cloud.len())
            .into_par_iter()
            .map(|i| self.select_node(cloud, i))
            .collect::<Result<Vec<_>>>()?;

        let enlarged = lists
            .iter()
            .enumerate()
            .filter(|(i, l)| !cloud.is_boundary(*i) && l.len() > self.k_min)
            .count();
        if enlarged > 0 {
            warn!(
                "{enlarged} stencils needed more than k_min = {} neighbors",
                self.k_min
            );
        }
        let stencils = Stencils::from_lists(lists);
        info!(
            "selected stencils for {} nodes (mean size {:.2}, max {}, {} enlarged)",
            stencils.len(),
            stencils.mean_size(),
            stencils.max_size(),
            enlarged
        );
        Ok(stencils)
    }

    /// Stencil of node `i`: the `k_min` nearest admissible candidates, grown
    /// one at a time until the local system is well conditioned.
    pub fn select_node(&self, cloud: &PointCloud, i: usize) -> Result<Vec<usize>> {
        let candidates = self.candidates(cloud, i);

        if cloud.is_boundary(i) {
            return Ok(candidates.into_iter().take(self.k_min).collect());
        }

        let cap = self.k_max.min(candidates.len());
        for k in self.k_min.min(cap)..=cap {
            let stencil = &candidates[..k];
            if k >= MIN_STENCIL_SIZE && self.solver.accepts(cloud, i, stencil) {
                if k > self.k_min {
                    debug!("node {i}: stencil enlarged to {k} neighbors");
                }
                return Ok(stencil.to_vec());
            }
        }

        Err(GfdError::DegenerateStencil {
            node: i,
            max_neighbors: cap,
        })
    }

    /// Other nodes ordered by distance (ties by index), skipping coincident
    /// nodes and, when domain aware, nodes hidden behind a hole.
    pub fn candidates(&self, cloud: &PointCloud, i: usize) -> Vec<usize> {
        let origin = cloud.position(i);
        let mut by_distance: Vec<(f64, usize)> = cloud
            .nodes
            .iter()
            .filter(|n| n.id != i)
            .map(|n| (n.position.distance(origin), n.id))
            .filter(|(d, _)| *d > 0.0)
            .collect();
        by_distance.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let filter = self.domain_aware && !cloud.holes.is_empty();
        let mut out = Vec::with_capacity(self.k_max);
        for (_, j) in by_distance {
            if filter && cloud.segment_crosses_hole(origin, cloud.position(j)) {
                continue;
            }
            out.push(j);
            if out.len() == self.k_max {
                break;
            }
        }
        out
    }
}

/// Stencils from triangle adjacency: every node sharing a triangle with `i`,
/// in ascending index order, at most `max_neighbors` of them.
pub fn from_triangulation(
    cloud: &PointCloud,
    triangles: &[[usize; 3]],
    max_neighbors: usize,
) -> Result<Stencils> {
    let mut adjacency = vec![BTreeSet::new(); cloud.len()];
    for (t, tri) in triangles.iter().enumerate() {
        if let Some(&bad) = tri.iter().find(|&&v| v >= cloud.len()) {
            return Err(GfdError::InvalidConfiguration(format!(
                "triangle {t} references node {bad} but the cloud has {} nodes",
                cloud.len()
            )));
        }
        for &a in tri {
            for &b in tri {
                if a != b {
                    adjacency[a].insert(b);
                }
            }
        }
    }
    let lists = adjacency
        .into_iter()
        .map(|set| set.into_iter().take(max_neighbors).collect())
        .collect();
    Ok(Stencils::from_lists(lists))
}
