use crate::discretization::cloud::PointCloud;
use crate::discretization::neighbors::NeighborSelector;
use crate::discretization::Discretization;
use crate::error::Result;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Identity of a discretization: the cloud geometry plus every selector
/// option that changes stencils or weights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DiscretizationKey {
    pub fingerprint: u64,
    pub k_min: usize,
    pub k_max: usize,
    /// Bit pattern of the weight exponent.
    pub weight_power: u64,
    pub max_condition: u64,
    pub domain_aware: bool,
}

impl DiscretizationKey {
    pub fn new(cloud: &PointCloud, selector: &NeighborSelector) -> Self {
        Self {
            fingerprint: cloud.fingerprint(),
            k_min: selector.k_min,
            k_max: selector.k_max,
            weight_power: selector.solver.weight_power.to_bits(),
            max_condition: selector.solver.max_condition.to_bits(),
            domain_aware: selector.domain_aware,
        }
    }
}

/// Caller-owned store of discretizations, so repeated runs on the same cloud
/// (other equations, other time steps) skip stencil and weight computation.
#[derive(Default)]
pub struct DiscretizationCache {
    entries: HashMap<DiscretizationKey, Arc<Discretization>>,
    hits: usize,
    misses: usize,
}

impl DiscretizationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(
        &mut self,
        cloud: &PointCloud,
        selector: &NeighborSelector,
    ) -> Result<Arc<Discretization>> {
        let key = DiscretizationKey::new(cloud, selector);
        if let Some(disc) = self.entries.get(&key) {
            self.hits += 1;
            debug!("discretization cache hit ({:016x})", key.fingerprint);
            return Ok(Arc::clone(disc));
        }
        self.misses += 1;
        let disc = Arc::new(Discretization::build(cloud.clone(), selector)?);
        self.entries.insert(key, Arc::clone(&disc));
        Ok(disc)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}
