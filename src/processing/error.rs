use crate::discretization::cloud::PointCloud;
use crate::discretization::neighbors::Stencils;
use crate::error::{GfdError, Result};
use glam::DVec2;
use nalgebra::DVector;

/// Area of a simple polygon by the shoelace formula.
pub fn polygon_area(vertices: &[DVec2]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|k| {
            let a = vertices[k];
            let b = vertices[(k + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    0.5 * twice.abs()
}

/// Area of the polygon spanned by each node's stencil neighbors, visited in
/// angular order around the node.
pub fn neighborhood_areas(cloud: &PointCloud, stencils: &Stencils) -> Vec<f64> {
    (0..cloud.len())
        .map(|i| {
            let center = cloud.position(i);
            let mut ring: Vec<DVec2> = stencils
                .neighbors(i)
                .iter()
                .map(|&j| cloud.position(j))
                .collect();
            ring.sort_by(|a, b| {
                let ta = (a.y - center.y).atan2(a.x - center.x);
                let tb = (b.y - center.y).atan2(b.x - center.x);
                ta.total_cmp(&tb)
            });
            polygon_area(&ring)
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorNorm {
    /// Largest absolute nodal difference.
    Max,
    /// Euclidean norm of the difference vector.
    L2,
    /// Root mean square of the nodal differences.
    Rms,
    /// `sqrt(mean(diff^2 * area))` with one area per node.
    AreaWeighted(Vec<f64>),
}

/// Compares a computed field with a reference solution.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorEvaluator {
    pub norm: ErrorNorm,
}

impl ErrorEvaluator {
    pub fn new(norm: ErrorNorm) -> Self {
        Self { norm }
    }

    /// Area-weighted RMS with areas taken from the stencil polygons.
    pub fn area_weighted(cloud: &PointCloud, stencils: &Stencils) -> Self {
        Self::new(ErrorNorm::AreaWeighted(neighborhood_areas(cloud, stencils)))
    }

    /// Error norm of `computed - reference`, or `None` when no reference is
    /// available.
    pub fn evaluate(
        &self,
        computed: &DVector<f64>,
        reference: Option<&DVector<f64>>,
    ) -> Result<Option<f64>> {
        let Some(reference) = reference else {
            return Ok(None);
        };
        if computed.len() != reference.len() {
            return Err(GfdError::InvalidConfiguration(format!(
                "computed field has {} values, reference has {}",
                computed.len(),
                reference.len()
            )));
        }
        let diff = computed - reference;
        let n = diff.len().max(1) as f64;

        let value = match &self.norm {
            ErrorNorm::Max => diff.amax(),
            ErrorNorm::L2 => diff.norm(),
            ErrorNorm::Rms => (diff.norm_squared() / n).sqrt(),
            ErrorNorm::AreaWeighted(areas) => {
                if areas.len() != diff.len() {
                    return Err(GfdError::InvalidConfiguration(format!(
                        "{} node areas for {} values",
                        areas.len(),
                        diff.len()
                    )));
                }
                let sum: f64 = diff.iter().zip(areas).map(|(d, a)| d * d * a).sum();
                (sum / n).sqrt()
            }
        };
        Ok(Some(value))
    }
}

/// Error per time level of a transient run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransientErrors {
    pub times: Vec<f64>,
    pub errors: Vec<f64>,
}

impl TransientErrors {
    pub fn push(&mut self, t: f64, error: f64) {
        self.times.push(t);
        self.errors.push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.errors.is_empty() {
            return None;
        }
        Some(self.errors.iter().sum::<f64>() / self.errors.len() as f64)
    }

    pub fn max(&self) -> Option<f64> {
        self.errors.iter().cloned().reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::regular_grid;
    use crate::discretization::neighbors::NeighborSelector;
    use approx::assert_relative_eq;

    #[test]
    fn shoelace_of_unit_square() {
        let sq = [
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(0.0, 1.0),
        ];
        assert_relative_eq!(polygon_area(&sq), 1.0);
        assert_eq!(polygon_area(&sq[..2]), 0.0);
    }

    #[test]
    fn interior_grid_node_area_is_four_cells() {
        let cloud = regular_grid(DVec2::ZERO, [1.0, 1.0], 4, 4);
        let stencils = NeighborSelector::default().select(&cloud).unwrap();
        let areas = neighborhood_areas(&cloud, &stencils);
        // 8-ring around (2, 2) spans a 2h x 2h square
        assert_relative_eq!(areas[2 * 5 + 2], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn norms_of_a_known_difference() {
        let a = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0, 2.0]);
        let eval = |norm| ErrorEvaluator::new(norm).evaluate(&a, Some(&b)).unwrap().unwrap();
        assert_relative_eq!(eval(ErrorNorm::Max), 2.0);
        assert_relative_eq!(eval(ErrorNorm::L2), 2.0);
        assert_relative_eq!(eval(ErrorNorm::Rms), 1.0);
        assert_relative_eq!(eval(ErrorNorm::AreaWeighted(vec![1.0, 1.0, 1.0, 0.25])), 0.5);
        assert_eq!(ErrorEvaluator::new(ErrorNorm::Max).evaluate(&a, None).unwrap(), None);
    }
}
