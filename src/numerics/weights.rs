use crate::discretization::cloud::PointCloud;
use crate::discretization::neighbors::Stencils;
use crate::error::{GfdError, Result};
use crate::numerics::timing::record_weights;
use log::info;
use nalgebra::{Matrix5, Vector5};
use rayon::prelude::*;

/// Partial derivatives approximated by the local fit, in the order of the
/// Taylor monomials `(dx, dy, dx^2/2, dy^2/2, dx*dy)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Derivative {
    X = 0,
    Y = 1,
    XX = 2,
    YY = 3,
    XY = 4,
}

impl Derivative {
    pub const ALL: [Derivative; 5] = [
        Derivative::X,
        Derivative::Y,
        Derivative::XX,
        Derivative::YY,
        Derivative::XY,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Local weighted least-squares system of one stencil, built on offsets
/// scaled by the stencil radius.
pub struct LocalFit {
    pub normal: Matrix5<f64>,
    rows: Vec<Vector5<f64>>,
    weights: Vec<f64>,
    radius: f64,
}

impl LocalFit {
    /// Ratio of the extreme eigenvalues of the (symmetric) normal matrix.
    /// Infinite when the matrix is not positive definite.
    pub fn condition_number(&self) -> f64 {
        let eig = self.normal.symmetric_eigenvalues();
        let (lo, hi) = eig
            .iter()
            .fold((f64::INFINITY, 0.0_f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if lo <= 0.0 || !lo.is_finite() {
            f64::INFINITY
        } else {
            hi / lo
        }
    }
}

/// Derivative weights of one node: column indices (center first) and, per
/// column, one coefficient per [`Derivative`].
#[derive(Clone, Debug, PartialEq)]
pub struct NodeWeights {
    pub columns: Vec<usize>,
    pub coefficients: Vec<[f64; 5]>,
}

/// Solves the local GFD least-squares problem of each stencil.
#[derive(Clone, Copy, Debug)]
pub struct WeightSolver {
    /// Exponent `p` of the distance weight `w = 1 / |d|^p`.
    pub weight_power: f64,
    /// Largest accepted condition number of the local normal matrix.
    pub max_condition: f64,
}

impl Default for WeightSolver {
    fn default() -> Self {
        Self {
            weight_power: 2.0,
            max_condition: 1e12,
        }
    }
}

impl WeightSolver {
    /// Build the normal matrix `M^T W M` for `center` and `neighbors`.
    /// Returns `None` for an empty stencil or coincident nodes.
    pub fn local_fit(&self, cloud: &PointCloud, center: usize, neighbors: &[usize]) -> Option<LocalFit> {
        let origin = cloud.position(center);
        let radius = neighbors
            .iter()
            .map(|&j| cloud.position(j).distance(origin))
            .fold(0.0_f64, f64::max);
        if neighbors.is_empty() || radius <= 0.0 {
            return None;
        }

        let mut normal = Matrix5::<f64>::zeros();
        let mut rows = Vec::with_capacity(neighbors.len());
        let mut weights = Vec::with_capacity(neighbors.len());
        for &j in neighbors {
            let d = (cloud.position(j) - origin) / radius;
            let dist = d.length();
            if dist <= 0.0 {
                return None;
            }
            let m = Vector5::new(d.x, d.y, 0.5 * d.x * d.x, 0.5 * d.y * d.y, d.x * d.y);
            let w = dist.powf(-self.weight_power);
            normal += w * m * m.transpose();
            rows.push(m);
            weights.push(w);
        }

        Some(LocalFit {
            normal,
            rows,
            weights,
            radius,
        })
    }

    /// Whether the stencil yields a usable local system.
    pub fn accepts(&self, cloud: &PointCloud, center: usize, neighbors: &[usize]) -> bool {
        self.local_fit(cloud, center, neighbors)
            .is_some_and(|fit| fit.condition_number() <= self.max_condition)
    }

    /// Derivative weights of `center` from its stencil.
    pub fn solve(&self, cloud: &PointCloud, center: usize, neighbors: &[usize]) -> Result<NodeWeights> {
        let ill = |condition: f64| GfdError::IllConditionedStencil {
            node: center,
            condition,
            threshold: self.max_condition,
        };

        let fit = self
            .local_fit(cloud, center, neighbors)
            .ok_or_else(|| ill(f64::INFINITY))?;
        let condition = fit.condition_number();
        if condition > self.max_condition {
            return Err(ill(condition));
        }
        let inverse = fit
            .normal
            .cholesky()
            .ok_or_else(|| ill(f64::INFINITY))?
            .inverse();

        let r = fit.radius;
        let unscale = [1.0 / r, 1.0 / r, 1.0 / (r * r), 1.0 / (r * r), 1.0 / (r * r)];

        let mut columns = Vec::with_capacity(neighbors.len() + 1);
        let mut coefficients = Vec::with_capacity(neighbors.len() + 1);
        columns.push(center);
        coefficients.push([0.0; 5]);

        for ((&j, m), &w) in neighbors.iter().zip(&fit.rows).zip(&fit.weights) {
            let c = inverse * (m * w);
            let mut coeff = [0.0; 5];
            for k in 0..5 {
                coeff[k] = c[k] * unscale[k];
                // the center weight balances the neighbors
                coefficients[0][k] -= coeff[k];
            }
            columns.push(j);
            coefficients.push(coeff);
        }

        Ok(NodeWeights {
            columns,
            coefficients,
        })
    }

    /// Weights of every interior node. Boundary rows stay empty since their
    /// operator rows are replaced by boundary equations.
    pub fn compute(&self, cloud: &PointCloud, stencils: &Stencils) -> Result<StencilWeights> {
        let per_node: Vec<NodeWeights> = record_weights(|| {
            (0..cloud.len())
                .into_par_iter()
                .map(|i| {
                    if cloud.is_boundary(i) {
                        Ok(NodeWeights {
                            columns: Vec::new(),
                            coefficients: Vec::new(),
                        })
                    } else {
                        self.solve(cloud, i, stencils.neighbors(i))
                    }
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let weights = StencilWeights::from_nodes(per_node);
        info!(
            "computed GFD weights for {} nodes ({} entries)",
            weights.len(),
            weights.num_entries()
        );
        Ok(weights)
    }
}

/// Contiguous storage of every node's weights, indexed by node id.
#[derive(Clone, Debug, PartialEq)]
pub struct StencilWeights {
    offsets: Vec<usize>,
    columns: Vec<usize>,
    coefficients: Vec<[f64; 5]>,
}

impl StencilWeights {
    pub fn from_nodes(nodes: Vec<NodeWeights>) -> Self {
        let total = nodes.iter().map(|n| n.columns.len()).sum();
        let mut offsets = Vec::with_capacity(nodes.len() + 1);
        let mut columns = Vec::with_capacity(total);
        let mut coefficients = Vec::with_capacity(total);
        offsets.push(0);
        for node in nodes {
            columns.extend(node.columns);
            coefficients.extend(node.coefficients);
            offsets.push(columns.len());
        }
        Self {
            offsets,
            columns,
            coefficients,
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_entries(&self) -> usize {
        self.columns.len()
    }

    /// Columns and coefficients of node `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[[f64; 5]]) {
        let range = self.offsets[i]..self.offsets[i + 1];
        (&self.columns[range.clone()], &self.coefficients[range])
    }

    /// Approximate one derivative at node `i` from nodal values `u`.
    pub fn apply_at(&self, i: usize, derivative: Derivative, u: &[f64]) -> f64 {
        let (cols, coeffs) = self.row(i);
        cols.iter()
            .zip(coeffs)
            .map(|(&j, c)| c[derivative.index()] * u[j])
            .sum()
    }
}
