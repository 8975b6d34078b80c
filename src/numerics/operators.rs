use crate::discretization::cloud::PointCloud;
use crate::numerics::timing::record_assembly;
use crate::numerics::weights::{Derivative, StencilWeights};
use log::info;
use nalgebra::{DMatrix, DVector};

/// Coefficients of the linear operator
/// `A u_xx + B u_xy + C u_yy + D u_x + E u_y + F u`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DifferentialOperator {
    pub uxx: f64,
    pub uxy: f64,
    pub uyy: f64,
    pub ux: f64,
    pub uy: f64,
    pub u: f64,
}

impl DifferentialOperator {
    pub fn laplacian() -> Self {
        Self {
            uxx: 1.0,
            uyy: 1.0,
            ..Default::default()
        }
    }

    pub fn gradient_x() -> Self {
        Self {
            ux: 1.0,
            ..Default::default()
        }
    }

    pub fn gradient_y() -> Self {
        Self {
            uy: 1.0,
            ..Default::default()
        }
    }

    /// `nu * lap(u)`
    pub fn diffusion(nu: f64) -> Self {
        Self::laplacian().scaled(nu)
    }

    /// `nu * lap(u) - a u_x - b u_y`
    pub fn advection_diffusion(nu: f64, velocity: [f64; 2]) -> Self {
        Self {
            ux: -velocity[0],
            uy: -velocity[1],
            ..Self::diffusion(nu)
        }
    }

    pub fn scaled(self, s: f64) -> Self {
        Self {
            uxx: s * self.uxx,
            uxy: s * self.uxy,
            uyy: s * self.uyy,
            ux: s * self.ux,
            uy: s * self.uy,
            u: s * self.u,
        }
    }

    /// Coefficient of each [`Derivative`] slot.
    fn derivative_coefficients(&self) -> [f64; 5] {
        let mut c = [0.0; 5];
        c[Derivative::X.index()] = self.ux;
        c[Derivative::Y.index()] = self.uy;
        c[Derivative::XX.index()] = self.uxx;
        c[Derivative::YY.index()] = self.uyy;
        c[Derivative::XY.index()] = self.uxy;
        c
    }
}

/// Row-compressed sparse matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseOperator {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl SparseOperator {
    /// Assemble from one `(columns, values)` pair per row. Duplicate columns
    /// within a row are summed and columns end up sorted.
    pub fn from_rows<I>(ncols: usize, rows: I) -> Self
    where
        I: IntoIterator<Item = (Vec<usize>, Vec<f64>)>,
    {
        let mut row_ptr = vec![0];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        for (mut cols, mut vals) in rows {
            combine_duplicates(&mut cols, &mut vals);
            col_idx.extend_from_slice(&cols);
            values.extend_from_slice(&vals);
            row_ptr.push(col_idx.len());
        }
        Self {
            nrows: row_ptr.len() - 1,
            ncols,
            row_ptr,
            col_idx,
            values,
        }
    }

    pub fn identity(n: usize) -> Self {
        Self::from_rows(n, (0..n).map(|i| (vec![i], vec![1.0])))
    }

    /// Diagonal matrix with ones on the masked rows and empty rows elsewhere.
    pub fn selection(mask: &[bool]) -> Self {
        Self::from_rows(
            mask.len(),
            mask.iter().enumerate().map(|(i, &on)| {
                if on {
                    (vec![i], vec![1.0])
                } else {
                    (Vec::new(), Vec::new())
                }
            }),
        )
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_idx[range.clone()], &self.values[range])
    }

    pub fn diagonal(&self, i: usize) -> f64 {
        let (cols, vals) = self.row(i);
        cols.binary_search(&i).map(|k| vals[k]).unwrap_or(0.0)
    }

    /// `y = A x`
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.nrows,
            (0..self.nrows).map(|i| {
                let (cols, vals) = self.row(i);
                cols.iter().zip(vals).map(|(&j, v)| v * x[j]).sum::<f64>()
            }),
        )
    }

    /// Rows `alpha * I + beta * A` where `mask` is false, identity rows where
    /// it is true. This is how system matrices with Dirichlet rows are built.
    pub fn affine_with_identity_rows(&self, alpha: f64, beta: f64, mask: &[bool]) -> Self {
        Self::from_rows(
            self.ncols,
            (0..self.nrows).map(|i| {
                if mask[i] {
                    return (vec![i], vec![1.0]);
                }
                let (cols, vals) = self.row(i);
                let mut c = cols.to_vec();
                let mut v: Vec<f64> = vals.iter().map(|x| beta * x).collect();
                if alpha != 0.0 {
                    c.push(i);
                    v.push(alpha);
                }
                (c, v)
            }),
        )
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.nrows, self.ncols);
        for i in 0..self.nrows {
            let (cols, vals) = self.row(i);
            for (&j, &v) in cols.iter().zip(vals) {
                m[(i, j)] += v;
            }
        }
        m
    }

    pub fn to_csr(&self) -> kryst::matrix::sparse::CsrMatrix<f64> {
        kryst::matrix::sparse::CsrMatrix::from_csr(
            self.nrows,
            self.ncols,
            self.row_ptr.clone(),
            self.col_idx.clone(),
            self.values.clone(),
        )
    }
}

/// Sort columns and sum duplicate entries in place.
#[inline]
fn combine_duplicates(cols: &mut Vec<usize>, vals: &mut Vec<f64>) {
    if cols.len() <= 1 {
        return;
    }

    let mut p: Vec<usize> = (0..cols.len()).collect();
    p.sort_unstable_by_key(|&i| cols[i]);

    let sorted_cols: Vec<usize> = p.iter().map(|&i| cols[i]).collect();
    let sorted_vals: Vec<f64> = p.iter().map(|&i| vals[i]).collect();

    cols.clear();
    vals.clear();

    let mut curr_col = sorted_cols[0];
    let mut curr_sum = sorted_vals[0];

    for i in 1..sorted_cols.len() {
        if sorted_cols[i] == curr_col {
            curr_sum += sorted_vals[i];
        } else {
            cols.push(curr_col);
            vals.push(curr_sum);
            curr_col = sorted_cols[i];
            curr_sum = sorted_vals[i];
        }
    }
    cols.push(curr_col);
    vals.push(curr_sum);
}

/// Scatter the weights of every interior node into a global operator for
/// `op`. Boundary rows become identity rows so the assembled system enforces
/// `u_i = g_i` there.
pub fn assemble_operator(
    cloud: &PointCloud,
    weights: &StencilWeights,
    op: &DifferentialOperator,
) -> SparseOperator {
    let coeffs = op.derivative_coefficients();
    SparseOperator::from_rows(
        cloud.len(),
        (0..cloud.len()).map(|i| {
            if cloud.is_boundary(i) {
                return (vec![i], vec![1.0]);
            }
            let (cols, w) = weights.row(i);
            let mut vals: Vec<f64> = w
                .iter()
                .map(|c| c.iter().zip(&coeffs).map(|(a, b)| a * b).sum())
                .collect();
            let mut cols = cols.to_vec();
            if op.u != 0.0 {
                cols.push(i);
                vals.push(op.u);
            }
            (cols, vals)
        }),
    )
}

/// Global operators shared by all equation kinds, plus the equation-specific
/// spatial operator.
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledOperators {
    pub laplacian: SparseOperator,
    pub gradient_x: SparseOperator,
    pub gradient_y: SparseOperator,
    /// Ones on the boundary diagonal, empty interior rows.
    pub identity_rows: SparseOperator,
    /// Operator of the equation being solved.
    pub spatial: SparseOperator,
    pub boundary: Vec<bool>,
}

impl AssembledOperators {
    pub fn assemble(
        cloud: &PointCloud,
        weights: &StencilWeights,
        spatial: &DifferentialOperator,
    ) -> Self {
        let ops = record_assembly(|| Self {
            laplacian: assemble_operator(cloud, weights, &DifferentialOperator::laplacian()),
            gradient_x: assemble_operator(cloud, weights, &DifferentialOperator::gradient_x()),
            gradient_y: assemble_operator(cloud, weights, &DifferentialOperator::gradient_y()),
            identity_rows: SparseOperator::selection(&cloud.boundary_mask()),
            spatial: assemble_operator(cloud, weights, spatial),
            boundary: cloud.boundary_mask(),
        });
        info!(
            "assembled operators: {} rows, laplacian nnz {}, spatial nnz {}",
            ops.laplacian.nrows(),
            ops.laplacian.nnz(),
            ops.spatial.nnz()
        );
        ops
    }

    pub fn len(&self) -> usize {
        self.boundary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundary.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_summed_and_sorted() {
        let mut cols = vec![3, 1, 3, 0];
        let mut vals = vec![1.0, 2.0, 0.5, -1.0];
        combine_duplicates(&mut cols, &mut vals);
        assert_eq!(cols, vec![0, 1, 3]);
        assert_eq!(vals, vec![-1.0, 2.0, 1.5]);
    }

    #[test]
    fn affine_rows_keep_identity_on_mask() {
        let a = SparseOperator::from_rows(
            3,
            vec![
                (vec![0, 1], vec![2.0, -1.0]),
                (vec![0, 1, 2], vec![-1.0, 2.0, -1.0]),
                (vec![1, 2], vec![-1.0, 2.0]),
            ],
        );
        let s = a.affine_with_identity_rows(1.0, -0.5, &[true, false, true]);
        let d = s.to_dense();
        assert_eq!(d[(0, 0)], 1.0);
        assert_eq!(d[(0, 1)], 0.0);
        assert_eq!(d[(1, 0)], 0.5);
        assert_eq!(d[(1, 1)], 0.0);
        assert_eq!(d[(1, 2)], 0.5);
        assert_eq!(d[(2, 2)], 1.0);
        assert_eq!(s.diagonal(1), 0.0);
    }

    #[test]
    fn mul_vec_matches_dense() {
        let a = SparseOperator::from_rows(
            2,
            vec![(vec![1, 0], vec![3.0, 1.0]), (vec![1], vec![-2.0])],
        );
        let x = DVector::from_vec(vec![2.0, 5.0]);
        assert_eq!(a.mul_vec(&x), a.to_dense() * &x);
    }
}
