use crate::error::{GfdError, Result};
use crate::numerics::operators::SparseOperator;
use crate::numerics::timing::record_linear_solve;
use kryst::solver::LinearSolver;
use kryst::{
    parallel::{NoComm, UniverseComm},
    preconditioner::PcSide,
};
use log::debug;
use nalgebra::{DVector, Dyn, LU};
use serde::Deserialize;
use std::sync::Arc;

/// Relative pivot size below which a dense factorization is singular.
const PIVOT_TOLERANCE: f64 = 1e-13;

/// Linear solver used for steady and implicit systems.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinearSolverKind {
    /// Dense LU factorization; exact and robust for small and medium clouds.
    DenseLu,
    /// Jacobi-scaled BiCGStab on the sparse matrix.
    Bicgstab {
        #[serde(default = "default_tolerance")]
        tolerance: f64,
        #[serde(default = "default_max_iterations")]
        max_iterations: usize,
    },
}

fn default_tolerance() -> f64 {
    1e-10
}

fn default_max_iterations() -> usize {
    2000
}

impl Default for LinearSolverKind {
    fn default() -> Self {
        LinearSolverKind::DenseLu
    }
}

/// A system matrix prepared once and solved against many right-hand sides.
pub enum PreparedSystem {
    Dense(LU<f64, Dyn, Dyn>),
    Iterative {
        matrix: Arc<kryst::matrix::sparse::CsrMatrix<f64>>,
        unscaled: SparseOperator,
        row_scale: Vec<f64>,
        tolerance: f64,
        max_iterations: usize,
    },
}

impl PreparedSystem {
    pub fn new(kind: LinearSolverKind, a: &SparseOperator) -> Result<Self> {
        match kind {
            LinearSolverKind::DenseLu => {
                let lu = a.to_dense().lu();
                check_pivots(&lu)?;
                Ok(PreparedSystem::Dense(lu))
            }
            LinearSolverKind::Bicgstab {
                tolerance,
                max_iterations,
            } => {
                let n = a.nrows();
                // Jacobi row scaling: A' = D^{-1} A
                let mut row_scale = Vec::with_capacity(n);
                let mut rows = Vec::with_capacity(n);
                for i in 0..n {
                    let diag = a.diagonal(i);
                    let scale = if diag.abs() < 1e-12 { 1.0 } else { 1.0 / diag };
                    let (cols, vals) = a.row(i);
                    rows.push((cols.to_vec(), vals.iter().map(|v| v * scale).collect()));
                    row_scale.push(scale);
                }
                let scaled = SparseOperator::from_rows(a.ncols(), rows);
                Ok(PreparedSystem::Iterative {
                    matrix: Arc::new(scaled.to_csr()),
                    unscaled: a.clone(),
                    row_scale,
                    tolerance,
                    max_iterations,
                })
            }
        }
    }

    pub fn solve(&self, b: &DVector<f64>) -> Result<DVector<f64>> {
        if !b.iter().all(|x| x.is_finite()) {
            return Err(GfdError::LinearSolveFailed(
                "right-hand side contains NaN or Inf".into(),
            ));
        }

        let x = match self {
            PreparedSystem::Dense(lu) => record_linear_solve(|| lu.solve(b)).ok_or_else(|| {
                GfdError::SingularOperator("LU factorization has a zero pivot".into())
            })?,
            PreparedSystem::Iterative {
                matrix,
                unscaled,
                row_scale,
                tolerance,
                max_iterations,
            } => {
                let n = b.len();
                let rhs: DVector<f64> =
                    DVector::from_iterator(n, (0..n).map(|i| b[i] * row_scale[i]));

                let op = kryst::matrix::op::CsrOp::new(Arc::clone(matrix));
                let mut bicgstab_solver =
                    kryst::solver::bicgstab::BiCgStabSolver::new(*tolerance, *max_iterations);
                let mut workspace = kryst::context::ksp_context::Workspace::new(n);
                bicgstab_solver.setup_workspace(&mut workspace);

                let mut x = DVector::from_element(n, 0.0);
                let stats = record_linear_solve(|| {
                    bicgstab_solver.solve(
                        &op,
                        None,
                        rhs.as_slice(),
                        x.as_mut_slice(),
                        PcSide::Left,
                        &UniverseComm::NoComm(NoComm {}),
                        None,
                        Some(&mut workspace),
                    )
                })
                .map_err(|e| GfdError::LinearSolveFailed(format!("{e:?}")))?;
                debug!("BiCGStab finished: {:?}", stats);

                // confirm against the unscaled system
                let residual = (b - unscaled.mul_vec(&x)).norm();
                let limit = 1e3 * tolerance * b.norm().max(1.0);
                if residual > limit {
                    return Err(GfdError::LinearSolveFailed(format!(
                        "BiCGStab residual {residual:.3e} above {limit:.3e}"
                    )));
                }
                x
            }
        };

        if !x.iter().all(|v| v.is_finite()) {
            return Err(GfdError::LinearSolveFailed(
                "solution contains NaN or Inf".into(),
            ));
        }
        Ok(x)
    }
}

/// Reject factorizations whose smallest pivot is negligible next to the
/// largest one.
fn check_pivots(lu: &LU<f64, Dyn, Dyn>) -> Result<()> {
    let u = lu.u();
    let (lo, hi) = u
        .diagonal()
        .iter()
        .fold((f64::INFINITY, 0.0_f64), |(lo, hi), p| (lo.min(p.abs()), hi.max(p.abs())));
    if u.nrows() == 0 || hi == 0.0 || lo <= PIVOT_TOLERANCE * hi {
        return Err(GfdError::SingularOperator(format!(
            "smallest pivot {lo:.3e} vs largest {hi:.3e}"
        )));
    }
    Ok(())
}

/// One-shot solve of `a x = b`.
pub fn solve(kind: LinearSolverKind, a: &SparseOperator, b: &DVector<f64>) -> Result<DVector<f64>> {
    PreparedSystem::new(kind, a)?.solve(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tridiagonal(n: usize) -> SparseOperator {
        SparseOperator::from_rows(
            n,
            (0..n).map(|i| {
                let mut cols = vec![i];
                let mut vals = vec![4.0];
                if i > 0 {
                    cols.push(i - 1);
                    vals.push(-1.0);
                }
                if i + 1 < n {
                    cols.push(i + 1);
                    vals.push(-1.5);
                }
                (cols, vals)
            }),
        )
    }

    #[test]
    fn dense_lu_solves_nonsymmetric_system() {
        let a = tridiagonal(6);
        let x_true = DVector::from_fn(6, |i, _| i as f64 - 2.0);
        let b = a.mul_vec(&x_true);
        let x = solve(LinearSolverKind::DenseLu, &a, &b).unwrap();
        assert!((x - x_true).amax() < 1e-12);
    }

    #[test]
    fn singular_matrix_is_reported() {
        let a = SparseOperator::from_rows(
            2,
            vec![(vec![0, 1], vec![1.0, -1.0]), (vec![0, 1], vec![-1.0, 1.0])],
        );
        let b = DVector::from_vec(vec![0.0, 0.0]);
        assert!(matches!(
            solve(LinearSolverKind::DenseLu, &a, &b),
            Err(GfdError::SingularOperator(_))
        ));
    }

    #[test]
    fn solver_kind_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            linear_solver: LinearSolverKind,
        }
        let w: Wrapper =
            toml::from_str("linear_solver = { kind = \"bicgstab\", tolerance = 1e-8 }").unwrap();
        assert_eq!(
            w.linear_solver,
            LinearSolverKind::Bicgstab {
                tolerance: 1e-8,
                max_iterations: 2000
            }
        );
    }
}
