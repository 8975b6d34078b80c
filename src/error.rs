use thiserror::Error;

/// Errors produced while discretizing a point cloud or solving on it.
#[derive(Debug, Error)]
pub enum GfdError {
    #[error("degenerate stencil at node {node}: no non-singular neighborhood within {max_neighbors} neighbors")]
    DegenerateStencil { node: usize, max_neighbors: usize },
    #[error("ill-conditioned stencil at node {node}: condition number {condition:.3e} exceeds {threshold:.3e}")]
    IllConditionedStencil {
        node: usize,
        condition: f64,
        threshold: f64,
    },
    #[error("singular operator: {0}")]
    SingularOperator(String),
    #[error("unstable time step: dt = {dt:.4e} exceeds the {criterion} limit {limit:.4e}")]
    UnstableTimeStep {
        dt: f64,
        limit: f64,
        criterion: &'static str,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("linear solve failed: {0}")]
    LinearSolveFailed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed input at line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, GfdError>;
