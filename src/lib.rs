//! Meshless Generalized Finite Differences (GFD) for two-dimensional PDEs on
//! unstructured point clouds.
//!
//! The pipeline is: [`discretization::cloud::PointCloud`] →
//! [`discretization::neighbors::NeighborSelector`] →
//! [`numerics::weights::WeightSolver`] → [`numerics::operators`] → one of the
//! equation solvers in [`physics`] → [`processing::error::ErrorEvaluator`].

pub mod cache;
pub mod config;
pub mod discretization;
pub mod error;
pub mod models;
pub mod numerics;
pub mod physics;
pub mod processing;

pub use error::{GfdError, Result};
