//! Error types for the analysis core.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

/// Errors raised during validation, assembly and solving.
///
/// Convergence shortfalls of the nonlinear loops are deliberately not
/// errors; they are logged and the last iterate is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("model has no elements")]
    NoElements,

    #[error("model has no applied loads")]
    NoLoads,

    #[error("model has {constrained} constrained DOFs, at least {required} required to exclude rigid-body motion")]
    InsufficientConstraints { constrained: usize, required: usize },

    #[error("constraints on nodes {nodes:?} could not be transferred to an active node")]
    UnresolvedTransfer { nodes: Vec<i32> },

    #[error(transparent)]
    Model(#[from] statik_model::ModelError),

    #[error("singular system at DOF {dof}")]
    Singular { dof: usize },

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("analysis cancelled")]
    Cancelled,
}
