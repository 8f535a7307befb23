//! Error types for model construction and validation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while building or validating a structural model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("duplicate node id {0}")]
    DuplicateNode(i32),

    #[error("duplicate element id {0}")]
    DuplicateElement(i32),

    #[error("duplicate material id {0}")]
    DuplicateMaterial(i32),

    #[error("element {element} references unknown node {node}")]
    UnknownNode { element: i32, node: i32 },

    #[error("element {element} references unknown material {material}")]
    UnknownMaterial { element: i32, material: i32 },

    #[error("planar element {element} has {count} nodes, expected 3 or 4")]
    InvalidNodeCount { element: i32, count: usize },

    #[error("element {element} has zero length")]
    ZeroLength { element: i32 },
}
