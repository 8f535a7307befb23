//! Planar (surface) elements: triangles and quadrilaterals.

use serde::{Deserialize, Serialize};

/// A 3- or 4-node planar element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanarElement {
    /// Element id (unique within a model)
    pub id: i32,
    /// Corner node ids, counter-clockwise
    pub nodes: Vec<i32>,
    /// Material id
    pub material: i32,
    /// Element thickness [length]
    pub thickness: f64,
}

impl PlanarElement {
    pub fn triangle(id: i32, nodes: [i32; 3], material: i32, thickness: f64) -> Self {
        Self {
            id,
            nodes: nodes.to_vec(),
            material,
            thickness,
        }
    }

    pub fn quad(id: i32, nodes: [i32; 4], material: i32, thickness: f64) -> Self {
        Self {
            id,
            nodes: nodes.to_vec(),
            material,
            thickness,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_triangle(&self) -> bool {
        self.nodes.len() == 3
    }
}
