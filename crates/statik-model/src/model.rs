//! Container for a complete 2D structural model.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::beam::BeamElement;
use crate::error::{ModelError, Result};
use crate::material::Material;
use crate::node::Node;
use crate::planar::PlanarElement;

/// A complete structural model: nodes, materials and elements keyed by id.
///
/// The model is plain data; the analysis core reads it as a snapshot and
/// never writes back into it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuralModel {
    /// All nodes by id
    pub nodes: HashMap<i32, Node>,
    /// Beam members by id
    pub beams: HashMap<i32, BeamElement>,
    /// Planar elements by id
    pub planars: HashMap<i32, PlanarElement>,
    /// Materials by id
    pub materials: HashMap<i32, Material>,
}

impl StructuralModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, rejecting duplicate ids
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(ModelError::DuplicateNode(node.id));
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Add a beam member, rejecting ids already used by any element
    pub fn add_beam(&mut self, beam: BeamElement) -> Result<()> {
        if self.beams.contains_key(&beam.id) || self.planars.contains_key(&beam.id) {
            return Err(ModelError::DuplicateElement(beam.id));
        }
        self.beams.insert(beam.id, beam);
        Ok(())
    }

    /// Add a planar element, rejecting ids already used by any element
    pub fn add_planar(&mut self, planar: PlanarElement) -> Result<()> {
        if self.beams.contains_key(&planar.id) || self.planars.contains_key(&planar.id) {
            return Err(ModelError::DuplicateElement(planar.id));
        }
        self.planars.insert(planar.id, planar);
        Ok(())
    }

    /// Add a material, rejecting duplicate ids
    pub fn add_material(&mut self, material: Material) -> Result<()> {
        if self.materials.contains_key(&material.id) {
            return Err(ModelError::DuplicateMaterial(material.id));
        }
        self.materials.insert(material.id, material);
        Ok(())
    }

    pub fn get_node(&self, id: i32) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_material(&self, id: i32) -> Option<&Material> {
        self.materials.get(&id)
    }

    pub fn num_elements(&self) -> usize {
        self.beams.len() + self.planars.len()
    }

    /// Ids of nodes referenced by at least one element, in ascending order.
    ///
    /// Only these nodes carry DOFs in an analysis; everything else is
    /// geometry the editing layer left behind.
    pub fn referenced_nodes(&self) -> BTreeSet<i32> {
        let mut ids = BTreeSet::new();
        for beam in self.beams.values() {
            ids.extend(beam.nodes);
        }
        for planar in self.planars.values() {
            ids.extend(planar.nodes.iter().copied());
        }
        ids
    }

    /// Element ids attached to each node
    pub fn node_adjacency(&self) -> HashMap<i32, Vec<i32>> {
        let mut adjacency: HashMap<i32, Vec<i32>> = HashMap::new();
        for beam in self.beams.values() {
            for &n in &beam.nodes {
                adjacency.entry(n).or_default().push(beam.id);
            }
        }
        for planar in self.planars.values() {
            for &n in &planar.nodes {
                adjacency.entry(n).or_default().push(planar.id);
            }
        }
        adjacency
    }

    /// True if any node carries a nonzero load or any beam a distributed load
    pub fn has_any_load(&self) -> bool {
        self.nodes.values().any(|n| !n.load.is_zero())
            || self.beams.values().any(|b| b.load.is_some())
    }

    /// Check referential integrity: every element points at existing nodes
    /// and materials, planar elements have 3 or 4 nodes, beams have
    /// distinct end nodes.
    pub fn validate(&self) -> Result<()> {
        for beam in self.beams.values() {
            for &n in &beam.nodes {
                if !self.nodes.contains_key(&n) {
                    return Err(ModelError::UnknownNode {
                        element: beam.id,
                        node: n,
                    });
                }
            }
            if beam.nodes[0] == beam.nodes[1] {
                return Err(ModelError::ZeroLength { element: beam.id });
            }
            if !self.materials.contains_key(&beam.material) {
                return Err(ModelError::UnknownMaterial {
                    element: beam.id,
                    material: beam.material,
                });
            }
        }
        for planar in self.planars.values() {
            let count = planar.num_nodes();
            if count != 3 && count != 4 {
                return Err(ModelError::InvalidNodeCount {
                    element: planar.id,
                    count,
                });
            }
            for &n in &planar.nodes {
                if !self.nodes.contains_key(&n) {
                    return Err(ModelError::UnknownNode {
                        element: planar.id,
                        node: n,
                    });
                }
            }
            if !self.materials.contains_key(&planar.material) {
                return Err(ModelError::UnknownMaterial {
                    element: planar.id,
                    material: planar.material,
                });
            }
        }
        Ok(())
    }

    /// Summary counts for diagnostics
    pub fn statistics(&self) -> ModelStatistics {
        ModelStatistics {
            num_nodes: self.nodes.len(),
            num_beams: self.beams.len(),
            num_planars: self.planars.len(),
            num_materials: self.materials.len(),
            num_referenced_nodes: self.referenced_nodes().len(),
            num_constrained_nodes: self.nodes.values().filter(|n| n.constraint.any()).count(),
        }
    }
}

/// Model summary counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStatistics {
    pub num_nodes: usize,
    pub num_beams: usize,
    pub num_planars: usize,
    pub num_materials: usize,
    pub num_referenced_nodes: usize,
    pub num_constrained_nodes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::Section;

    fn two_node_model() -> StructuralModel {
        let mut model = StructuralModel::new();
        model.add_node(Node::fixed(1, 0.0, 0.0)).unwrap();
        model.add_node(Node::new(2, 4.0, 0.0)).unwrap();
        model
            .add_material(Material::new(1, "steel", 210e9, 0.3))
            .unwrap();
        model
            .add_beam(BeamElement::new(1, 1, 2, 1, Section::rectangle(0.1, 0.2)))
            .unwrap();
        model
    }

    #[test]
    fn rejects_duplicate_node() {
        let mut model = two_node_model();
        let err = model.add_node(Node::new(1, 1.0, 1.0)).unwrap_err();
        assert_eq!(err, ModelError::DuplicateNode(1));
    }

    #[test]
    fn rejects_duplicate_element_id_across_kinds() {
        let mut model = two_node_model();
        model.add_node(Node::new(3, 0.0, 1.0)).unwrap();
        let err = model
            .add_planar(PlanarElement::triangle(1, [1, 2, 3], 1, 0.2))
            .unwrap_err();
        assert_eq!(err, ModelError::DuplicateElement(1));
    }

    #[test]
    fn validate_catches_unknown_node() {
        let mut model = two_node_model();
        model.beams.get_mut(&1).unwrap().nodes[1] = 99;
        let err = model.validate().unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownNode {
                element: 1,
                node: 99
            }
        );
    }

    #[test]
    fn validate_catches_unknown_material() {
        let mut model = two_node_model();
        model.beams.get_mut(&1).unwrap().material = 7;
        let err = model.validate().unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownMaterial {
                element: 1,
                material: 7
            }
        );
    }

    #[test]
    fn referenced_nodes_skips_orphans() {
        let mut model = two_node_model();
        model.add_node(Node::new(10, 9.0, 9.0)).unwrap();
        let referenced = model.referenced_nodes();
        assert_eq!(referenced.into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn statistics_counts() {
        let model = two_node_model();
        let stats = model.statistics();
        assert_eq!(stats.num_nodes, 2);
        assert_eq!(stats.num_beams, 1);
        assert_eq!(stats.num_referenced_nodes, 2);
        assert_eq!(stats.num_constrained_nodes, 1);
    }
}
