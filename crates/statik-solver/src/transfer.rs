//! Constraint and load transfer from inactive to active nodes.
//!
//! Mesh generation can leave constraints or loads on nodes that no element
//! references (a drawn polygon vertex that did not become a mesh node).
//! This pass resolves each such node to the nearest active node within a
//! fixed geometric tolerance. It is a pure resolution step: the result is
//! a mapping consumed during assembly, the caller's model is not touched.

use std::collections::{BTreeSet, HashMap};

use statik_model::StructuralModel;

use crate::error::{Result, SolverError};

/// Maximum distance over which constraints and loads are moved
pub const TRANSFER_TOLERANCE: f64 = 0.5;

/// Resolution of inactive constraint/load carriers onto active nodes
#[derive(Debug, Clone, Default)]
pub struct TransferMap {
    /// Inactive source node id → active target node id
    pub resolved: HashMap<i32, i32>,
    /// Load-only nodes with no active node in range; their loads are dropped
    pub dropped: Vec<i32>,
}

impl TransferMap {
    /// Source node ids transferred onto a given active node
    pub fn sources_for(&self, target: i32) -> Vec<i32> {
        let mut sources: Vec<i32> = self
            .resolved
            .iter()
            .filter(|&(_, &t)| t == target)
            .map(|(&s, _)| s)
            .collect();
        sources.sort_unstable();
        sources
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.dropped.is_empty()
    }

    /// Summary line for diagnostics
    pub fn statistics(&self) -> String {
        format!(
            "transfer: {} nodes resolved, {} load-only nodes dropped",
            self.resolved.len(),
            self.dropped.len()
        )
    }
}

/// Resolve constraints and loads sitting on inactive nodes.
///
/// Each inactive node carrying a constraint or a load is mapped to the
/// nearest active node within [`TRANSFER_TOLERANCE`]; ties go to the lowest
/// node id. Constrained nodes with no active node in range fail the whole
/// assembly, listing the offending ids; load-only nodes are dropped with a
/// warning.
pub fn resolve_transfers(
    model: &StructuralModel,
    active: &BTreeSet<i32>,
) -> Result<TransferMap> {
    let mut map = TransferMap::default();
    let mut unresolved = Vec::new();

    let mut orphans: Vec<_> = model
        .nodes
        .values()
        .filter(|n| !active.contains(&n.id))
        .filter(|n| n.constraint.any() || !n.load.is_zero())
        .collect();
    orphans.sort_unstable_by_key(|n| n.id);

    for node in orphans {
        let mut best: Option<(i32, f64)> = None;
        for &candidate in active {
            let Some(target) = model.nodes.get(&candidate) else {
                continue;
            };
            let dist = node.distance_to(target);
            if dist <= TRANSFER_TOLERANCE && best.is_none_or(|(_, d)| dist < d) {
                best = Some((candidate, dist));
            }
        }
        match best {
            Some((target, _)) => {
                map.resolved.insert(node.id, target);
            }
            None if node.constraint.any() => unresolved.push(node.id),
            None => {
                log::warn!(
                    "dropping load on node {}: no active node within {TRANSFER_TOLERANCE}",
                    node.id
                );
                map.dropped.push(node.id);
            }
        }
    }

    if !unresolved.is_empty() {
        return Err(SolverError::UnresolvedTransfer { nodes: unresolved });
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statik_model::{BeamElement, Material, NodalLoad, Node, Section, StructuralModel};

    fn base_model() -> StructuralModel {
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
    fn nearby_constrained_orphan_is_resolved() {
        let mut model = base_model();
        let mut orphan = Node::pinned(5, 4.1, 0.1);
        orphan.load = NodalLoad {
            fx: 0.0,
            fy: -1.0e3,
            mz: 0.0,
        };
        model.add_node(orphan).unwrap();

        let active = model.referenced_nodes();
        let map = resolve_transfers(&model, &active).unwrap();
        assert_eq!(map.resolved.get(&5), Some(&2));
        assert_eq!(map.sources_for(2), vec![5]);
    }

    #[test]
    fn distant_constrained_orphan_fails_with_node_list() {
        let mut model = base_model();
        model.add_node(Node::pinned(5, 10.0, 10.0)).unwrap();
        model.add_node(Node::pinned(6, -10.0, 0.0)).unwrap();

        let active = model.referenced_nodes();
        let err = resolve_transfers(&model, &active).unwrap_err();
        assert_eq!(err, SolverError::UnresolvedTransfer { nodes: vec![5, 6] });
    }

    #[test]
    fn distant_load_only_orphan_is_dropped() {
        let mut model = base_model();
        let mut orphan = Node::new(5, 10.0, 10.0);
        orphan.load = NodalLoad {
            fx: 1.0,
            fy: 0.0,
            mz: 0.0,
        };
        model.add_node(orphan).unwrap();

        let active = model.referenced_nodes();
        let map = resolve_transfers(&model, &active).unwrap();
        assert!(map.resolved.is_empty());
        assert_eq!(map.dropped, vec![5]);
    }

    #[test]
    fn tie_resolves_to_lowest_node_id() {
        let mut model = base_model();
        // Short span with the orphan exactly halfway between both ends
        model.nodes.get_mut(&2).unwrap().x = 0.6;
        model.add_node(Node::pinned(5, 0.3, 0.0)).unwrap();

        let active = model.referenced_nodes();
        let map = resolve_transfers(&model, &active).unwrap();
        assert_eq!(map.resolved.get(&5), Some(&1));
    }

    #[test]
    fn unloaded_free_orphan_is_ignored() {
        let mut model = base_model();
        model.add_node(Node::new(5, 100.0, 100.0)).unwrap();
        let active = model.referenced_nodes();
        let map = resolve_transfers(&model, &active).unwrap();
        assert!(map.is_empty());
    }
}
