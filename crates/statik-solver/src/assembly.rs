//! Global system assembly: active-DOF bookkeeping, element scatter-add,
//! spring supports and constraint collection.

use std::collections::{BTreeSet, HashMap, HashSet};

use nalgebra::{DMatrix, DVector};
use statik_model::{Constraint, NodalLoad, SpringSupport, StructuralModel};

use crate::analysis::AnalysisMode;
use crate::elements::{Cst, Dkt, FrameMember, PlanarFormulation, Quad4};
use crate::error::{Result, SolverError};
use crate::transfer::{TransferMap, resolve_transfers};

/// Minimum constrained DOFs to exclude rigid-body motion in 2D
pub const MIN_CONSTRAINED_DOFS: usize = 3;

/// Bijection between active node ids and contiguous DOF indices
#[derive(Debug, Clone)]
pub struct DofMap {
    ids: Vec<i32>,
    index: HashMap<i32, usize>,
    dofs_per_node: usize,
}

impl DofMap {
    pub fn new(active: &BTreeSet<i32>, dofs_per_node: usize) -> Self {
        let ids: Vec<i32> = active.iter().copied().collect();
        let index = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self {
            ids,
            index,
            dofs_per_node,
        }
    }

    /// Active node ids in index order
    pub fn node_ids(&self) -> &[i32] {
        &self.ids
    }

    pub fn node_index(&self, id: i32) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Global index of a node's first DOF
    pub fn first_dof(&self, id: i32) -> Option<usize> {
        self.node_index(id).map(|i| i * self.dofs_per_node)
    }

    pub fn dofs_per_node(&self) -> usize {
        self.dofs_per_node
    }

    pub fn num_dofs(&self) -> usize {
        self.ids.len() * self.dofs_per_node
    }
}

/// Assembled global system ready for the direct solver
#[derive(Debug, Clone)]
pub struct GlobalSystem {
    /// Global stiffness before penalty application (springs included)
    pub stiffness: DMatrix<f64>,
    /// Global load vector (nodal loads plus equivalent member loads)
    pub force: DVector<f64>,
    /// Penalty-constrained DOFs with prescribed values
    pub fixed: Vec<(usize, f64)>,
    pub dof_map: DofMap,
}

impl GlobalSystem {
    /// Check stiffness symmetry within a relative tolerance
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let n = self.stiffness.nrows();
        for i in 0..n {
            for j in (i + 1)..n {
                let a = self.stiffness[(i, j)];
                let b = self.stiffness[(j, i)];
                let scale = a.abs().max(b.abs()).max(1.0);
                if (a - b).abs() > tolerance * scale {
                    return false;
                }
            }
        }
        true
    }

    /// Solve for displacements with constraints enforced by penalty
    pub fn solve(&self) -> Result<DVector<f64>> {
        crate::linear::solve_with_constraints(&self.stiffness, &self.force, &self.fixed)
    }
}

/// Per-node support and load data after the transfer pass
#[derive(Debug, Clone, Copy, Default)]
struct EffectiveNode {
    constraint: Constraint,
    springs: SpringSupport,
    load: NodalLoad,
}

/// Builds global systems for one model and analysis mode.
///
/// Construction runs model validation and the constraint/load transfer
/// pass once; `assemble` can then be called repeatedly by the nonlinear
/// loops with varying release sets and axial-force estimates.
#[derive(Debug)]
pub struct Assembler<'a> {
    model: &'a StructuralModel,
    mode: AnalysisMode,
    dof_map: DofMap,
    transfer: TransferMap,
    effective: HashMap<i32, EffectiveNode>,
}

impl<'a> Assembler<'a> {
    pub fn new(model: &'a StructuralModel, mode: AnalysisMode) -> Result<Self> {
        model.validate()?;
        if model.num_elements() == 0 {
            return Err(SolverError::NoElements);
        }

        let active = model.referenced_nodes();
        let transfer = resolve_transfers(model, &active)?;
        let dof_map = DofMap::new(&active, mode.dofs_per_node());

        // Fold transferred constraints, springs and loads onto their targets
        let mut effective: HashMap<i32, EffectiveNode> = HashMap::new();
        for &id in &active {
            let node = model
                .get_node(id)
                .ok_or(SolverError::Model(statik_model::ModelError::UnknownNode {
                    element: 0,
                    node: id,
                }))?;
            effective.insert(
                id,
                EffectiveNode {
                    constraint: node.constraint,
                    springs: node.springs,
                    load: node.load,
                },
            );
        }
        let mut resolved: Vec<(i32, i32)> =
            transfer.resolved.iter().map(|(&s, &t)| (s, t)).collect();
        resolved.sort_unstable();
        for (source, target) in resolved {
            let Some(source_node) = model.get_node(source) else {
                continue;
            };
            if let Some(entry) = effective.get_mut(&target) {
                entry.constraint = entry.constraint.merge(&source_node.constraint);
                entry.load = entry.load.add(&source_node.load);
                entry.springs.kx += source_node.springs.kx;
                entry.springs.ky += source_node.springs.ky;
                entry.springs.kr += source_node.springs.kr;
            }
        }

        Ok(Self {
            model,
            mode,
            dof_map,
            transfer,
            effective,
        })
    }

    pub fn dof_map(&self) -> &DofMap {
        &self.dof_map
    }

    pub fn transfer(&self) -> &TransferMap {
        &self.transfer
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub(crate) fn model(&self) -> &'a StructuralModel {
        self.model
    }

    /// Total constrained DOFs after the transfer pass
    pub fn constrained_dof_count(&self) -> usize {
        let dpn = self.dof_map.dofs_per_node();
        self.effective.values().map(|e| e.constraint.count(dpn)).sum()
    }

    /// Pre-solve validation: load presence and rigid-body exclusion
    pub fn validate_solvable(&self) -> Result<()> {
        if !self.model.has_any_load() {
            return Err(SolverError::NoLoads);
        }
        let constrained = self.constrained_dof_count();
        if constrained < MIN_CONSTRAINED_DOFS {
            return Err(SolverError::InsufficientConstraints {
                constrained,
                required: MIN_CONSTRAINED_DOFS,
            });
        }
        Ok(())
    }

    /// Assemble stiffness, loads, springs and constraint list.
    ///
    /// # Arguments
    /// * `released` - beam ids whose axial stiffness is excluded this round
    /// * `axial_forces` - per-beam axial force estimates; when present the
    ///   consistent geometric stiffness is added for each beam
    pub fn assemble(
        &self,
        released: &HashSet<i32>,
        axial_forces: Option<&HashMap<i32, f64>>,
    ) -> Result<GlobalSystem> {
        let n = self.dof_map.num_dofs();
        let dpn = self.dof_map.dofs_per_node();
        let mut stiffness = DMatrix::<f64>::zeros(n, n);
        let mut force = DVector::<f64>::zeros(n);

        if self.mode.includes_beams() {
            let mut beam_ids: Vec<i32> = self.model.beams.keys().copied().collect();
            beam_ids.sort_unstable();
            for id in beam_ids {
                let beam = &self.model.beams[&id];
                let (start, end, material) = self.beam_parts(beam)?;
                let member = FrameMember::new(beam, start, end, material)?
                    .with_axial_released(released.contains(&id));
                let axial = axial_forces.map(|map| map.get(&id).copied().unwrap_or(0.0));
                let (k, f) = member.global_stiffness_and_load(axial, beam.load.as_ref())?;
                let k = DMatrix::from_fn(6, 6, |i, j| k[(i, j)]);
                let f = DVector::from_fn(6, |i, _| f[i]);

                let dofs = self.element_dofs(beam.id, &beam.nodes)?;
                scatter_add(&mut stiffness, &mut force, &k, &f, &dofs);
            }
        } else if !self.model.beams.is_empty() {
            log::debug!(
                "{} beam members ignored in a 2-DOF analysis mode",
                self.model.beams.len()
            );
        }

        if self.mode.includes_planars() {
            let mut planar_ids: Vec<i32> = self.model.planars.keys().copied().collect();
            planar_ids.sort_unstable();
            for id in planar_ids {
                let planar = &self.model.planars[&id];
                let material = self.model.get_material(planar.material).ok_or(
                    SolverError::Model(statik_model::ModelError::UnknownMaterial {
                        element: planar.id,
                        material: planar.material,
                    }),
                )?;

                for (nodes, formulation) in self.planar_pieces(planar)? {
                    let coords = self.node_coords(planar.id, &nodes)?;
                    let k = formulation.stiffness(&coords, material, planar.thickness)?;
                    let f = DVector::<f64>::zeros(k.nrows());
                    let dofs = self.element_dofs(planar.id, &nodes)?;
                    scatter_add(&mut stiffness, &mut force, &k, &f, &dofs);
                }
            }
        }

        // Nodal loads, spring supports and fixed DOFs
        let mut fixed = Vec::new();
        for (i, &id) in self.dof_map.node_ids().iter().enumerate() {
            let eff = self.effective.get(&id).copied().unwrap_or_default();
            let base = i * dpn;

            force[base] += eff.load.fx;
            force[base + 1] += eff.load.fy;
            if dpn == 3 {
                force[base + 2] += eff.load.mz;
            }

            let flags = [eff.constraint.x, eff.constraint.y, eff.constraint.rot];
            let springs = [eff.springs.kx, eff.springs.ky, eff.springs.kr];
            for d in 0..dpn {
                if !flags[d] {
                    continue;
                }
                if springs[d] > 0.0 {
                    // Elastic support: stiffness on the diagonal instead
                    // of a rigid penalty constraint
                    stiffness[(base + d, base + d)] += springs[d];
                } else {
                    fixed.push((base + d, 0.0));
                }
            }
        }

        Ok(GlobalSystem {
            stiffness,
            force,
            fixed,
            dof_map: self.dof_map.clone(),
        })
    }

    /// Split a planar element into the formulation pieces for this mode.
    /// In the bending modes a quadrilateral is split into two DKT
    /// triangles along the 0-2 diagonal.
    fn planar_pieces(
        &self,
        planar: &statik_model::PlanarElement,
    ) -> Result<Vec<(Vec<i32>, Box<dyn PlanarFormulation>)>> {
        let nodes = &planar.nodes;
        let pieces: Vec<(Vec<i32>, Box<dyn PlanarFormulation>)> = match self.mode {
            AnalysisMode::PlaneStress | AnalysisMode::PlaneStrain => {
                let plane_strain = self.mode == AnalysisMode::PlaneStrain;
                if planar.is_triangle() {
                    let cst = if plane_strain {
                        Cst::plane_strain()
                    } else {
                        Cst::plane_stress()
                    };
                    vec![(nodes.clone(), Box::new(cst) as Box<dyn PlanarFormulation>)]
                } else {
                    let quad = if plane_strain {
                        Quad4::plane_strain()
                    } else {
                        Quad4::plane_stress()
                    };
                    vec![(nodes.clone(), Box::new(quad) as Box<dyn PlanarFormulation>)]
                }
            }
            AnalysisMode::PlateBending | AnalysisMode::MixedBeamPlate => {
                if planar.is_triangle() {
                    vec![(nodes.clone(), Box::new(Dkt) as Box<dyn PlanarFormulation>)]
                } else {
                    vec![
                        (
                            vec![nodes[0], nodes[1], nodes[2]],
                            Box::new(Dkt) as Box<dyn PlanarFormulation>,
                        ),
                        (
                            vec![nodes[0], nodes[2], nodes[3]],
                            Box::new(Dkt) as Box<dyn PlanarFormulation>,
                        ),
                    ]
                }
            }
            AnalysisMode::Frame => Vec::new(),
        };
        Ok(pieces)
    }

    pub(crate) fn beam_parts(
        &self,
        beam: &statik_model::BeamElement,
    ) -> Result<(&'a statik_model::Node, &'a statik_model::Node, &'a statik_model::Material)>
    {
        let start = self.model.get_node(beam.nodes[0]).ok_or(SolverError::Model(
            statik_model::ModelError::UnknownNode {
                element: beam.id,
                node: beam.nodes[0],
            },
        ))?;
        let end = self.model.get_node(beam.nodes[1]).ok_or(SolverError::Model(
            statik_model::ModelError::UnknownNode {
                element: beam.id,
                node: beam.nodes[1],
            },
        ))?;
        let material = self.model.get_material(beam.material).ok_or(SolverError::Model(
            statik_model::ModelError::UnknownMaterial {
                element: beam.id,
                material: beam.material,
            },
        ))?;
        Ok((start, end, material))
    }

    /// Global DOF indices of an element's nodes
    pub(crate) fn element_dofs(&self, element: i32, nodes: &[i32]) -> Result<Vec<usize>> {
        let dpn = self.dof_map.dofs_per_node();
        let mut dofs = Vec::with_capacity(nodes.len() * dpn);
        for &node in nodes {
            let first = self.dof_map.first_dof(node).ok_or(SolverError::Model(
                statik_model::ModelError::UnknownNode { element, node },
            ))?;
            dofs.extend(first..first + dpn);
        }
        Ok(dofs)
    }

    pub(crate) fn node_coords(&self, element: i32, nodes: &[i32]) -> Result<Vec<[f64; 2]>> {
        nodes
            .iter()
            .map(|&id| {
                self.model
                    .get_node(id)
                    .map(|n| [n.x, n.y])
                    .ok_or(SolverError::Model(statik_model::ModelError::UnknownNode {
                        element,
                        node: id,
                    }))
            })
            .collect()
    }
}

/// Accumulate an element matrix and load vector into the global system
fn scatter_add(
    stiffness: &mut DMatrix<f64>,
    force: &mut DVector<f64>,
    k: &DMatrix<f64>,
    f: &DVector<f64>,
    dofs: &[usize],
) {
    for (a, &i) in dofs.iter().enumerate() {
        for (b, &j) in dofs.iter().enumerate() {
            stiffness[(i, j)] += k[(a, b)];
        }
        force[i] += f[a];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use statik_model::{
        BeamElement, DistributedLoad, Material, NodalLoad, Node, PlanarElement, Section,
    };

    fn frame_model() -> StructuralModel {
        let mut model = StructuralModel::new();
        model.add_node(Node::fixed(1, 0.0, 0.0)).unwrap();
        let mut tip = Node::new(2, 4.0, 0.0);
        tip.load = NodalLoad {
            fx: 0.0,
            fy: -10e3,
            mz: 0.0,
        };
        model.add_node(tip).unwrap();
        model
            .add_material(Material::new(1, "steel", 200e9, 0.3))
            .unwrap();
        let mut section = Section::rectangle(0.1, 0.2);
        section.i_z = 8.36e-5;
        model
            .add_beam(BeamElement::new(1, 1, 2, 1, section))
            .unwrap();
        model
    }

    fn membrane_model() -> StructuralModel {
        let mut model = StructuralModel::new();
        model.add_node(Node::fixed(1, 0.0, 0.0)).unwrap();
        model.add_node(Node::fixed(2, 1.0, 0.0)).unwrap();
        let mut top = Node::new(3, 1.0, 1.0);
        top.load = NodalLoad {
            fx: 1e3,
            fy: 0.0,
            mz: 0.0,
        };
        model.add_node(top).unwrap();
        model.add_node(Node::new(4, 0.0, 1.0)).unwrap();
        model
            .add_material(Material::new(1, "steel", 210e9, 0.3))
            .unwrap();
        model
            .add_planar(PlanarElement::quad(1, [1, 2, 3, 4], 1, 0.01))
            .unwrap();
        model
    }

    #[test]
    fn dof_map_is_contiguous_over_active_nodes() {
        let mut model = frame_model();
        model.add_node(Node::new(99, 50.0, 50.0)).unwrap();
        let asm = Assembler::new(&model, AnalysisMode::Frame).unwrap();
        assert_eq!(asm.dof_map().node_ids(), &[1, 2]);
        assert_eq!(asm.dof_map().num_dofs(), 6);
        assert_eq!(asm.dof_map().first_dof(2), Some(3));
        assert_eq!(asm.dof_map().first_dof(99), None);
    }

    #[test]
    fn assembled_frame_stiffness_is_symmetric() {
        let model = frame_model();
        let asm = Assembler::new(&model, AnalysisMode::Frame).unwrap();
        let sys = asm.assemble(&HashSet::new(), None).unwrap();
        assert!(sys.is_symmetric(1e-10));
    }

    #[test]
    fn assembled_membrane_stiffness_is_symmetric() {
        let model = membrane_model();
        let asm = Assembler::new(&model, AnalysisMode::PlaneStress).unwrap();
        let sys = asm.assemble(&HashSet::new(), None).unwrap();
        assert_eq!(sys.stiffness.nrows(), 8);
        assert!(sys.is_symmetric(1e-10));
    }

    #[test]
    fn nodal_loads_land_on_their_dofs() {
        let model = frame_model();
        let asm = Assembler::new(&model, AnalysisMode::Frame).unwrap();
        let sys = asm.assemble(&HashSet::new(), None).unwrap();
        assert_relative_eq!(sys.force[4], -10e3, max_relative = 1e-12);
        assert_eq!(sys.force[0], 0.0);
    }

    #[test]
    fn distributed_load_contributes_equivalent_forces() {
        let mut model = frame_model();
        model.nodes.get_mut(&2).unwrap().load = NodalLoad::default();
        model.beams.get_mut(&1).unwrap().load = Some(DistributedLoad::uniform(-2e3));
        let asm = Assembler::new(&model, AnalysisMode::Frame).unwrap();
        let sys = asm.assemble(&HashSet::new(), None).unwrap();
        // Half of the total load at each end
        assert_relative_eq!(sys.force[1], -4e3, max_relative = 1e-9);
        assert_relative_eq!(sys.force[4], -4e3, max_relative = 1e-9);
    }

    #[test]
    fn springs_add_to_diagonal_instead_of_fixing() {
        let mut model = frame_model();
        {
            let tip = model.nodes.get_mut(&2).unwrap();
            tip.constraint.y = true;
            tip.springs.ky = 5e6;
        }
        let asm = Assembler::new(&model, AnalysisMode::Frame).unwrap();
        let plain = {
            let m2 = frame_model();
            let asm2 = Assembler::new(&m2, AnalysisMode::Frame).unwrap();
            asm2.assemble(&HashSet::new(), None).unwrap().stiffness[(4, 4)]
        };
        let sys = asm.assemble(&HashSet::new(), None).unwrap();
        assert_relative_eq!(sys.stiffness[(4, 4)], plain + 5e6, max_relative = 1e-12);
        // Sprung DOF must not appear in the fixed list
        assert!(!sys.fixed.iter().any(|&(dof, _)| dof == 4));
    }

    #[test]
    fn released_beam_loses_axial_stiffness() {
        let model = frame_model();
        let asm = Assembler::new(&model, AnalysisMode::Frame).unwrap();
        let mut released = HashSet::new();
        released.insert(1);
        let sys = asm.assemble(&released, None).unwrap();
        assert_eq!(sys.stiffness[(3, 3)], 0.0);
        assert!(sys.stiffness[(4, 4)] > 0.0);
    }

    #[test]
    fn geometric_stiffness_softens_compressed_member() {
        let model = frame_model();
        let asm = Assembler::new(&model, AnalysisMode::Frame).unwrap();
        let linear = asm.assemble(&HashSet::new(), None).unwrap();
        let mut axial = HashMap::new();
        axial.insert(1, -1e6);
        let second = asm.assemble(&HashSet::new(), Some(&axial)).unwrap();
        assert!(second.stiffness[(4, 4)] < linear.stiffness[(4, 4)]);
    }

    #[test]
    fn empty_model_is_rejected() {
        let mut model = StructuralModel::new();
        model.add_node(Node::fixed(1, 0.0, 0.0)).unwrap();
        let err = Assembler::new(&model, AnalysisMode::Frame).unwrap_err();
        assert_eq!(err, SolverError::NoElements);
    }

    #[test]
    fn unconstrained_model_fails_validation() {
        let mut model = frame_model();
        model.nodes.get_mut(&1).unwrap().constraint = Constraint::default();
        let asm = Assembler::new(&model, AnalysisMode::Frame).unwrap();
        let err = asm.validate_solvable().unwrap_err();
        assert_eq!(
            err,
            SolverError::InsufficientConstraints {
                constrained: 0,
                required: 3
            }
        );
    }

    #[test]
    fn unloaded_model_fails_validation() {
        let mut model = frame_model();
        model.nodes.get_mut(&2).unwrap().load = NodalLoad::default();
        let asm = Assembler::new(&model, AnalysisMode::Frame).unwrap();
        assert_eq!(asm.validate_solvable().unwrap_err(), SolverError::NoLoads);
    }

    #[test]
    fn mixed_mode_combines_beam_and_plate_dofs() {
        let mut model = frame_model();
        model.add_node(Node::new(3, 4.0, 3.0)).unwrap();
        model
            .add_planar(PlanarElement::triangle(2, [1, 2, 3], 1, 0.2))
            .unwrap();
        let asm = Assembler::new(&model, AnalysisMode::MixedBeamPlate).unwrap();
        let sys = asm.assemble(&HashSet::new(), None).unwrap();
        assert_eq!(sys.stiffness.nrows(), 9);
        assert!(sys.is_symmetric(1e-10));
    }
}
