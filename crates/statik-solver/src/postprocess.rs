//! Result recovery: member internal forces, planar stress and moment
//! tensors with principal values, reactions and min/max tracking.

use std::collections::{HashMap, HashSet};

use nalgebra::{DVector, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use statik_model::{BeamElement, DistributedLoad, LoadAxes, PlanarElement};

use crate::analysis::AnalysisMode;
use crate::assembly::{Assembler, DofMap, GlobalSystem};
use crate::elements::{
    Cst, Dkt, FrameMember, Quad4, bending_rigidity_matrix, plane_strain_matrix,
    plane_stress_matrix,
};
use crate::error::Result;

/// Internal force stations sampled along each beam
const BEAM_STATIONS: usize = 21;

/// Running minimum/maximum of a scalar quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    pub fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn update(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Collapse an empty range to zero for downstream scaling
    fn normalized(self) -> Self {
        if self.is_empty() {
            Self { min: 0.0, max: 0.0 }
        } else {
            self
        }
    }
}

impl Default for MinMax {
    fn default() -> Self {
        Self::new()
    }
}

/// Extremal internal forces of one beam member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamForces {
    pub axial: MinMax,
    pub shear: MinMax,
    pub moment: MinMax,
    /// Local end forces (Fx1, Fy1, M1, Fx2, Fy2, M2)
    pub end_forces: [f64; 6],
}

/// Membrane stress state at the element center, with principal values
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MembraneStress {
    pub sx: f64,
    pub sy: f64,
    pub txy: f64,
    pub s1: f64,
    pub s2: f64,
    /// Principal direction [rad]
    pub angle: f64,
    pub von_mises: f64,
}

/// Plate bending state at the element center, with principal moments and
/// transverse shears
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlateMoments {
    pub mx: f64,
    pub my: f64,
    pub mxy: f64,
    pub m1: f64,
    pub m2: f64,
    /// Principal direction [rad]
    pub angle: f64,
    pub qx: f64,
    pub qy: f64,
}

/// Recovered planar-element result for the active analysis mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum PlanarResult {
    Membrane(MembraneStress),
    Bending(PlateMoments),
}

/// Global and per-quantity extremes for downstream scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultExtremes {
    /// Translational displacement magnitude
    pub displacement: MinMax,
    pub dx: MinMax,
    pub dy: MinMax,
    pub rotation: MinMax,
    pub axial: MinMax,
    pub shear: MinMax,
    pub moment: MinMax,
    pub principal_stress: MinMax,
    pub principal_moment: MinMax,
    pub reaction: MinMax,
}

/// Complete result of one solve
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub mode: AnalysisMode,
    pub dof_map: DofMap,
    pub displacements: DVector<f64>,
    /// `K·u − F` in the same indexing as the displacements
    pub reactions: DVector<f64>,
    pub beam_forces: HashMap<i32, BeamForces>,
    pub planar_results: HashMap<i32, PlanarResult>,
    pub extremes: ResultExtremes,
    /// False when a nonlinear loop exhausted its iteration budget;
    /// the fields above then hold the last iterate
    pub converged: bool,
    /// Iterations spent by the nonlinear loops
    pub iterations: usize,
}

impl AnalysisResult {
    /// Displacement components of one node, `dofs_per_node` entries
    pub fn node_displacement(&self, node: i32) -> Option<&[f64]> {
        let first = self.dof_map.first_dof(node)?;
        let dpn = self.dof_map.dofs_per_node();
        Some(&self.displacements.as_slice()[first..first + dpn])
    }
}

/// Principal values and direction of a symmetric 2D tensor
fn principal(xx: f64, yy: f64, xy: f64) -> (f64, f64, f64) {
    let center = (xx + yy) / 2.0;
    let radius = (((xx - yy) / 2.0).powi(2) + xy * xy).sqrt();
    let angle = 0.5 * (2.0 * xy).atan2(xx - yy);
    (center + radius, center - radius, angle)
}

/// Assemble the final result from the last solved system
pub fn build_result(
    assembler: &Assembler<'_>,
    system: &GlobalSystem,
    displacements: &DVector<f64>,
    released: &HashSet<i32>,
    converged: bool,
    iterations: usize,
) -> Result<AnalysisResult> {
    let mode = assembler.mode();
    let dof_map = system.dof_map.clone();
    let dpn = dof_map.dofs_per_node();

    let reactions = &system.stiffness * displacements - &system.force;

    let mut extremes = ResultExtremes {
        displacement: MinMax::new(),
        dx: MinMax::new(),
        dy: MinMax::new(),
        rotation: MinMax::new(),
        axial: MinMax::new(),
        shear: MinMax::new(),
        moment: MinMax::new(),
        principal_stress: MinMax::new(),
        principal_moment: MinMax::new(),
        reaction: MinMax::new(),
    };

    for i in 0..dof_map.node_ids().len() {
        let base = i * dpn;
        let dx = displacements[base];
        let dy = displacements[base + 1];
        extremes.dx.update(dx);
        extremes.dy.update(dy);
        extremes.displacement.update((dx * dx + dy * dy).sqrt());
        if dpn == 3 {
            extremes.rotation.update(displacements[base + 2]);
        }
    }
    for i in 0..reactions.len() {
        extremes.reaction.update(reactions[i]);
    }

    let mut beam_forces = HashMap::new();
    if mode.includes_beams() {
        for beam in assembler.model().beams.values() {
            let forces = recover_beam_forces(assembler, beam, displacements, released)?;
            if !forces.axial.is_empty() {
                extremes.axial.update(forces.axial.min);
                extremes.axial.update(forces.axial.max);
                extremes.shear.update(forces.shear.min);
                extremes.shear.update(forces.shear.max);
                extremes.moment.update(forces.moment.min);
                extremes.moment.update(forces.moment.max);
            }
            beam_forces.insert(beam.id, forces);
        }
    }

    let mut planar_results = HashMap::new();
    if mode.includes_planars() {
        for planar in assembler.model().planars.values() {
            let result = recover_planar_result(assembler, planar, displacements)?;
            match &result {
                PlanarResult::Membrane(s) => {
                    extremes.principal_stress.update(s.s1);
                    extremes.principal_stress.update(s.s2);
                }
                PlanarResult::Bending(m) => {
                    extremes.principal_moment.update(m.m1);
                    extremes.principal_moment.update(m.m2);
                }
            }
            planar_results.insert(planar.id, result);
        }
    }

    extremes.displacement = extremes.displacement.normalized();
    extremes.dx = extremes.dx.normalized();
    extremes.dy = extremes.dy.normalized();
    extremes.rotation = extremes.rotation.normalized();
    extremes.axial = extremes.axial.normalized();
    extremes.shear = extremes.shear.normalized();
    extremes.moment = extremes.moment.normalized();
    extremes.principal_stress = extremes.principal_stress.normalized();
    extremes.principal_moment = extremes.principal_moment.normalized();
    extremes.reaction = extremes.reaction.normalized();

    Ok(AnalysisResult {
        mode,
        dof_map,
        displacements: displacements.clone(),
        reactions,
        beam_forces,
        planar_results,
        extremes,
        converged,
        iterations,
    })
}

/// Gather one element's displacement sub-vector
fn gather(displacements: &DVector<f64>, dofs: &[usize]) -> DVector<f64> {
    DVector::from_iterator(dofs.len(), dofs.iter().map(|&d| displacements[d]))
}

/// Recover axial force per beam, used by the nonlinear loops
pub(crate) fn recover_axial_forces(
    assembler: &Assembler<'_>,
    displacements: &DVector<f64>,
    released: &HashSet<i32>,
) -> Result<HashMap<i32, f64>> {
    let mut axials = HashMap::new();
    for beam in assembler.model().beams.values() {
        let (start, end, material) = assembler.beam_parts(beam)?;
        let member = FrameMember::new(beam, start, end, material)?
            .with_axial_released(released.contains(&beam.id));
        let dofs = assembler.element_dofs(beam.id, &beam.nodes)?;
        let d = gather(displacements, &dofs);
        let d6 = Vector6::from_iterator(d.iter().copied());
        axials.insert(beam.id, member.axial_force(&d6, beam.load.as_ref())?);
    }
    Ok(axials)
}

fn recover_beam_forces(
    assembler: &Assembler<'_>,
    beam: &BeamElement,
    displacements: &DVector<f64>,
    released: &HashSet<i32>,
) -> Result<BeamForces> {
    let (start, end, material) = assembler.beam_parts(beam)?;
    let member = FrameMember::new(beam, start, end, material)?
        .with_axial_released(released.contains(&beam.id));
    let dofs = assembler.element_dofs(beam.id, &beam.nodes)?;
    let d = gather(displacements, &dofs);
    let d6 = Vector6::from_iterator(d.iter().copied());
    let end_forces = member.local_end_forces(&d6, beam.load.as_ref())?;

    let mut axial = MinMax::new();
    let mut shear = MinMax::new();
    let mut moment = MinMax::new();
    let l = member.length;
    for s in 0..BEAM_STATIONS {
        let x = l * s as f64 / (BEAM_STATIONS - 1) as f64;
        let (px, py, my) = match beam.load.as_ref() {
            Some(load) => load_integrals(&member, load, x),
            None => (0.0, 0.0, 0.0),
        };
        // Equilibrium of the segment left of the cut
        axial.update(-(end_forces[0] + px));
        shear.update(-(end_forces[1] + py));
        moment.update(-end_forces[2] + x * end_forces[1] + my);
    }

    Ok(BeamForces {
        axial,
        shear,
        moment,
        end_forces: [
            end_forces[0],
            end_forces[1],
            end_forces[2],
            end_forces[3],
            end_forces[4],
            end_forces[5],
        ],
    })
}

/// Integrals of the local load components up to station `x`:
/// `(∫ p_par, ∫ p_perp, ∫ (x − t) · p_perp)`
fn load_integrals(member: &FrameMember, load: &DistributedLoad, x: f64) -> (f64, f64, f64) {
    let (offset, span) = load.span_on(member.length);
    if span <= 0.0 || x <= offset {
        return (0.0, 0.0, 0.0);
    }

    let (par0, perp0, par1, perp1) = match load.axes {
        LoadAxes::Local => (0.0, load.start_intensity, 0.0, load.end_intensity),
        LoadAxes::Global => (
            load.start_intensity * member.sin,
            load.start_intensity * member.cos,
            load.end_intensity * member.sin,
            load.end_intensity * member.cos,
        ),
    };

    let s = (x - offset).min(span);
    let d_par = (par1 - par0) / span;
    let d_perp = (perp1 - perp0) / span;

    // Force resultants over the loaded part left of the cut
    let px = par0 * s + d_par * s * s / 2.0;
    let py = perp0 * s + d_perp * s * s / 2.0;

    // First moment of the transverse load about the cut at x
    let my = if x <= offset + span {
        perp0 * s * s / 2.0 + d_perp * s * s * s / 6.0
    } else {
        let lever = x - offset;
        lever * py - (perp0 * s * s / 2.0 + d_perp * s * s * s / 3.0)
    };

    (px, py, my)
}

fn recover_planar_result(
    assembler: &Assembler<'_>,
    planar: &PlanarElement,
    displacements: &DVector<f64>,
) -> Result<PlanarResult> {
    let model = assembler.model();
    let material = model.get_material(planar.material).ok_or(
        crate::error::SolverError::Model(statik_model::ModelError::UnknownMaterial {
            element: planar.id,
            material: planar.material,
        }),
    )?;

    match assembler.mode() {
        AnalysisMode::PlaneStress | AnalysisMode::PlaneStrain => {
            let d_matrix = if assembler.mode() == AnalysisMode::PlaneStrain {
                plane_strain_matrix(material)
            } else {
                plane_stress_matrix(material)
            };
            let coords = assembler.node_coords(planar.id, &planar.nodes)?;
            let dofs = assembler.element_dofs(planar.id, &planar.nodes)?;
            let d = gather(displacements, &dofs);

            let strain: Vector3<f64> = if planar.is_triangle() {
                let (b, _) = Cst::strain_displacement(&coords)?;
                Vector3::from_iterator((b * d).iter().copied())
            } else {
                let (b, _) = Quad4::strain_displacement_at(&coords, 0.0, 0.0)?;
                Vector3::from_iterator((b * d).iter().copied())
            };
            let stress = d_matrix * strain;
            let (s1, s2, angle) = principal(stress[0], stress[1], stress[2]);
            let von_mises = (stress[0].powi(2) - stress[0] * stress[1] + stress[1].powi(2)
                + 3.0 * stress[2].powi(2))
            .sqrt();
            Ok(PlanarResult::Membrane(MembraneStress {
                sx: stress[0],
                sy: stress[1],
                txy: stress[2],
                s1,
                s2,
                angle,
                von_mises,
            }))
        }
        AnalysisMode::PlateBending | AnalysisMode::MixedBeamPlate => {
            let rigidity = bending_rigidity_matrix(material, planar.thickness);

            // Quads were assembled as two triangles; average their states
            let triangles: Vec<Vec<i32>> = if planar.is_triangle() {
                vec![planar.nodes.clone()]
            } else {
                vec![
                    vec![planar.nodes[0], planar.nodes[1], planar.nodes[2]],
                    vec![planar.nodes[0], planar.nodes[2], planar.nodes[3]],
                ]
            };

            let mut sums = [0.0f64; 5]; // mx, my, mxy, qx, qy
            for tri_nodes in &triangles {
                let coords = assembler.node_coords(planar.id, tri_nodes)?;
                let dofs = assembler.element_dofs(planar.id, tri_nodes)?;
                let d = gather(displacements, &dofs);

                let moment_at = |xi: f64, eta: f64| -> Result<Vector3<f64>> {
                    let b = Dkt::curvature_displacement_at(coords.as_slice(), xi, eta)?;
                    Ok(rigidity * Vector3::from_iterator((b * &d).iter().copied()))
                };

                let m_center = moment_at(1.0 / 3.0, 1.0 / 3.0)?;
                // The moment field is linear in area coordinates; take its
                // physical gradient for the transverse shears
                let m0 = moment_at(0.0, 0.0)?;
                let m_xi = moment_at(1.0, 0.0)? - m0;
                let m_eta = moment_at(0.0, 1.0)? - m0;

                let x21 = coords[1][0] - coords[0][0];
                let x31 = coords[2][0] - coords[0][0];
                let y21 = coords[1][1] - coords[0][1];
                let y31 = coords[2][1] - coords[0][1];
                let det = x21 * y31 - x31 * y21;
                let (xi_x, xi_y) = (y31 / det, -x31 / det);
                let (eta_x, eta_y) = (-y21 / det, x21 / det);

                let dmx_dx = m_xi[0] * xi_x + m_eta[0] * eta_x;
                let dmy_dy = m_xi[1] * xi_y + m_eta[1] * eta_y;
                let dmxy_dx = m_xi[2] * xi_x + m_eta[2] * eta_x;
                let dmxy_dy = m_xi[2] * xi_y + m_eta[2] * eta_y;

                sums[0] += m_center[0];
                sums[1] += m_center[1];
                sums[2] += m_center[2];
                sums[3] += dmx_dx + dmxy_dy;
                sums[4] += dmxy_dx + dmy_dy;
            }
            let count = triangles.len() as f64;
            let (mx, my, mxy) = (sums[0] / count, sums[1] / count, sums[2] / count);
            let (m1, m2, angle) = principal(mx, my, mxy);
            Ok(PlanarResult::Bending(PlateMoments {
                mx,
                my,
                mxy,
                m1,
                m2,
                angle,
                qx: sums[3] / count,
                qy: sums[4] / count,
            }))
        }
        AnalysisMode::Frame => unreachable!("planar recovery is not run in frame mode"),
    }
}
