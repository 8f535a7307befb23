//! Analysis orchestration: mode dispatch, the axial-release fixed point
//! for tension/pressure-only members and the P-Delta Newton-Raphson loop.

use std::collections::{HashMap, HashSet};

use nalgebra::DVector;
use statik_model::{Connection, StructuralModel};

use crate::analysis::{AnalysisConfig, AnalysisMode};
use crate::assembly::{Assembler, GlobalSystem};
use crate::error::{Result, SolverError};
use crate::postprocess::{self, AnalysisResult};

/// Trial axial forces this close to zero do not count as a violation
const AXIAL_SIGN_TOLERANCE: f64 = 1e-8;

/// Last state of a nonlinear loop, handed to result recovery
struct IterationOutcome {
    system: GlobalSystem,
    displacements: DVector<f64>,
    converged: bool,
    iterations: usize,
}

/// Run one analysis of the model.
///
/// Dispatches on the configured mode, falling back to frame analysis when
/// a planar mode is requested on a model without planar elements. The
/// frame path runs the axial-release fixed point when tension-only or
/// pressure-only connections are present, then the P-Delta loop when
/// second-order effects are enabled.
pub fn solve(model: &StructuralModel, config: &AnalysisConfig) -> Result<AnalysisResult> {
    let mode = effective_mode(model, config.mode);
    let assembler = Assembler::new(model, mode)?;
    assembler.validate_solvable()?;

    match mode {
        AnalysisMode::Frame => solve_frame(&assembler, config),
        _ => {
            let system = assembler.assemble(&HashSet::new(), None)?;
            let displacements = system.solve()?;
            postprocess::build_result(
                &assembler,
                &system,
                &displacements,
                &HashSet::new(),
                true,
                0,
            )
        }
    }
}

/// Planar modes degrade to frame analysis when no planars exist
fn effective_mode(model: &StructuralModel, requested: AnalysisMode) -> AnalysisMode {
    if requested.includes_planars() && model.planars.is_empty() {
        log::info!("no planar elements in the model, running a frame analysis instead");
        AnalysisMode::Frame
    } else {
        requested
    }
}

fn solve_frame(assembler: &Assembler<'_>, config: &AnalysisConfig) -> Result<AnalysisResult> {
    let has_axial_only = assembler
        .model()
        .beams
        .values()
        .any(|b| b.has_axial_release());

    let mut released = HashSet::new();
    let mut converged = true;
    let mut iterations = 0;

    if has_axial_only {
        let (set, outcome) = axial_release_iteration(assembler, config)?;
        released = set;
        converged = outcome.converged;
        iterations = outcome.iterations;
        if !config.second_order {
            return postprocess::build_result(
                assembler,
                &outcome.system,
                &outcome.displacements,
                &released,
                converged,
                iterations,
            );
        }
    }

    if config.second_order {
        let outcome = p_delta_iteration(assembler, config, &released)?;
        return postprocess::build_result(
            assembler,
            &outcome.system,
            &outcome.displacements,
            &released,
            converged && outcome.converged,
            iterations + outcome.iterations,
        );
    }

    let system = assembler.assemble(&released, None)?;
    let displacements = system.solve()?;
    postprocess::build_result(assembler, &system, &displacements, &released, true, 0)
}

/// Fixed-point iteration over the set of axially released members.
///
/// Each round solves with the current release set, then recomputes the
/// trial axial force of every tension-only and pressure-only member with
/// its full axial stiffness; members whose trial force violates the
/// connection are released in the next round. A revisited release set is
/// a cycle: the loop stops, keeps the last membership and reports the
/// solve as non-converged. Either way one final solve with the last
/// membership produces the returned state.
fn axial_release_iteration(
    assembler: &Assembler<'_>,
    config: &AnalysisConfig,
) -> Result<(HashSet<i32>, IterationOutcome)> {
    let mut released: HashSet<i32> = HashSet::new();
    let mut history = vec![signature(&released)];
    let mut iterations = 0;
    let mut cycle = false;

    while iterations < config.max_iterations {
        check_cancelled(config)?;
        iterations += 1;

        let system = assembler.assemble(&released, None)?;
        let displacements = system.solve()?;
        let next = violating_members(assembler, &displacements)?;

        if next == released {
            let outcome = IterationOutcome {
                system,
                displacements,
                converged: true,
                iterations,
            };
            return Ok((released, outcome));
        }

        let sig = signature(&next);
        let revisited = history.contains(&sig);
        released = next;
        if revisited {
            log::warn!("axial release set entered a cycle after {iterations} iterations");
            cycle = true;
            break;
        }
        history.push(sig);
    }

    if !cycle {
        log::warn!(
            "axial release iteration did not settle within {} iterations",
            config.max_iterations
        );
    }

    check_cancelled(config)?;
    let system = assembler.assemble(&released, None)?;
    let displacements = system.solve()?;
    let outcome = IterationOutcome {
        system,
        displacements,
        converged: false,
        iterations,
    };
    Ok((released, outcome))
}

/// Members whose trial axial force violates their connection type.
///
/// Trial forces are recovered with the full axial stiffness so that
/// released members can be re-admitted when the displacements would put
/// them back into an admissible state.
fn violating_members(
    assembler: &Assembler<'_>,
    displacements: &DVector<f64>,
) -> Result<HashSet<i32>> {
    let trial = postprocess::recover_axial_forces(assembler, displacements, &HashSet::new())?;
    let mut violating = HashSet::new();
    for beam in assembler.model().beams.values() {
        let axial = trial.get(&beam.id).copied().unwrap_or(0.0);
        let tension_only = beam.start_connection == Connection::TensionOnly
            || beam.end_connection == Connection::TensionOnly;
        let pressure_only = beam.start_connection == Connection::PressureOnly
            || beam.end_connection == Connection::PressureOnly;
        if (tension_only && axial < -AXIAL_SIGN_TOLERANCE)
            || (pressure_only && axial > AXIAL_SIGN_TOLERANCE)
        {
            violating.insert(beam.id);
        }
    }
    Ok(violating)
}

/// Sorted ids of a release set, used for cycle detection
fn signature(released: &HashSet<i32>) -> Vec<i32> {
    let mut ids: Vec<i32> = released.iter().copied().collect();
    ids.sort_unstable();
    ids
}

/// Incremental Newton-Raphson with the consistent geometric stiffness.
///
/// The load is applied in `load_steps` equal increments. Within each step
/// the tangent stiffness is reassembled from the current axial-force
/// estimates and the displacement correction is solved from the residual
/// until `‖r‖ / (‖f‖ + 1e-10)` drops below the configured tolerance. A
/// step that exhausts the iteration budget is logged and the result is
/// flagged as non-converged.
fn p_delta_iteration(
    assembler: &Assembler<'_>,
    config: &AnalysisConfig,
    released: &HashSet<i32>,
) -> Result<IterationOutcome> {
    let num_dofs = assembler.dof_map().num_dofs();
    let mut displacements = DVector::<f64>::zeros(num_dofs);
    let mut axials: HashMap<i32, f64> = HashMap::new();
    let mut iterations = 0;
    let mut converged = true;

    let full_load = assembler.assemble(released, None)?.force;
    let steps = config.load_steps.max(1);

    for step in 1..=steps {
        let factor = step as f64 / steps as f64;
        let target = &full_load * factor;
        let mut step_converged = false;

        for _ in 0..config.max_iterations {
            check_cancelled(config)?;
            iterations += 1;

            let system = assembler.assemble(released, Some(&axials))?;
            let mut residual = &target - &system.stiffness * &displacements;
            let mut applied = target.clone();
            for &(dof, _) in &system.fixed {
                residual[dof] = 0.0;
                applied[dof] = 0.0;
            }

            if residual.norm() / (applied.norm() + 1e-10) < config.tolerance {
                step_converged = true;
                break;
            }

            let correction =
                crate::linear::solve_with_constraints(&system.stiffness, &residual, &system.fixed)?;
            displacements += correction;
            axials = postprocess::recover_axial_forces(assembler, &displacements, released)?;
        }

        if !step_converged {
            log::warn!(
                "load step {step}/{steps} did not converge within {} iterations",
                config.max_iterations
            );
            converged = false;
        }
    }

    let system = assembler.assemble(released, Some(&axials))?;
    Ok(IterationOutcome {
        system,
        displacements,
        converged,
        iterations,
    })
}

fn check_cancelled(config: &AnalysisConfig) -> Result<()> {
    if config.cancel.is_cancelled() {
        return Err(SolverError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use statik_model::{BeamElement, Material, NodalLoad, Node, Section};

    fn cantilever_model() -> StructuralModel {
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

    #[test]
    fn planar_mode_without_planars_falls_back_to_frame() {
        let model = cantilever_model();
        let config = AnalysisConfig::with_mode(AnalysisMode::PlateBending);
        let result = solve(&model, &config).unwrap();
        assert_eq!(result.mode, AnalysisMode::Frame);
        assert!(result.converged);
    }

    #[test]
    fn linear_frame_solve_reports_zero_iterations() {
        let model = cantilever_model();
        let result = solve(&model, &AnalysisConfig::default()).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
        // Tip deflection P L^3 / (3 E I)
        let expected = -10e3 * 64.0 / (3.0 * 200e9 * 8.36e-5);
        let tip = result.node_displacement(2).unwrap();
        assert_relative_eq!(tip[1], expected, max_relative = 1e-6);
    }

    #[test]
    fn cancelled_token_aborts_nonlinear_solve() {
        let model = cantilever_model();
        let mut config = AnalysisConfig::default();
        config.second_order = true;
        config.cancel.cancel();
        assert_eq!(solve(&model, &config).unwrap_err(), SolverError::Cancelled);
    }

    #[test]
    fn second_order_compression_softens_the_tip() {
        let mut model = cantilever_model();
        // Add axial compression on top of the transverse tip load
        model.nodes.get_mut(&2).unwrap().load.fx = -1e6;

        let linear = solve(&model, &AnalysisConfig::default()).unwrap();
        let mut config = AnalysisConfig::default();
        config.second_order = true;
        let second = solve(&model, &config).unwrap();

        assert!(second.converged);
        assert!(second.iterations > 0);
        let tip_linear = linear.node_displacement(2).unwrap()[1];
        let tip_second = second.node_displacement(2).unwrap()[1];
        assert!(tip_second.abs() > tip_linear.abs());
    }

    #[test]
    fn release_signature_is_sorted() {
        let mut set = HashSet::new();
        set.insert(3);
        set.insert(1);
        set.insert(2);
        assert_eq!(signature(&set), vec![1, 2, 3]);
    }
}
