//! Static 2D structural analysis on a [`statik_model::StructuralModel`].
//!
//! The solve pipeline runs model validation, constraint/load transfer onto
//! active nodes, global assembly for the selected analysis mode, a direct
//! dense solve with penalty constraints, and result recovery. Frame models
//! additionally go through the axial-release fixed point for tension-only
//! and pressure-only members and an optional P-Delta Newton-Raphson loop.
//! The layered reinforced-concrete section model is evaluated standalone.

pub mod analysis;
pub mod assembly;
pub mod elements;
pub mod error;
pub mod layered;
pub mod linear;
pub mod postprocess;
pub mod solver;
pub mod transfer;

pub use analysis::{AnalysisConfig, AnalysisMode, CancelToken};
pub use assembly::{Assembler, DofMap, GlobalSystem, MIN_CONSTRAINED_DOFS};
pub use elements::{Cst, Dkt, FrameMember, PlanarFormulation, Quad4};
pub use error::{Result, SolverError};
pub use layered::{
    ConcreteProperties, CrackModel, LayeredPlate, ReinforcementLayer, SectionForces,
    SectionResponse,
};
pub use linear::{PENALTY, SINGULAR_THRESHOLD};
pub use postprocess::{
    AnalysisResult, BeamForces, MembraneStress, MinMax, PlanarResult, PlateMoments,
    ResultExtremes,
};
pub use solver::solve;
pub use transfer::{TransferMap, TRANSFER_TOLERANCE};
