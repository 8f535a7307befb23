//! Structural model types for 2D static analysis.
//!
//! This crate holds the plain-data description of a structure: nodes with
//! supports, springs and loads, beam members with end connections and
//! distributed loads, planar elements, and materials. The analysis core in
//! `statik-solver` consumes a [`StructuralModel`] as a read-only snapshot.

pub mod beam;
pub mod error;
pub mod material;
pub mod model;
pub mod node;
pub mod planar;
pub mod section;

pub use beam::{BeamElement, Connection, DistributedLoad, LoadAxes};
pub use error::{ModelError, Result};
pub use material::Material;
pub use model::{ModelStatistics, StructuralModel};
pub use node::{Constraint, NodalLoad, Node, SpringSupport};
pub use planar::PlanarElement;
pub use section::Section;
