//! Beam (frame) members: end connections and member loads.

use serde::{Deserialize, Serialize};

use crate::section::Section;

/// End connection of a beam member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connection {
    /// Moment-resisting connection, all end DOFs coupled
    #[default]
    Rigid,
    /// Rotational release at the end (pinned)
    Hinged,
    /// Axial force may only be tensile; member drops out under compression
    TensionOnly,
    /// Axial force may only be compressive; member drops out under tension
    PressureOnly,
}

impl Connection {
    /// True if the end rotation is released
    pub fn releases_rotation(&self) -> bool {
        matches!(self, Connection::Hinged)
    }

    /// True if the connection carries only one sign of axial force
    pub fn is_axial_only(&self) -> bool {
        matches!(self, Connection::TensionOnly | Connection::PressureOnly)
    }
}

/// Reference frame for a distributed load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadAxes {
    /// Intensity acts along the member's local y axis
    #[default]
    Local,
    /// Intensity acts along global Y
    Global,
}

/// Trapezoidal distributed load on a beam member, optionally over a sub-span
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributedLoad {
    /// Intensity at the loaded span's start [force/length]
    pub start_intensity: f64,
    /// Intensity at the loaded span's end [force/length]
    pub end_intensity: f64,
    /// Distance from the member's start node to the loaded span [length]
    pub start_offset: f64,
    /// Loaded length; `None` loads the rest of the member
    pub length: Option<f64>,
    /// Reference frame for the intensities
    pub axes: LoadAxes,
}

impl DistributedLoad {
    /// Uniform full-span load in local axes
    pub fn uniform(intensity: f64) -> Self {
        Self {
            start_intensity: intensity,
            end_intensity: intensity,
            start_offset: 0.0,
            length: None,
            axes: LoadAxes::Local,
        }
    }

    /// Loaded span clamped to a member of length `member_length`,
    /// as (offset, span length)
    pub fn span_on(&self, member_length: f64) -> (f64, f64) {
        let a = self.start_offset.clamp(0.0, member_length);
        let len = match self.length {
            Some(l) => l.min(member_length - a),
            None => member_length - a,
        };
        (a, len.max(0.0))
    }
}

/// A two-node beam member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamElement {
    /// Element id (unique within a model)
    pub id: i32,
    /// Start and end node ids
    pub nodes: [i32; 2],
    /// Material id
    pub material: i32,
    /// Cross-section properties
    pub section: Section,
    /// Connection at the start node
    pub start_connection: Connection,
    /// Connection at the end node
    pub end_connection: Connection,
    /// Optional distributed member load
    pub load: Option<DistributedLoad>,
}

impl BeamElement {
    pub fn new(id: i32, start: i32, end: i32, material: i32, section: Section) -> Self {
        Self {
            id,
            nodes: [start, end],
            material,
            section,
            start_connection: Connection::Rigid,
            end_connection: Connection::Rigid,
            load: None,
        }
    }

    /// True if either end is tension-only or pressure-only
    pub fn has_axial_release(&self) -> bool {
        self.start_connection.is_axial_only() || self.end_connection.is_axial_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::Section;

    #[test]
    fn span_clamps_to_member() {
        let load = DistributedLoad {
            start_intensity: -5.0,
            end_intensity: -5.0,
            start_offset: 1.0,
            length: Some(10.0),
            axes: LoadAxes::Local,
        };
        let (a, len) = load.span_on(4.0);
        assert_eq!(a, 1.0);
        assert_eq!(len, 3.0);
    }

    #[test]
    fn full_span_by_default() {
        let load = DistributedLoad::uniform(-2.0);
        let (a, len) = load.span_on(6.0);
        assert_eq!(a, 0.0);
        assert_eq!(len, 6.0);
    }

    #[test]
    fn axial_release_detection() {
        let mut beam = BeamElement::new(1, 1, 2, 1, Section::rectangle(0.1, 0.1));
        assert!(!beam.has_axial_release());
        beam.end_connection = Connection::TensionOnly;
        assert!(beam.has_axial_release());
    }
}
