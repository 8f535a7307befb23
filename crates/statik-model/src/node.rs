//! Nodes, support conditions and nodal loads.

use serde::{Deserialize, Serialize};

/// Per-DOF support flags for a node (x translation, y translation, rotation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Constraint {
    pub x: bool,
    pub y: bool,
    pub rot: bool,
}

impl Constraint {
    /// Fully fixed support
    pub fn fixed() -> Self {
        Self {
            x: true,
            y: true,
            rot: true,
        }
    }

    /// Pinned support (both translations held, rotation free)
    pub fn pinned() -> Self {
        Self {
            x: true,
            y: true,
            rot: false,
        }
    }

    /// True if any DOF is constrained
    pub fn any(&self) -> bool {
        self.x || self.y || self.rot
    }

    /// Number of constrained DOFs, counting only the first `dofs_per_node`
    pub fn count(&self, dofs_per_node: usize) -> usize {
        let mut n = 0;
        if self.x {
            n += 1;
        }
        if self.y {
            n += 1;
        }
        if self.rot && dofs_per_node > 2 {
            n += 1;
        }
        n
    }

    /// Union of two constraint sets
    pub fn merge(&self, other: &Constraint) -> Constraint {
        Constraint {
            x: self.x || other.x,
            y: self.y || other.y,
            rot: self.rot || other.rot,
        }
    }
}

/// Elastic support stiffness per DOF; a zero entry means a rigid support
/// for that DOF when the corresponding constraint flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpringSupport {
    /// Translational stiffness in x [force/length]
    pub kx: f64,
    /// Translational stiffness in y [force/length]
    pub ky: f64,
    /// Rotational stiffness [force·length/rad]
    pub kr: f64,
}

impl SpringSupport {
    pub fn is_zero(&self) -> bool {
        self.kx == 0.0 && self.ky == 0.0 && self.kr == 0.0
    }
}

/// Concentrated nodal load
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodalLoad {
    /// Force in global x [force]
    pub fx: f64,
    /// Force in global y [force]
    pub fy: f64,
    /// Moment about z [force·length]
    pub mz: f64,
}

impl NodalLoad {
    pub fn is_zero(&self) -> bool {
        self.fx == 0.0 && self.fy == 0.0 && self.mz == 0.0
    }

    /// Component-wise sum, used when loads are transferred between nodes
    pub fn add(&self, other: &NodalLoad) -> NodalLoad {
        NodalLoad {
            fx: self.fx + other.fx,
            fy: self.fy + other.fy,
            mz: self.mz + other.mz,
        }
    }
}

/// A node in the 2D structural model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node id (unique within a model)
    pub id: i32,
    /// X coordinate [length]
    pub x: f64,
    /// Y coordinate [length]
    pub y: f64,
    /// Support conditions
    pub constraint: Constraint,
    /// Elastic support stiffness for constrained DOFs
    pub springs: SpringSupport,
    /// Concentrated load acting at the node
    pub load: NodalLoad,
}

impl Node {
    /// Create a free, unloaded node
    pub fn new(id: i32, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            constraint: Constraint::default(),
            springs: SpringSupport::default(),
            load: NodalLoad::default(),
        }
    }

    /// Create a fully fixed node
    pub fn fixed(id: i32, x: f64, y: f64) -> Self {
        Self {
            constraint: Constraint::fixed(),
            ..Self::new(id, x, y)
        }
    }

    /// Create a pinned node
    pub fn pinned(id: i32, x: f64, y: f64) -> Self {
        Self {
            constraint: Constraint::pinned(),
            ..Self::new(id, x, y)
        }
    }

    /// Euclidean distance to another node
    pub fn distance_to(&self, other: &Node) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}
