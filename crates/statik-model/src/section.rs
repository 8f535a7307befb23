//! Beam cross-section properties.

use serde::{Deserialize, Serialize};

/// Cross-section properties of a beam member
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Cross-sectional area [length²]
    pub area: f64,
    /// Second moment of area about the local y axis [length⁴]
    pub i_y: f64,
    /// Second moment of area about the local z axis (in-plane bending) [length⁴]
    pub i_z: f64,
    /// Section modulus about the local y axis [length³]
    pub w_y: f64,
    /// Section modulus about the local z axis [length³]
    pub w_z: f64,
}

impl Section {
    /// Section for a solid rectangle of width `b` and height `h`
    pub fn rectangle(b: f64, h: f64) -> Self {
        Self {
            area: b * h,
            i_y: h * b.powi(3) / 12.0,
            i_z: b * h.powi(3) / 12.0,
            w_y: h * b.powi(2) / 6.0,
            w_z: b * h.powi(2) / 6.0,
        }
    }
}
