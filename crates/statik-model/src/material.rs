//! Material definitions.

use serde::{Deserialize, Serialize};

/// Linear elastic isotropic material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Material id (unique within a model)
    pub id: i32,
    /// Display name
    pub name: String,
    /// Young's modulus (E) [force/length²]
    pub elastic_modulus: f64,
    /// Poisson's ratio (ν) [-]
    pub poissons_ratio: f64,
}

impl Material {
    pub fn new(id: i32, name: &str, elastic_modulus: f64, poissons_ratio: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            elastic_modulus,
            poissons_ratio,
        }
    }

    /// Shear modulus (G) from E and ν
    pub fn shear_modulus(&self) -> f64 {
        self.elastic_modulus / (2.0 * (1.0 + self.poissons_ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shear_modulus_from_e_and_nu() {
        let steel = Material::new(1, "steel", 210000.0, 0.3);
        assert!((steel.shear_modulus() - 80769.23).abs() < 0.01);
    }
}
