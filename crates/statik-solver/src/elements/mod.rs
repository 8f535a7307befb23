//! Element formulations for 2D structural analysis.

use nalgebra::{DMatrix, Matrix3};
use statik_model::Material;

pub mod beam;
pub mod cst;
pub mod dkt;
pub mod quad;

pub use beam::FrameMember;
pub use cst::Cst;
pub use dkt::Dkt;
pub use quad::Quad4;

use crate::error::Result;

/// Stiffness interface of a planar element kind, selected once per solve
pub trait PlanarFormulation {
    /// Element stiffness for corner coordinates in model axes
    ///
    /// # Arguments
    /// * `coords` - one (x, y) pair per corner node
    /// * `material` - linear elastic material
    /// * `thickness` - element thickness
    ///
    /// # Returns
    /// Stiffness of size (num_nodes · dofs_per_node) squared
    fn stiffness(
        &self,
        coords: &[[f64; 2]],
        material: &Material,
        thickness: f64,
    ) -> Result<DMatrix<f64>>;

    fn num_nodes(&self) -> usize;

    fn dofs_per_node(&self) -> usize;
}

/// Plane-stress constitutive matrix
pub fn plane_stress_matrix(material: &Material) -> Matrix3<f64> {
    let e = material.elastic_modulus;
    let nu = material.poissons_ratio;
    let factor = e / (1.0 - nu * nu);
    Matrix3::new(
        factor,
        factor * nu,
        0.0,
        factor * nu,
        factor,
        0.0,
        0.0,
        0.0,
        factor * (1.0 - nu) / 2.0,
    )
}

/// Plane-strain constitutive matrix
pub fn plane_strain_matrix(material: &Material) -> Matrix3<f64> {
    let e = material.elastic_modulus;
    let nu = material.poissons_ratio;
    let factor = e / ((1.0 + nu) * (1.0 - 2.0 * nu));
    Matrix3::new(
        factor * (1.0 - nu),
        factor * nu,
        0.0,
        factor * nu,
        factor * (1.0 - nu),
        0.0,
        0.0,
        0.0,
        factor * (1.0 - 2.0 * nu) / 2.0,
    )
}

/// Plate bending rigidity matrix, `E t³ / (12 (1 − ν²))` times the
/// plane-stress structure
pub fn bending_rigidity_matrix(material: &Material, thickness: f64) -> Matrix3<f64> {
    plane_stress_matrix(material) * (thickness.powi(3) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn plane_stress_matrix_entries() {
        let mat = Material::new(1, "test", 100.0, 0.25);
        let d = plane_stress_matrix(&mat);
        let f = 100.0 / (1.0 - 0.0625);
        assert_relative_eq!(d[(0, 0)], f, max_relative = 1e-12);
        assert_relative_eq!(d[(0, 1)], f * 0.25, max_relative = 1e-12);
        assert_relative_eq!(d[(2, 2)], f * 0.375, max_relative = 1e-12);
    }

    #[test]
    fn plane_strain_is_stiffer_than_plane_stress() {
        let mat = Material::new(1, "test", 210e9, 0.3);
        let ds = plane_stress_matrix(&mat);
        let de = plane_strain_matrix(&mat);
        assert!(de[(0, 0)] > ds[(0, 0)]);
    }

    #[test]
    fn bending_rigidity_scales_with_thickness_cubed() {
        let mat = Material::new(1, "test", 30e9, 0.2);
        let d1 = bending_rigidity_matrix(&mat, 0.1);
        let d2 = bending_rigidity_matrix(&mat, 0.2);
        assert_relative_eq!(d2[(0, 0)] / d1[(0, 0)], 8.0, max_relative = 1e-12);
    }
}
