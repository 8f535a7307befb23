//! Constant-strain triangle for plane stress and plane strain.

use nalgebra::{DMatrix, Matrix3};
use statik_model::Material;

use super::{PlanarFormulation, plane_strain_matrix, plane_stress_matrix};
use crate::error::{Result, SolverError};

/// 3-node constant-strain triangle, DOFs (u, v) per node
#[derive(Debug, Clone, Copy)]
pub struct Cst {
    /// Use the plane-strain constitutive law instead of plane stress
    pub plane_strain: bool,
}

impl Cst {
    pub fn plane_stress() -> Self {
        Self {
            plane_strain: false,
        }
    }

    pub fn plane_strain() -> Self {
        Self { plane_strain: true }
    }

    fn elasticity(&self, material: &Material) -> Matrix3<f64> {
        if self.plane_strain {
            plane_strain_matrix(material)
        } else {
            plane_stress_matrix(material)
        }
    }

    /// Strain-displacement matrix (3×6) and element area.
    ///
    /// The B matrix uses the signed double area, so node ordering does not
    /// change the resulting stiffness.
    pub fn strain_displacement(coords: &[[f64; 2]]) -> Result<(DMatrix<f64>, f64)> {
        if coords.len() != 3 {
            return Err(SolverError::DimensionMismatch(format!(
                "triangle needs 3 corner coordinates, got {}",
                coords.len()
            )));
        }
        let [p1, p2, p3] = [coords[0], coords[1], coords[2]];
        let two_a = (p2[0] - p1[0]) * (p3[1] - p1[1]) - (p3[0] - p1[0]) * (p2[1] - p1[1]);
        if two_a.abs() < 1e-14 {
            return Err(SolverError::DimensionMismatch(
                "degenerate triangle with zero area".to_string(),
            ));
        }

        let b1 = p2[1] - p3[1];
        let b2 = p3[1] - p1[1];
        let b3 = p1[1] - p2[1];
        let c1 = p3[0] - p2[0];
        let c2 = p1[0] - p3[0];
        let c3 = p2[0] - p1[0];

        #[rustfmt::skip]
        let b = DMatrix::from_row_slice(3, 6, &[
            b1, 0.0, b2, 0.0, b3, 0.0,
            0.0, c1, 0.0, c2, 0.0, c3,
            c1, b1, c2, b2, c3, b3,
        ]) / two_a;

        Ok((b, two_a.abs() / 2.0))
    }
}

impl PlanarFormulation for Cst {
    fn stiffness(
        &self,
        coords: &[[f64; 2]],
        material: &Material,
        thickness: f64,
    ) -> Result<DMatrix<f64>> {
        let (b, area) = Self::strain_displacement(coords)?;
        let d = self.elasticity(material);
        Ok(b.transpose() * d * b * (thickness * area))
    }

    fn num_nodes(&self) -> usize {
        3
    }

    fn dofs_per_node(&self) -> usize {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    fn unit_triangle() -> Vec<[f64; 2]> {
        vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
    }

    #[test]
    fn stiffness_is_symmetric() {
        let mat = Material::new(1, "steel", 210e9, 0.3);
        let k = Cst::plane_stress()
            .stiffness(&unit_triangle(), &mat, 0.01)
            .unwrap();
        for i in 0..6 {
            for j in 0..6 {
                assert_relative_eq!(k[(i, j)], k[(j, i)], max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn rigid_body_translation_produces_no_force() {
        let mat = Material::new(1, "steel", 210e9, 0.3);
        let k = Cst::plane_stress()
            .stiffness(&unit_triangle(), &mat, 0.01)
            .unwrap();
        let translation = DVector::from_vec(vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        let force = k * translation;
        for i in 0..6 {
            assert!(force[i].abs() < 1e-3, "residual force at dof {i}");
        }
    }

    #[test]
    fn node_order_does_not_change_stiffness_scale() {
        let mat = Material::new(1, "steel", 210e9, 0.3);
        let ccw = Cst::plane_stress()
            .stiffness(&unit_triangle(), &mat, 0.01)
            .unwrap();
        let cw = Cst::plane_stress()
            .stiffness(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0]], &mat, 0.01)
            .unwrap();
        assert_relative_eq!(ccw[(0, 0)], cw[(0, 0)], max_relative = 1e-12);
    }

    #[test]
    fn constant_strain_patch() {
        // Uniaxial stretch u = 0.001 x produces the constant strain 0.001
        let coords = unit_triangle();
        let (b, _) = Cst::strain_displacement(&coords).unwrap();
        let d = DVector::from_vec(vec![0.0, 0.0, 0.001, 0.0, 0.0, 0.0]);
        let strain = b * d;
        assert_relative_eq!(strain[0], 0.001, max_relative = 1e-12);
        assert!(strain[1].abs() < 1e-15);
        assert!(strain[2].abs() < 1e-15);
    }

    #[test]
    fn degenerate_triangle_is_rejected() {
        let coords = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]];
        assert!(Cst::strain_displacement(&coords).is_err());
    }
}
