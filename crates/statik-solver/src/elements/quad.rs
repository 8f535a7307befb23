//! Bilinear quadrilateral for plane stress and plane strain.

use nalgebra::{DMatrix, Matrix2, Matrix3};
use statik_model::Material;

use super::{PlanarFormulation, plane_strain_matrix, plane_stress_matrix};
use crate::error::{Result, SolverError};

/// Natural coordinates of the corner nodes
const CORNERS: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

/// 4-node isoparametric quadrilateral, DOFs (u, v) per node,
/// integrated with a 2×2 Gauss rule
#[derive(Debug, Clone, Copy)]
pub struct Quad4 {
    /// Use the plane-strain constitutive law instead of plane stress
    pub plane_strain: bool,
}

impl Quad4 {
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

    /// Shape function derivatives with respect to (ξ, η)
    fn shape_derivatives(xi: f64, eta: f64) -> [[f64; 2]; 4] {
        let mut d = [[0.0; 2]; 4];
        for (i, corner) in CORNERS.iter().enumerate() {
            d[i][0] = 0.25 * corner[0] * (1.0 + corner[1] * eta);
            d[i][1] = 0.25 * corner[1] * (1.0 + corner[0] * xi);
        }
        d
    }

    /// Strain-displacement matrix (3×8) and Jacobian determinant at a
    /// natural-coordinate point
    pub fn strain_displacement_at(
        coords: &[[f64; 2]],
        xi: f64,
        eta: f64,
    ) -> Result<(DMatrix<f64>, f64)> {
        if coords.len() != 4 {
            return Err(SolverError::DimensionMismatch(format!(
                "quadrilateral needs 4 corner coordinates, got {}",
                coords.len()
            )));
        }

        let dn = Self::shape_derivatives(xi, eta);
        let mut jac = Matrix2::<f64>::zeros();
        for (i, c) in coords.iter().enumerate() {
            jac[(0, 0)] += dn[i][0] * c[0];
            jac[(0, 1)] += dn[i][0] * c[1];
            jac[(1, 0)] += dn[i][1] * c[0];
            jac[(1, 1)] += dn[i][1] * c[1];
        }
        let det = jac.determinant();
        if det <= 1e-14 {
            return Err(SolverError::DimensionMismatch(
                "quadrilateral has non-positive Jacobian".to_string(),
            ));
        }
        let jac_inv = jac
            .try_inverse()
            .ok_or_else(|| SolverError::DimensionMismatch("singular Jacobian".to_string()))?;

        let mut b = DMatrix::<f64>::zeros(3, 8);
        for i in 0..4 {
            let dx = jac_inv[(0, 0)] * dn[i][0] + jac_inv[(0, 1)] * dn[i][1];
            let dy = jac_inv[(1, 0)] * dn[i][0] + jac_inv[(1, 1)] * dn[i][1];
            b[(0, 2 * i)] = dx;
            b[(1, 2 * i + 1)] = dy;
            b[(2, 2 * i)] = dy;
            b[(2, 2 * i + 1)] = dx;
        }
        Ok((b, det))
    }
}

impl PlanarFormulation for Quad4 {
    fn stiffness(
        &self,
        coords: &[[f64; 2]],
        material: &Material,
        thickness: f64,
    ) -> Result<DMatrix<f64>> {
        let d = self.elasticity(material);
        let gauss = 1.0 / 3.0_f64.sqrt();
        let mut k = DMatrix::<f64>::zeros(8, 8);
        for &xi in &[-gauss, gauss] {
            for &eta in &[-gauss, gauss] {
                let (b, det) = Self::strain_displacement_at(coords, xi, eta)?;
                k += b.transpose() * d * b * (thickness * det);
            }
        }
        Ok(k)
    }

    fn num_nodes(&self) -> usize {
        4
    }

    fn dofs_per_node(&self) -> usize {
        2
    }
}
