//! Discrete Kirchhoff triangle for plate bending.
//!
//! Batoz formulation with the curvature field expressed through the Hx/Hy
//! shape-function derivative arrays, integrated at the three mid-side
//! points (exact for this element). DOFs per node: (w, θx, θy).

use nalgebra::{DMatrix, Matrix3};
use statik_model::Material;

use super::{PlanarFormulation, bending_rigidity_matrix};
use crate::error::{Result, SolverError};

/// Mid-side integration points in area coordinates, each with weight 1/6
const MIDSIDE: [[f64; 2]; 3] = [[0.5, 0.0], [0.5, 0.5], [0.0, 0.5]];

/// Side geometry parameters of the Batoz formulation
#[derive(Debug, Clone, Copy)]
struct SideParams {
    p: [f64; 3],
    t: [f64; 3],
    q: [f64; 3],
    r: [f64; 3],
}

/// Geometry terms shared by all integration points of one triangle
#[derive(Debug, Clone, Copy)]
struct Geometry {
    x31: f64,
    x12: f64,
    y31: f64,
    y12: f64,
    two_a: f64,
    sides: SideParams,
}

impl Geometry {
    fn new(coords: &[[f64; 2]]) -> Result<Self> {
        if coords.len() != 3 {
            return Err(SolverError::DimensionMismatch(format!(
                "plate triangle needs 3 corner coordinates, got {}",
                coords.len()
            )));
        }
        let [p1, p2, p3] = [coords[0], coords[1], coords[2]];
        let x23 = p2[0] - p3[0];
        let x31 = p3[0] - p1[0];
        let x12 = p1[0] - p2[0];
        let y23 = p2[1] - p3[1];
        let y31 = p3[1] - p1[1];
        let y12 = p1[1] - p2[1];
        let two_a = x31 * y12 - x12 * y31;
        if two_a.abs() < 1e-14 {
            return Err(SolverError::DimensionMismatch(
                "degenerate plate triangle with zero area".to_string(),
            ));
        }

        // Sides 4, 5, 6 run along nodes 2-3, 3-1 and 1-2
        let mut p = [0.0; 3];
        let mut t = [0.0; 3];
        let mut q = [0.0; 3];
        let mut r = [0.0; 3];
        for (k, (xk, yk)) in [(x23, y23), (x31, y31), (x12, y12)].into_iter().enumerate() {
            let l2 = xk * xk + yk * yk;
            p[k] = -6.0 * xk / l2;
            t[k] = -6.0 * yk / l2;
            q[k] = 3.0 * xk * yk / l2;
            r[k] = 3.0 * yk * yk / l2;
        }

        Ok(Self {
            x31,
            x12,
            y31,
            y12,
            two_a,
            sides: SideParams { p, t, q, r },
        })
    }

    /// Derivatives of the Hx and Hy interpolations with respect to the
    /// area coordinates (ξ, η), each a row of 9 entries
    #[allow(clippy::many_single_char_names)]
    fn h_derivatives(&self, xi: f64, eta: f64) -> ([f64; 9], [f64; 9], [f64; 9], [f64; 9]) {
        let SideParams { p, t, q, r } = self.sides;
        let (p4, p5, p6) = (p[0], p[1], p[2]);
        let (t4, t5, t6) = (t[0], t[1], t[2]);
        let (q4, q5, q6) = (q[0], q[1], q[2]);
        let (r4, r5, r6) = (r[0], r[1], r[2]);

        let hx_xi = [
            p6 * (1.0 - 2.0 * xi) + (p5 - p6) * eta,
            q6 * (1.0 - 2.0 * xi) - (q5 + q6) * eta,
            -4.0 + 6.0 * (xi + eta) + r6 * (1.0 - 2.0 * xi) - eta * (r5 + r6),
            -p6 * (1.0 - 2.0 * xi) + eta * (p4 + p6),
            q6 * (1.0 - 2.0 * xi) - eta * (q6 - q4),
            -2.0 + 6.0 * xi + r6 * (1.0 - 2.0 * xi) + eta * (r4 - r6),
            -eta * (p5 + p4),
            eta * (q4 - q5),
            -eta * (r5 - r4),
        ];
        let hy_xi = [
            t6 * (1.0 - 2.0 * xi) + eta * (t5 - t6),
            1.0 + r6 * (1.0 - 2.0 * xi) - eta * (r5 + r6),
            -q6 * (1.0 - 2.0 * xi) + eta * (q5 + q6),
            -t6 * (1.0 - 2.0 * xi) + eta * (t4 + t6),
            -1.0 + r6 * (1.0 - 2.0 * xi) + eta * (r4 - r6),
            -q6 * (1.0 - 2.0 * xi) - eta * (q4 - q6),
            -eta * (t4 + t5),
            eta * (r4 - r5),
            -eta * (q4 - q5),
        ];
        let hx_eta = [
            -p5 * (1.0 - 2.0 * eta) - xi * (p6 - p5),
            q5 * (1.0 - 2.0 * eta) - xi * (q5 + q6),
            -4.0 + 6.0 * (xi + eta) + r5 * (1.0 - 2.0 * eta) - xi * (r5 + r6),
            xi * (p4 + p6),
            xi * (q4 - q6),
            -xi * (r6 - r4),
            p5 * (1.0 - 2.0 * eta) - xi * (p4 + p5),
            q5 * (1.0 - 2.0 * eta) + xi * (q4 - q5),
            -2.0 + 6.0 * eta + r5 * (1.0 - 2.0 * eta) + xi * (r4 - r5),
        ];
        let hy_eta = [
            -t5 * (1.0 - 2.0 * eta) - xi * (t6 - t5),
            1.0 + r5 * (1.0 - 2.0 * eta) - xi * (r5 + r6),
            -q5 * (1.0 - 2.0 * eta) + xi * (q5 + q6),
            xi * (t4 + t6),
            xi * (r4 - r6),
            -xi * (q4 - q6),
            t5 * (1.0 - 2.0 * eta) - xi * (t4 + t5),
            -1.0 + r5 * (1.0 - 2.0 * eta) + xi * (r4 - r5),
            -q5 * (1.0 - 2.0 * eta) - xi * (q4 - q5),
        ];
        (hx_xi, hy_xi, hx_eta, hy_eta)
    }

    /// Curvature-displacement matrix (3×9) at an area-coordinate point
    fn curvature_displacement(&self, xi: f64, eta: f64) -> DMatrix<f64> {
        let (hx_xi, hy_xi, hx_eta, hy_eta) = self.h_derivatives(xi, eta);
        let mut b = DMatrix::<f64>::zeros(3, 9);
        for i in 0..9 {
            b[(0, i)] = self.y31 * hx_xi[i] + self.y12 * hx_eta[i];
            b[(1, i)] = -self.x31 * hy_xi[i] - self.x12 * hy_eta[i];
            b[(2, i)] = -self.x31 * hx_xi[i] - self.x12 * hx_eta[i]
                + self.y31 * hy_xi[i]
                + self.y12 * hy_eta[i];
        }
        b / self.two_a
    }
}

/// Discrete Kirchhoff plate-bending triangle
#[derive(Debug, Clone, Copy, Default)]
pub struct Dkt;

impl Dkt {
    /// Curvature-displacement matrix at an area-coordinate point,
    /// used for moment recovery
    pub fn curvature_displacement_at(
        coords: &[[f64; 2]],
        xi: f64,
        eta: f64,
    ) -> Result<DMatrix<f64>> {
        Ok(Geometry::new(coords)?.curvature_displacement(xi, eta))
    }

    /// Bending stiffness for an explicit rigidity matrix, used by the
    /// layered material model
    pub fn stiffness_with_rigidity(
        coords: &[[f64; 2]],
        rigidity: &Matrix3<f64>,
    ) -> Result<DMatrix<f64>> {
        let geom = Geometry::new(coords)?;
        let area_factor = geom.two_a.abs() / 6.0;
        let mut k = DMatrix::<f64>::zeros(9, 9);
        for point in MIDSIDE {
            let b = geom.curvature_displacement(point[0], point[1]);
            k += b.transpose() * rigidity * b * area_factor;
        }
        Ok(k)
    }
}

impl PlanarFormulation for Dkt {
    fn stiffness(
        &self,
        coords: &[[f64; 2]],
        material: &Material,
        thickness: f64,
    ) -> Result<DMatrix<f64>> {
        let rigidity = bending_rigidity_matrix(material, thickness);
        Self::stiffness_with_rigidity(coords, &rigidity)
    }

    fn num_nodes(&self) -> usize {
        3
    }

    fn dofs_per_node(&self) -> usize {
        3
    }
}
