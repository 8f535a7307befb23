//! Plane frame member: elastic and geometric stiffness, end releases and
//! equivalent nodal loads from distributed member loads.
//!
//! Local DOF order is (u1, v1, θ1, u2, v2, θ2) with the local x axis
//! running from the start node to the end node.

use nalgebra::{DMatrix, DVector, Matrix6, Vector6};
use statik_model::{BeamElement, Connection, DistributedLoad, LoadAxes, Material, ModelError, Node};

use crate::error::{Result, SolverError};

/// 4-point Gauss rule on [-1, 1], exact through degree 7
const GAUSS4: [(f64, f64); 4] = [
    (-0.861136311594053, 0.347854845137454),
    (-0.339981043584856, 0.652145154862546),
    (0.339981043584856, 0.652145154862546),
    (0.861136311594053, 0.347854845137454),
];

/// Geometry and stiffness data of one beam member, captured per solve
#[derive(Debug, Clone)]
pub struct FrameMember {
    pub length: f64,
    /// Direction cosine of the local x axis
    pub cos: f64,
    /// Direction sine of the local x axis
    pub sin: f64,
    pub elastic_modulus: f64,
    pub area: f64,
    pub inertia: f64,
    /// Rotation released at the start / end node (hinged connection)
    pub rotation_released: [bool; 2],
    /// Axial stiffness excluded (violated tension/pressure-only connection)
    pub axial_released: bool,
}

impl FrameMember {
    pub fn new(
        beam: &BeamElement,
        start: &Node,
        end: &Node,
        material: &Material,
    ) -> Result<Self> {
        let length = start.distance_to(end);
        if length < 1e-12 {
            return Err(SolverError::Model(ModelError::ZeroLength {
                element: beam.id,
            }));
        }
        Ok(Self {
            length,
            cos: (end.x - start.x) / length,
            sin: (end.y - start.y) / length,
            elastic_modulus: material.elastic_modulus,
            area: beam.section.area,
            inertia: beam.section.i_z,
            rotation_released: [
                beam.start_connection == Connection::Hinged,
                beam.end_connection == Connection::Hinged,
            ],
            axial_released: false,
        })
    }

    /// Mark the member's axial stiffness as excluded for this iteration
    pub fn with_axial_released(mut self, released: bool) -> Self {
        self.axial_released = released;
        self
    }

    /// Local elastic stiffness before any condensation
    pub fn local_elastic_stiffness(&self) -> Matrix6<f64> {
        let l = self.length;
        let ea_l = if self.axial_released {
            0.0
        } else {
            self.elastic_modulus * self.area / l
        };
        let ei = self.elastic_modulus * self.inertia;
        let k12 = 12.0 * ei / l.powi(3);
        let k6 = 6.0 * ei / l.powi(2);
        let k4 = 4.0 * ei / l;
        let k2 = 2.0 * ei / l;

        #[rustfmt::skip]
        let k = Matrix6::from_row_slice(&[
             ea_l,  0.0,  0.0, -ea_l,  0.0,  0.0,
              0.0,  k12,   k6,   0.0, -k12,   k6,
              0.0,   k6,   k4,   0.0,  -k6,   k2,
            -ea_l,  0.0,  0.0,  ea_l,  0.0,  0.0,
              0.0, -k12,  -k6,   0.0,  k12,  -k6,
              0.0,   k6,   k2,   0.0,  -k6,   k4,
        ]);
        k
    }

    /// Consistent geometric stiffness for an axial force `axial`
    /// (tension positive), scaled by N/L
    pub fn local_geometric_stiffness(&self, axial: f64) -> Matrix6<f64> {
        let l = self.length;
        let a = 6.0 / 5.0;
        let b = l / 10.0;
        let c = 2.0 * l * l / 15.0;
        let d = -l / 10.0;
        let e = -l * l / 30.0;
        let s = axial / l;

        #[rustfmt::skip]
        let g = Matrix6::from_row_slice(&[
            0.0,  0.0, 0.0, 0.0,  0.0, 0.0,
            0.0,    a,   b, 0.0,   -a,   b,
            0.0,    b,   c, 0.0,    d,   e,
            0.0,  0.0, 0.0, 0.0,  0.0, 0.0,
            0.0,   -a,   d, 0.0,    a,   d,
            0.0,    b,   e, 0.0,    d,   c,
        ]);
        g * s
    }

    /// Transformation from global to local displacements, `d_l = T · d_g`
    pub fn transformation(&self) -> Matrix6<f64> {
        let (c, s) = (self.cos, self.sin);
        let mut t = Matrix6::zeros();
        for base in [0, 3] {
            t[(base, base)] = c;
            t[(base, base + 1)] = s;
            t[(base + 1, base)] = -s;
            t[(base + 1, base + 1)] = c;
            t[(base + 2, base + 2)] = 1.0;
        }
        t
    }

    /// Indices of released local DOFs (hinged end rotations)
    fn released_dofs(&self) -> Vec<usize> {
        let mut dofs = Vec::new();
        if self.rotation_released[0] {
            dofs.push(2);
        }
        if self.rotation_released[1] {
            dofs.push(5);
        }
        dofs
    }

    /// Consistent nodal load vector in local axes for a distributed load,
    /// before condensation. Trapezoidal intensity over an optional
    /// sub-span; global-axes loads are split into local axial and
    /// transverse components through the member orientation.
    pub fn equivalent_local_load(&self, load: &DistributedLoad) -> Vector6<f64> {
        let l = self.length;
        let (offset, span) = load.span_on(l);
        let mut f = Vector6::zeros();
        if span <= 0.0 {
            return f;
        }

        // Local intensity components at the loaded span's ends
        let (par0, perp0, par1, perp1) = match load.axes {
            LoadAxes::Local => (0.0, load.start_intensity, 0.0, load.end_intensity),
            LoadAxes::Global => (
                load.start_intensity * self.sin,
                load.start_intensity * self.cos,
                load.end_intensity * self.sin,
                load.end_intensity * self.cos,
            ),
        };

        let jac = span / 2.0;
        for &(gp, w) in &GAUSS4 {
            let x = offset + span * 0.5 * (1.0 + gp);
            let t = (x - offset) / span;
            let par = par0 + (par1 - par0) * t;
            let perp = perp0 + (perp1 - perp0) * t;

            let xi = x / l;
            let xi2 = xi * xi;
            let xi3 = xi2 * xi;
            // Linear axial and cubic Hermite transverse shape functions
            let na = [1.0 - xi, xi];
            let h = [
                1.0 - 3.0 * xi2 + 2.0 * xi3,
                l * (xi - 2.0 * xi2 + xi3),
                3.0 * xi2 - 2.0 * xi3,
                l * (xi3 - xi2),
            ];

            let wj = w * jac;
            f[0] += wj * na[0] * par;
            f[3] += wj * na[1] * par;
            f[1] += wj * h[0] * perp;
            f[2] += wj * h[1] * perp;
            f[4] += wj * h[2] * perp;
            f[5] += wj * h[3] * perp;
        }
        f
    }

    /// Local stiffness and equivalent load with end releases statically
    /// condensed out. `axial` adds the geometric stiffness for that force.
    pub fn condensed_local(
        &self,
        axial: Option<f64>,
        load: Option<&DistributedLoad>,
    ) -> Result<(Matrix6<f64>, Vector6<f64>)> {
        let mut k = self.local_elastic_stiffness();
        if let Some(n) = axial {
            k += self.local_geometric_stiffness(n);
        }
        let mut f = match load {
            Some(q) => self.equivalent_local_load(q),
            None => Vector6::zeros(),
        };
        condense(&mut k, &mut f, &self.released_dofs())?;
        Ok((k, f))
    }

    /// Global stiffness and equivalent nodal load of this member
    pub fn global_stiffness_and_load(
        &self,
        axial: Option<f64>,
        load: Option<&DistributedLoad>,
    ) -> Result<(Matrix6<f64>, Vector6<f64>)> {
        let (k, f) = self.condensed_local(axial, load)?;
        let t = self.transformation();
        Ok((t.transpose() * k * t, t.transpose() * f))
    }

    /// Member end forces in local axes for a global end-displacement
    /// vector, `f = K_local · d_local − f_eq`. Entries are
    /// (Fx1, Fy1, M1, Fx2, Fy2, M2) acting on the member.
    pub fn local_end_forces(
        &self,
        d_global: &Vector6<f64>,
        load: Option<&DistributedLoad>,
    ) -> Result<Vector6<f64>> {
        let (k, f_eq) = self.condensed_local(None, load)?;
        let d_local = self.transformation() * d_global;
        Ok(k * d_local - f_eq)
    }

    /// Axial force recovered from member end forces, tension positive.
    /// The member load enters through the same equivalent-load term as
    /// [`local_end_forces`](Self::local_end_forces).
    pub fn axial_force(
        &self,
        d_global: &Vector6<f64>,
        load: Option<&DistributedLoad>,
    ) -> Result<f64> {
        let forces = self.local_end_forces(d_global, load)?;
        Ok(forces[3])
    }
}

/// Static condensation of `released` DOFs:
/// `K_kk − K_kr · K_rr⁻¹ · K_rk` with the matching reduction of `f`.
/// Released rows/columns are zeroed in place.
fn condense(k: &mut Matrix6<f64>, f: &mut Vector6<f64>, released: &[usize]) -> Result<()> {
    if released.is_empty() {
        return Ok(());
    }
    let kept: Vec<usize> = (0..6).filter(|i| !released.contains(i)).collect();
    let nr = released.len();
    let nk = kept.len();

    let mut krr = DMatrix::<f64>::zeros(nr, nr);
    let mut kkr = DMatrix::<f64>::zeros(nk, nr);
    let mut fr = DVector::<f64>::zeros(nr);
    for (i, &ri) in released.iter().enumerate() {
        for (j, &rj) in released.iter().enumerate() {
            krr[(i, j)] = k[(ri, rj)];
        }
        for (a, &ka) in kept.iter().enumerate() {
            kkr[(a, i)] = k[(ka, ri)];
        }
        fr[i] = f[ri];
    }

    let krr_inv = krr
        .try_inverse()
        .ok_or(SolverError::Singular { dof: released[0] })?;

    let correction = &kkr * &krr_inv * kkr.transpose();
    let f_correction = &kkr * &krr_inv * fr;

    let mut out_k = Matrix6::zeros();
    let mut out_f = Vector6::zeros();
    for (a, &ka) in kept.iter().enumerate() {
        for (b, &kb) in kept.iter().enumerate() {
            out_k[(ka, kb)] = k[(ka, kb)] - correction[(a, b)];
        }
        out_f[ka] = f[ka] - f_correction[a];
    }
    *k = out_k;
    *f = out_f;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use statik_model::Section;

    fn member(length: f64) -> FrameMember {
        FrameMember {
            length,
            cos: 1.0,
            sin: 0.0,
            elastic_modulus: 200e9,
            area: 0.01,
            inertia: 8.36e-5,
            rotation_released: [false, false],
            axial_released: false,
        }
    }

    #[test]
    fn local_stiffness_is_symmetric() {
        let k = member(4.0).local_elastic_stiffness();
        for i in 0..6 {
            for j in 0..6 {
                assert_relative_eq!(k[(i, j)], k[(j, i)], max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn local_stiffness_known_entries() {
        let m = member(4.0);
        let k = m.local_elastic_stiffness();
        let ei = m.elastic_modulus * m.inertia;
        assert_relative_eq!(k[(0, 0)], m.elastic_modulus * m.area / 4.0, max_relative = 1e-12);
        assert_relative_eq!(k[(1, 1)], 12.0 * ei / 64.0, max_relative = 1e-12);
        assert_relative_eq!(k[(2, 2)], 4.0 * ei / 4.0, max_relative = 1e-12);
        assert_relative_eq!(k[(2, 5)], 2.0 * ei / 4.0, max_relative = 1e-12);
    }

    #[test]
    fn axial_release_zeroes_axial_block_only() {
        let m = member(4.0).with_axial_released(true);
        let k = m.local_elastic_stiffness();
        assert_eq!(k[(0, 0)], 0.0);
        assert_eq!(k[(0, 3)], 0.0);
        assert!(k[(1, 1)] > 0.0);
    }

    #[test]
    fn cantilever_tip_deflection_from_local_stiffness() {
        // Fix DOFs 0..3, load DOF 4 with P; deflection = P L^3 / (3 E I)
        let m = member(4.0);
        let k = m.local_elastic_stiffness();
        let free = [3usize, 4, 5];
        let mut kf = DMatrix::<f64>::zeros(3, 3);
        for (a, &i) in free.iter().enumerate() {
            for (b, &j) in free.iter().enumerate() {
                kf[(a, b)] = k[(i, j)];
            }
        }
        let p = 10e3;
        let f = DVector::from_vec(vec![0.0, -p, 0.0]);
        let d = kf.lu().solve(&f).unwrap();
        let expected = -p * 4.0_f64.powi(3) / (3.0 * m.elastic_modulus * m.inertia);
        assert_relative_eq!(d[1], expected, max_relative = 1e-9);
    }

    #[test]
    fn end_hinge_condenses_to_propped_stiffness() {
        // With the far rotation released the transverse stiffness drops
        // from 12EI/L^3 to 3EI/L^3
        let mut m = member(2.0);
        m.rotation_released[1] = true;
        let (k, _) = m.condensed_local(None, None).unwrap();
        let ei = m.elastic_modulus * m.inertia;
        assert_relative_eq!(k[(1, 1)], 3.0 * ei / 8.0, max_relative = 1e-12);
        for i in 0..6 {
            assert_eq!(k[(5, i)], 0.0);
            assert_eq!(k[(i, 5)], 0.0);
        }
    }

    #[test]
    fn uniform_load_equivalent_vector() {
        let m = member(6.0);
        let q = -5.0e3;
        let f = m.equivalent_local_load(&DistributedLoad::uniform(q));
        let l = 6.0;
        assert_relative_eq!(f[1], q * l / 2.0, max_relative = 1e-9);
        assert_relative_eq!(f[4], q * l / 2.0, max_relative = 1e-9);
        assert_relative_eq!(f[2], q * l * l / 12.0, max_relative = 1e-9);
        assert_relative_eq!(f[5], -q * l * l / 12.0, max_relative = 1e-9);
        assert_eq!(f[0], 0.0);
    }

    #[test]
    fn partial_span_load_preserves_total() {
        let m = member(8.0);
        let load = DistributedLoad {
            start_intensity: -3.0,
            end_intensity: -7.0,
            start_offset: 2.0,
            length: Some(4.0),
            axes: LoadAxes::Local,
        };
        let f = m.equivalent_local_load(&load);
        let total = -0.5 * (3.0 + 7.0) * 4.0;
        assert_relative_eq!(f[1] + f[4], total, max_relative = 1e-9);
    }

    #[test]
    fn global_load_splits_by_orientation() {
        // Vertical member, global downward load becomes purely transverse
        let mut m = member(3.0);
        m.cos = 0.0;
        m.sin = 1.0;
        let load = DistributedLoad {
            axes: LoadAxes::Global,
            ..DistributedLoad::uniform(-4.0)
        };
        let f = m.equivalent_local_load(&load);
        // Global Y maps fully onto the local x axis for a vertical member
        assert_relative_eq!(f[0] + f[3], -4.0 * 3.0, max_relative = 1e-9);
        assert!(f[1].abs() < 1e-9);
    }

    #[test]
    fn geometric_stiffness_coefficients() {
        let m = member(5.0);
        let n = 1000.0;
        let g = m.local_geometric_stiffness(n);
        let s = n / 5.0;
        assert_relative_eq!(g[(1, 1)], s * 6.0 / 5.0, max_relative = 1e-12);
        assert_relative_eq!(g[(1, 2)], s * 0.5, max_relative = 1e-12);
        assert_relative_eq!(g[(2, 2)], s * 2.0 * 25.0 / 15.0, max_relative = 1e-12);
        assert_relative_eq!(g[(2, 4)], s * -0.5, max_relative = 1e-12);
        assert_relative_eq!(g[(2, 5)], s * -25.0 / 30.0, max_relative = 1e-12);
        // Symmetry
        for i in 0..6 {
            for j in 0..6 {
                assert_relative_eq!(g[(i, j)], g[(j, i)], max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn transformation_recovers_axial_direction() {
        let node_a = Node::new(1, 0.0, 0.0);
        let node_b = Node::new(2, 0.0, 2.0);
        let beam = BeamElement::new(1, 1, 2, 1, Section::rectangle(0.1, 0.1));
        let mat = Material::new(1, "steel", 210e9, 0.3);
        let m = FrameMember::new(&beam, &node_a, &node_b, &mat).unwrap();
        // Stretch the vertical member along global y
        let d = Vector6::new(0.0, 0.0, 0.0, 0.0, 1e-3, 0.0);
        let axial = m.axial_force(&d, None).unwrap();
        let expected = m.elastic_modulus * m.area / m.length * 1e-3;
        assert_relative_eq!(axial, expected, max_relative = 1e-9);
    }

    #[test]
    fn axial_force_carries_the_equivalent_load_term() {
        // Vertical member under a global uniform load: the load maps onto
        // the local axial direction, so even at zero displacement the
        // recovered axial force must match the reported end force
        let mut m = member(3.0);
        m.cos = 0.0;
        m.sin = 1.0;
        let load = DistributedLoad {
            axes: LoadAxes::Global,
            ..DistributedLoad::uniform(-4.0)
        };
        let d = Vector6::zeros();
        let end_forces = m.local_end_forces(&d, Some(&load)).unwrap();
        let axial = m.axial_force(&d, Some(&load)).unwrap();
        assert_relative_eq!(axial, end_forces[3], max_relative = 1e-12);
        assert!(axial.abs() > 1.0);
    }

    #[test]
    fn zero_length_member_is_rejected() {
        let node_a = Node::new(1, 1.0, 1.0);
        let node_b = Node::new(2, 1.0, 1.0);
        let beam = BeamElement::new(1, 1, 2, 1, Section::rectangle(0.1, 0.1));
        let mat = Material::new(1, "steel", 210e9, 0.3);
        assert!(FrameMember::new(&beam, &node_a, &node_b, &mat).is_err());
    }
}
