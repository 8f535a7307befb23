//! Layered nonlinear section model for reinforced-concrete plates.
//!
//! The section is discretized into concrete layers over the thickness plus
//! smeared reinforcement layers at fixed offsets. Concrete follows a
//! parabola-rectangle law in compression and an exponential tension
//! stiffening branch past cracking; cracks are smeared per layer with a
//! fixed or rotating orientation. The model produces secant section
//! stiffness matrices and stress resultants and is evaluated standalone,
//! it does not participate in the linear or P-Delta solution paths.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Default number of concrete layers over the thickness
pub const DEFAULT_LAYERS: usize = 10;

/// Shear retention factor of a cracked layer
const SHEAR_RETENTION: f64 = 0.2;

/// Secant modulus floor as a fraction of the elastic modulus
const MODULUS_FLOOR: f64 = 1e-6;

/// Crack orientation handling of a cracked layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CrackModel {
    /// Crack direction is frozen at first cracking
    #[default]
    Fixed,
    /// Crack direction follows the current principal strain direction
    Rotating,
}

/// Concrete material parameters of the layered model
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConcreteProperties {
    /// Mean compressive strength (positive)
    pub fcm: f64,
    /// Mean tensile strength
    pub fctm: f64,
    /// Elastic modulus
    pub ecm: f64,
    pub poissons_ratio: f64,
    /// Compressive strain at peak stress (positive)
    pub epsilon_c1: f64,
    /// Ultimate compressive strain (positive)
    pub epsilon_cu: f64,
    /// Carry the exponential tension branch past cracking
    pub tension_stiffening: bool,
    /// Decay rate of the tension stiffening branch per unit strain
    pub softening: f64,
}

impl ConcreteProperties {
    pub fn new(fcm: f64, fctm: f64, ecm: f64) -> Self {
        Self {
            fcm,
            fctm,
            ecm,
            poissons_ratio: 0.2,
            epsilon_c1: 2.0e-3,
            epsilon_cu: 3.5e-3,
            tension_stiffening: true,
            softening: 500.0,
        }
    }

    /// Cracking strain `fctm / Ecm`
    pub fn cracking_strain(&self) -> f64 {
        self.fctm / self.ecm
    }

    /// Uniaxial stress and secant modulus at a strain, tension positive.
    ///
    /// The compression secant is clamped to the elastic modulus so the
    /// response reduces exactly to the linear law at small strains.
    fn uniaxial(&self, strain: f64, cracked: bool) -> (f64, f64) {
        if strain >= 0.0 {
            if !cracked {
                return (self.ecm * strain, self.ecm);
            }
            let past_cracking = (strain - self.cracking_strain()).max(0.0);
            let cap = if self.tension_stiffening {
                self.fctm * (-self.softening * past_cracking).exp()
            } else if past_cracking > 0.0 {
                0.0
            } else {
                self.fctm
            };
            // The floor applies to the stiffness entry only, the stress
            // follows the tension law exactly
            let stress = (self.ecm * strain).min(cap);
            let secant = if strain > 1e-12 {
                (stress / strain).max(MODULUS_FLOOR * self.ecm)
            } else {
                self.ecm
            };
            (stress, secant)
        } else {
            let e = -strain;
            let magnitude = if e <= self.epsilon_c1 {
                let eta = e / self.epsilon_c1;
                self.fcm * (2.0 * eta - eta * eta)
            } else if e <= self.epsilon_cu {
                self.fcm
            } else {
                0.0
            };
            let secant = if e > 1e-12 {
                (magnitude / e).min(self.ecm).max(MODULUS_FLOOR * self.ecm)
            } else {
                self.ecm
            };
            (-secant * e, secant)
        }
    }
}

/// Smeared reinforcement layer, uniaxial along its own direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReinforcementLayer {
    /// Steel area per unit width
    pub area: f64,
    /// Offset from the section mid-plane
    pub z: f64,
    /// Bar direction relative to the section x axis [rad]
    pub angle: f64,
    pub yield_strength: f64,
    pub elastic_modulus: f64,
    /// Post-yield stiffness as a fraction of the elastic modulus
    pub hardening: f64,
}

impl ReinforcementLayer {
    /// Layer from bar geometry: diameter and spacing give the smeared area
    /// per unit width, `z` the offset from the section mid-plane
    pub fn from_bars(
        diameter: f64,
        spacing: f64,
        z: f64,
        angle: f64,
        yield_strength: f64,
        elastic_modulus: f64,
    ) -> Self {
        Self {
            area: std::f64::consts::PI * diameter * diameter / 4.0 / spacing,
            z,
            angle,
            yield_strength,
            elastic_modulus,
            hardening: 0.01,
        }
    }

    /// Bottom-face layer placed from the section thickness, the concrete
    /// cover and the bar geometry
    pub fn bottom_bars(
        thickness: f64,
        cover: f64,
        diameter: f64,
        spacing: f64,
        angle: f64,
        yield_strength: f64,
        elastic_modulus: f64,
    ) -> Self {
        let z = -(thickness / 2.0 - cover - diameter / 2.0);
        Self::from_bars(diameter, spacing, z, angle, yield_strength, elastic_modulus)
    }

    /// Top-face counterpart of [`bottom_bars`](Self::bottom_bars)
    pub fn top_bars(
        thickness: f64,
        cover: f64,
        diameter: f64,
        spacing: f64,
        angle: f64,
        yield_strength: f64,
        elastic_modulus: f64,
    ) -> Self {
        let z = thickness / 2.0 - cover - diameter / 2.0;
        Self::from_bars(diameter, spacing, z, angle, yield_strength, elastic_modulus)
    }

    /// Bilinear stress and secant modulus at a strain along the bars
    fn response(&self, strain: f64) -> (f64, f64) {
        let yield_strain = self.yield_strength / self.elastic_modulus;
        if strain.abs() <= yield_strain {
            return (self.elastic_modulus * strain, self.elastic_modulus);
        }
        let magnitude = self.yield_strength
            + self.hardening * self.elastic_modulus * (strain.abs() - yield_strain);
        let stress = magnitude * strain.signum();
        (stress, stress / strain)
    }

    /// Uniaxial projection vector, `ε_bar = m · ε`
    fn projection(&self) -> Vector3<f64> {
        let (s, c) = self.angle.sin_cos();
        Vector3::new(c * c, s * s, c * s)
    }
}

/// Crack memory of one concrete layer
#[derive(Debug, Clone, Copy, Default)]
struct LayerState {
    cracked: bool,
    angle: f64,
}

/// Stress resultants of the section, forces and moments per unit width
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SectionForces {
    pub nx: f64,
    pub ny: f64,
    pub nxy: f64,
    pub mx: f64,
    pub my: f64,
    pub mxy: f64,
}

/// Secant section stiffness and resultants for one strain state
#[derive(Debug, Clone)]
pub struct SectionResponse {
    pub forces: SectionForces,
    /// Membrane stiffness, `Σ D · Δz`
    pub membrane_stiffness: Matrix3<f64>,
    /// Membrane-bending coupling, `Σ D · z · Δz`
    pub coupling_stiffness: Matrix3<f64>,
    /// Bending stiffness, `Σ D · z² · Δz`
    pub bending_stiffness: Matrix3<f64>,
    /// True once any concrete layer has cracked
    pub cracked: bool,
}

/// Layered reinforced-concrete plate section
#[derive(Debug, Clone)]
pub struct LayeredPlate {
    pub concrete: ConcreteProperties,
    pub thickness: f64,
    pub reinforcement: Vec<ReinforcementLayer>,
    pub crack_model: CrackModel,
    layers: Vec<LayerState>,
}

impl LayeredPlate {
    pub fn new(concrete: ConcreteProperties, thickness: f64) -> Self {
        Self::with_layers(concrete, thickness, DEFAULT_LAYERS)
    }

    pub fn with_layers(concrete: ConcreteProperties, thickness: f64, count: usize) -> Self {
        Self {
            concrete,
            thickness,
            reinforcement: Vec::new(),
            crack_model: CrackModel::default(),
            layers: vec![LayerState::default(); count.max(1)],
        }
    }

    pub fn add_reinforcement(&mut self, layer: ReinforcementLayer) {
        self.reinforcement.push(layer);
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Mid-plane offset of concrete layer `i`
    fn layer_z(&self, i: usize) -> f64 {
        let dz = self.thickness / self.layers.len() as f64;
        -self.thickness / 2.0 + (i as f64 + 0.5) * dz
    }

    /// Uncracked bending stiffness with the same layer discretization,
    /// the reference the cracked response is compared against
    pub fn elastic_bending_matrix(&self) -> Matrix3<f64> {
        let dz = self.thickness / self.layers.len() as f64;
        let d_elastic = isotropic(self.concrete.ecm, self.concrete.poissons_ratio);
        let mut bending = Matrix3::zeros();
        for i in 0..self.layers.len() {
            let z = self.layer_z(i);
            bending += d_elastic * (z * z * dz);
        }
        for bar in &self.reinforcement {
            let m = bar.projection();
            bending += m * m.transpose() * (bar.elastic_modulus * bar.area * bar.z * bar.z);
        }
        bending
    }

    /// Evaluate the section at a mid-plane strain and curvature state.
    ///
    /// Updates the per-layer crack memory: a layer cracks when its major
    /// principal strain exceeds `fctm / Ecm` and stays cracked afterwards;
    /// the crack direction is frozen or follows the principal direction
    /// per the configured [`CrackModel`].
    pub fn section_response(
        &mut self,
        membrane_strain: &Vector3<f64>,
        curvature: &Vector3<f64>,
    ) -> SectionResponse {
        let dz = self.thickness / self.layers.len() as f64;
        let concrete = self.concrete;
        let crack_model = self.crack_model;
        let cracking_strain = concrete.cracking_strain();
        let shear_modulus = concrete.ecm / (2.0 * (1.0 + concrete.poissons_ratio));

        let mut membrane = Matrix3::zeros();
        let mut coupling = Matrix3::zeros();
        let mut bending = Matrix3::zeros();
        let mut n = Vector3::zeros();
        let mut m = Vector3::zeros();
        let mut any_cracked = false;

        let half = self.thickness / 2.0;
        for i in 0..self.layers.len() {
            let z = -half + (i as f64 + 0.5) * dz;
            let strain = membrane_strain + curvature * z;
            let principal_angle = 0.5 * strain[2].atan2(strain[0] - strain[1]);
            let mean = (strain[0] + strain[1]) / 2.0;
            let radius =
                (((strain[0] - strain[1]) / 2.0).powi(2) + (strain[2] / 2.0).powi(2)).sqrt();
            let major = mean + radius;

            let state = &mut self.layers[i];
            if !state.cracked && major > cracking_strain {
                state.cracked = true;
                state.angle = principal_angle;
            } else if state.cracked && crack_model == CrackModel::Rotating {
                state.angle = principal_angle;
            }

            let (d, stress) = if state.cracked {
                let t = strain_rotation(state.angle);
                let local = t * strain;
                let (s1, e1) = concrete.uniaxial(local[0], true);
                let (s2, e2) = concrete.uniaxial(local[1], true);
                let g = SHEAR_RETENTION * shear_modulus;
                let d_local = Matrix3::from_diagonal(&Vector3::new(e1, e2, g));
                let local_stress = Vector3::new(s1, s2, g * local[2]);
                (t.transpose() * d_local * t, t.transpose() * local_stress)
            } else {
                // Uncracked layers stay isotropic; the common secant keeps
                // the small-strain response identical to the elastic law
                let (_, ea) = concrete.uniaxial(mean + radius, false);
                let (_, eb) = concrete.uniaxial(mean - radius, false);
                let d = isotropic(ea.min(eb), concrete.poissons_ratio);
                (d, d * strain)
            };

            membrane += d * dz;
            coupling += d * (z * dz);
            bending += d * (z * z * dz);
            n += stress * dz;
            m += stress * (z * dz);
            any_cracked |= state.cracked;
        }

        for bar in &self.reinforcement {
            let proj = bar.projection();
            let strain = membrane_strain + curvature * bar.z;
            let bar_strain = proj.dot(&strain);
            let (stress, secant) = bar.response(bar_strain);

            let d = proj * proj.transpose() * (secant * bar.area);
            membrane += d;
            coupling += d * bar.z;
            bending += d * (bar.z * bar.z);

            let s = proj * (stress * bar.area);
            n += s;
            m += s * bar.z;
        }

        SectionResponse {
            forces: SectionForces {
                nx: n[0],
                ny: n[1],
                nxy: n[2],
                mx: m[0],
                my: m[1],
                mxy: m[2],
            },
            membrane_stiffness: membrane,
            coupling_stiffness: coupling,
            bending_stiffness: bending,
            cracked: any_cracked,
        }
    }
}

/// Isotropic plane-stress constitutive matrix
fn isotropic(e: f64, nu: f64) -> Matrix3<f64> {
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

/// Engineering strain rotation into axes at angle θ, `ε' = T · ε`
fn strain_rotation(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c * c,
        s * s,
        c * s,
        s * s,
        c * c,
        -c * s,
        -2.0 * c * s,
        2.0 * c * s,
        c * c - s * s,
    )
}
