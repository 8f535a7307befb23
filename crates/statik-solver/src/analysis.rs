//! Analysis modes, configuration and cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Analysis mode; fixes the DOF layout and which element formulations
/// participate in the solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    /// In-plane frame analysis of beam members (u, v, θ per node)
    #[default]
    Frame,
    /// Membrane analysis of planar elements, plane-stress constitutive law
    PlaneStress,
    /// Membrane analysis of planar elements, plane-strain constitutive law
    PlaneStrain,
    /// Out-of-plane plate bending of planar elements (w, θx, θy per node)
    PlateBending,
    /// Beams and plate-bending planars in one shared 3-DOF system
    MixedBeamPlate,
}

impl AnalysisMode {
    /// Degrees of freedom carried by every node in this mode
    pub fn dofs_per_node(&self) -> usize {
        match self {
            AnalysisMode::Frame | AnalysisMode::PlateBending | AnalysisMode::MixedBeamPlate => 3,
            AnalysisMode::PlaneStress | AnalysisMode::PlaneStrain => 2,
        }
    }

    /// True if beam members contribute stiffness in this mode
    pub fn includes_beams(&self) -> bool {
        matches!(self, AnalysisMode::Frame | AnalysisMode::MixedBeamPlate)
    }

    /// True if planar elements contribute stiffness in this mode
    pub fn includes_planars(&self) -> bool {
        !matches!(self, AnalysisMode::Frame)
    }
}

/// Cooperative cancellation flag, checked between load steps and
/// iterations of the nonlinear loops. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the solve holding this token
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Configuration for one solve
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Analysis mode
    pub mode: AnalysisMode,
    /// Enable geometric (P-Delta) nonlinearity for frame analysis
    pub second_order: bool,
    /// Iteration budget for the nonlinear loops
    pub max_iterations: usize,
    /// Relative residual tolerance for Newton-Raphson convergence
    pub tolerance: f64,
    /// Number of load increments for P-Delta analysis
    pub load_steps: usize,
    /// Cancellation flag shared with the caller
    pub cancel: CancelToken,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::Frame,
            second_order: false,
            max_iterations: 20,
            tolerance: 1e-6,
            load_steps: 1,
            cancel: CancelToken::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_mode(mode: AnalysisMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dofs_per_node_by_mode() {
        assert_eq!(AnalysisMode::Frame.dofs_per_node(), 3);
        assert_eq!(AnalysisMode::PlaneStress.dofs_per_node(), 2);
        assert_eq!(AnalysisMode::PlaneStrain.dofs_per_node(), 2);
        assert_eq!(AnalysisMode::PlateBending.dofs_per_node(), 3);
        assert_eq!(AnalysisMode::MixedBeamPlate.dofs_per_node(), 3);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.tolerance, 1e-6);
        assert_eq!(config.load_steps, 1);
        assert!(!config.second_order);
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
