//! Relaxation algorithms and shared optimization types

pub mod bfgs;

use crate::calculator::CalculatorError;
use crate::configuration::ConfigurationError;
use crate::trajectory::TrajectoryError;
use nalgebra::Vector3;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during a relaxation run
#[derive(Error, Debug)]
pub enum OptimizationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),

    #[error("Calculator failure: {0}")]
    Calculator(#[from] CalculatorError),

    #[error("Non-finite displacement proposed at step {step}")]
    NonFiniteDisplacement { step: usize },

    #[error("fmax threshold must be finite and non-negative, got {0}")]
    InvalidThreshold(f64),

    #[error("Trajectory error: {0}")]
    Trajectory(#[from] TrajectoryError),
}

/// Why a relaxation run stopped.
///
/// Reaching the step limit is a reportable outcome, not an error; failures
/// (non-finite results, bad configurations) surface as [`OptimizationError`]
/// instead, so the three stop reasons and the failure path are mutually
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// fmax dropped to or below the threshold
    Converged,

    /// The step budget ran out before convergence
    StepLimitReached,

    /// An external stop signal was observed between steps
    Interrupted,
}

/// Summary of a finished relaxation run
#[derive(Debug, Clone)]
pub struct RelaxationReport {
    /// Why the run stopped
    pub reason: StopReason,

    /// Number of completed displacement steps
    pub steps: usize,

    /// Energy at the last evaluated configuration, if any evaluation ran
    pub energy: Option<f64>,

    /// fmax at the last evaluated configuration, if any evaluation ran
    pub fmax: Option<f64>,
}

impl RelaxationReport {
    /// Whether the run ended at a force minimum
    pub fn is_converged(&self) -> bool {
        self.reason == StopReason::Converged
    }
}

/// Parameters for a relaxation run.
///
/// The convergence threshold and the step budget carry no defaults: both
/// control what "done" means physically and must be chosen by the caller.
/// A threshold of zero is legal and means "run until the step limit".
#[derive(Debug, Clone)]
pub struct RelaxParams {
    /// Convergence threshold on the maximum per-atom force (in eV/Angstrom)
    pub fmax_threshold: f64,

    /// Maximum number of displacement steps
    pub max_steps: usize,

    /// Longest per-atom move allowed in one step (in Angstroms)
    pub max_step: f64,

    /// Number of (s, y) pairs kept for the curvature approximation
    pub history_size: usize,
}

impl RelaxParams {
    /// Default per-atom step clamp (in Angstroms)
    pub const DEFAULT_MAX_STEP: f64 = 0.2;

    /// Default history depth for the curvature approximation
    pub const DEFAULT_HISTORY_SIZE: usize = 10;

    /// Create parameters from the two required inputs
    pub fn new(fmax_threshold: f64, max_steps: usize) -> Result<Self, OptimizationError> {
        if !fmax_threshold.is_finite() || fmax_threshold < 0.0 {
            return Err(OptimizationError::InvalidThreshold(fmax_threshold));
        }
        Ok(Self {
            fmax_threshold,
            max_steps,
            max_step: Self::DEFAULT_MAX_STEP,
            history_size: Self::DEFAULT_HISTORY_SIZE,
        })
    }

    /// Override the per-atom step clamp
    pub fn with_max_step(mut self, max_step: f64) -> Self {
        self.max_step = max_step;
        self
    }

    /// Override the history depth
    pub fn with_history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self
    }
}

/// Maximum Euclidean norm over per-atom force vectors.
///
/// Zero for an empty slice, so a fully constrained configuration reports
/// fmax = 0 and converges immediately.
pub fn max_force_norm(forces: &[Vector3<f64>]) -> f64 {
    forces.iter().map(|f| f.norm()).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_reject_negative_threshold() {
        assert!(matches!(
            RelaxParams::new(-0.1, 100),
            Err(OptimizationError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_params_reject_nan_threshold() {
        assert!(RelaxParams::new(f64::NAN, 100).is_err());
    }

    #[test]
    fn test_params_accept_zero_threshold() {
        let params = RelaxParams::new(0.0, 5).unwrap();
        assert_eq!(params.fmax_threshold, 0.0);
        assert_eq!(params.max_steps, 5);
        assert_eq!(params.max_step, RelaxParams::DEFAULT_MAX_STEP);
    }

    #[test]
    fn test_max_force_norm() {
        let forces = vec![
            Vector3::new(3.0, 4.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
        ];
        assert_eq!(max_force_norm(&forces), 5.0);
    }

    #[test]
    fn test_max_force_norm_empty() {
        assert_eq!(max_force_norm(&[]), 0.0);
    }
}
