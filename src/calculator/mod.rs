//! Calculator implementations for energies and forces

pub mod harmonic;
pub mod lennard_jones;

use crate::configuration::AtomicConfiguration;
use nalgebra::Vector3;
use thiserror::Error;

/// Errors that can occur inside a calculator
#[derive(Error, Debug)]
pub enum CalculatorError {
    #[error("Non-finite energy: {0}")]
    NonFiniteEnergy(f64),

    #[error("Non-finite force on atom {0}")]
    NonFiniteForce(usize),

    #[error("Force count mismatch: expected {expected}, got {actual}")]
    ForceCountMismatch { expected: usize, actual: usize },

    #[error("Cell is singular but a periodic axis is enabled")]
    SingularCell,

    #[error("Invalid model parameters: {0}")]
    InvalidParameters(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parameter file error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Energy and per-atom forces for one configuration.
///
/// Produced fresh on every [`Calculator::evaluate`] call and never mutated.
#[derive(Debug, Clone)]
pub struct ForceEnergyResult {
    /// Potential energy (in eV)
    pub energy: f64,

    /// Force vector per atom (in eV/Angstrom), in atom order
    pub forces: Vec<Vector3<f64>>,
}

impl ForceEnergyResult {
    /// Reject non-finite or mis-shaped results.
    ///
    /// Numerical divergence inside a model must stop the relaxation, so
    /// every result is screened before the optimizer consumes it.
    pub fn ensure_valid(&self, n_atoms: usize) -> Result<(), CalculatorError> {
        if self.forces.len() != n_atoms {
            return Err(CalculatorError::ForceCountMismatch {
                expected: n_atoms,
                actual: self.forces.len(),
            });
        }
        if !self.energy.is_finite() {
            return Err(CalculatorError::NonFiniteEnergy(self.energy));
        }
        for (idx, force) in self.forces.iter().enumerate() {
            if !(force.x.is_finite() && force.y.is_finite() && force.z.is_finite()) {
                return Err(CalculatorError::NonFiniteForce(idx));
            }
        }
        Ok(())
    }
}

/// Trait representing a potential that maps a configuration to energy/forces.
/// The Send + Sync bounds allow internally parallel implementations.
///
/// Implementations must be deterministic for a fixed configuration and fixed
/// model parameters, and should be treated as potentially expensive: the
/// optimizer budgets exactly one call per step.
pub trait Calculator: Send + Sync {
    /// Get the name of the calculator
    fn name(&self) -> &'static str;

    /// Compute energy and per-atom forces for a configuration
    fn evaluate(
        &self,
        configuration: &AtomicConfiguration,
    ) -> Result<ForceEnergyResult, CalculatorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_valid_accepts_finite_result() {
        let result = ForceEnergyResult {
            energy: -1.5,
            forces: vec![Vector3::zeros(), Vector3::new(0.1, 0.0, 0.0)],
        };
        assert!(result.ensure_valid(2).is_ok());
    }

    #[test]
    fn test_ensure_valid_rejects_nan_energy() {
        let result = ForceEnergyResult {
            energy: f64::NAN,
            forces: vec![Vector3::zeros()],
        };
        assert!(matches!(
            result.ensure_valid(1),
            Err(CalculatorError::NonFiniteEnergy(_))
        ));
    }

    #[test]
    fn test_ensure_valid_rejects_infinite_force() {
        let result = ForceEnergyResult {
            energy: 0.0,
            forces: vec![Vector3::zeros(), Vector3::new(f64::INFINITY, 0.0, 0.0)],
        };
        assert!(matches!(
            result.ensure_valid(2),
            Err(CalculatorError::NonFiniteForce(1))
        ));
    }

    #[test]
    fn test_ensure_valid_rejects_count_mismatch() {
        let result = ForceEnergyResult {
            energy: 0.0,
            forces: vec![Vector3::zeros()],
        };
        assert!(matches!(
            result.ensure_valid(3),
            Err(CalculatorError::ForceCountMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }
}
