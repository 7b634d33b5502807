//! Synthetic harmonic restoring-force calculator
//!
//! Pulls every atom toward a common anchor point with force `-k * (x - anchor)`.
//! Useful for validating the optimizer against a potential with a known
//! minimum, independent of any real model.

use nalgebra::Vector3;

use crate::calculator::{Calculator, CalculatorError, ForceEnergyResult};
use crate::configuration::AtomicConfiguration;

/// Isotropic harmonic well centered on an anchor point
#[derive(Debug, Clone)]
pub struct HarmonicWell {
    /// Spring constant (in eV/Angstrom^2)
    pub spring_constant: f64,

    /// Anchor point every atom is pulled toward
    pub anchor: Vector3<f64>,
}

impl HarmonicWell {
    /// Create a harmonic well anchored at the origin
    pub fn new(spring_constant: f64) -> Self {
        Self {
            spring_constant,
            anchor: Vector3::zeros(),
        }
    }

    /// Create a harmonic well anchored at an arbitrary point
    pub fn with_anchor(spring_constant: f64, anchor: Vector3<f64>) -> Self {
        Self {
            spring_constant,
            anchor,
        }
    }
}

impl Calculator for HarmonicWell {
    fn name(&self) -> &'static str {
        "harmonic"
    }

    fn evaluate(
        &self,
        configuration: &AtomicConfiguration,
    ) -> Result<ForceEnergyResult, CalculatorError> {
        let k = self.spring_constant;
        let mut energy = 0.0;
        let mut forces = Vec::with_capacity(configuration.len());

        for atom in &configuration.atoms {
            let delta = atom.position - self.anchor;
            energy += 0.5 * k * delta.norm_squared();
            forces.push(-k * delta);
        }

        Ok(ForceEnergyResult { energy, forces })
    }
}
