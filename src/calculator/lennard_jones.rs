//! Lennard-Jones 12-6 pair potential
//!
//! A classical potential with a radial cutoff and minimum-image handling of
//! periodic axes. The pair energy is shifted so the potential goes to zero
//! continuously at the cutoff.

use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::calculator::{Calculator, CalculatorError, ForceEnergyResult};
use crate::configuration::AtomicConfiguration;

/// Parameters for the Lennard-Jones potential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LennardJonesParams {
    /// Well depth (in eV)
    pub epsilon: f64,

    /// Zero-crossing distance (in Angstroms)
    pub sigma: f64,

    /// Radial cutoff (in Angstroms)
    pub cutoff: f64,
}

impl Default for LennardJonesParams {
    fn default() -> Self {
        Self {
            epsilon: 1.0,
            sigma: 1.0,
            cutoff: 3.0,
        }
    }
}

impl LennardJonesParams {
    fn validate(&self) -> Result<(), CalculatorError> {
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(CalculatorError::InvalidParameters(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if !(self.sigma > 0.0 && self.sigma.is_finite()) {
            return Err(CalculatorError::InvalidParameters(format!(
                "sigma must be positive, got {}",
                self.sigma
            )));
        }
        if !(self.cutoff > 0.0 && self.cutoff.is_finite()) {
            return Err(CalculatorError::InvalidParameters(format!(
                "cutoff must be positive, got {}",
                self.cutoff
            )));
        }
        Ok(())
    }
}

/// Implementation of the Lennard-Jones potential
#[derive(Debug, Clone, Default)]
pub struct LennardJones {
    pub params: LennardJonesParams,
}

impl LennardJones {
    /// Create a calculator with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a calculator with custom parameters
    pub fn with_params(params: LennardJonesParams) -> Result<Self, CalculatorError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Load parameters from a JSON parameter file
    pub fn from_checkpoint<P: AsRef<Path>>(path: P) -> Result<Self, CalculatorError> {
        let content = fs::read_to_string(path)?;
        let params: LennardJonesParams = serde_json::from_str(&content)?;
        Self::with_params(params)
    }

    /// Pair energy (cutoff-shifted) and the scalar force prefactor for a
    /// separation vector already reduced to its minimum image
    fn pair_terms(&self, r_squared: f64) -> (f64, f64) {
        let epsilon = self.params.epsilon;
        let sigma = self.params.sigma;
        let s2 = sigma * sigma / r_squared;
        let s6 = s2 * s2 * s2;
        let s12 = s6 * s6;

        let rc2 = self.params.cutoff * self.params.cutoff;
        let c2 = sigma * sigma / rc2;
        let c6 = c2 * c2 * c2;
        let shift = 4.0 * epsilon * (c6 * c6 - c6);

        let energy = 4.0 * epsilon * (s12 - s6) - shift;
        let force_over_r = 24.0 * epsilon * (2.0 * s12 - s6) / r_squared;
        (energy, force_over_r)
    }
}

/// Minimum-image transform for the periodic axes of a cell.
///
/// Columns of `h` are the cell vectors; `h_inv` maps cartesian to
/// fractional coordinates.
struct MinimumImage {
    h: Matrix3<f64>,
    h_inv: Matrix3<f64>,
    pbc: [bool; 3],
}

impl MinimumImage {
    fn for_configuration(configuration: &AtomicConfiguration) -> Result<Option<Self>, CalculatorError> {
        if !configuration.pbc.iter().any(|&p| p) {
            return Ok(None);
        }
        let h = configuration.cell.transpose();
        let h_inv = h.try_inverse().ok_or(CalculatorError::SingularCell)?;
        Ok(Some(Self {
            h,
            h_inv,
            pbc: configuration.pbc,
        }))
    }

    fn reduce(&self, dr: Vector3<f64>) -> Vector3<f64> {
        let mut s = self.h_inv * dr;
        for axis in 0..3 {
            if self.pbc[axis] {
                s[axis] -= s[axis].round();
            }
        }
        self.h * s
    }
}

impl Calculator for LennardJones {
    fn name(&self) -> &'static str {
        "lennard-jones"
    }

    fn evaluate(
        &self,
        configuration: &AtomicConfiguration,
    ) -> Result<ForceEnergyResult, CalculatorError> {
        let positions = configuration.positions();
        let n = positions.len();
        let mic = MinimumImage::for_configuration(configuration)?;
        let cutoff_squared = self.params.cutoff * self.params.cutoff;

        // Each atom accumulates its own force row; pair energies are halved
        // to compensate for the symmetric double count.
        let per_atom: Vec<(Vector3<f64>, f64)> = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut force = Vector3::zeros();
                let mut energy = 0.0;
                for j in 0..n {
                    if j == i {
                        continue;
                    }
                    let mut dr = positions[i] - positions[j];
                    if let Some(mic) = &mic {
                        dr = mic.reduce(dr);
                    }
                    let r_squared = dr.norm_squared();
                    if r_squared >= cutoff_squared {
                        continue;
                    }
                    let (pair_energy, force_over_r) = self.pair_terms(r_squared);
                    energy += 0.5 * pair_energy;
                    force += force_over_r * dr;
                }
                (force, energy)
            })
            .collect();

        let energy = per_atom.iter().map(|(_, e)| e).sum();
        let forces = per_atom.into_iter().map(|(f, _)| f).collect();

        Ok(ForceEnergyResult { energy, forces })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{Atom, Element};
    use assert_approx_eq::assert_approx_eq;

    fn dimer(separation: f64) -> AtomicConfiguration {
        AtomicConfiguration::new(vec![
            Atom::new(Element::Copper, Vector3::zeros()),
            Atom::new(Element::Copper, Vector3::new(separation, 0.0, 0.0)),
        ])
    }

    #[test]
    fn test_dimer_equilibrium_force_vanishes() {
        let calculator = LennardJones::new();
        let equilibrium = 2.0_f64.powf(1.0 / 6.0);
        let result = calculator.evaluate(&dimer(equilibrium)).unwrap();

        assert_approx_eq!(result.forces[0].norm(), 0.0, 1e-10);
        assert_approx_eq!(result.forces[1].norm(), 0.0, 1e-10);
    }

    #[test]
    fn test_dimer_energy_near_well_depth() {
        // With the cutoff at 3 sigma the shift is small but nonzero
        let calculator = LennardJones::new();
        let equilibrium = 2.0_f64.powf(1.0 / 6.0);
        let result = calculator.evaluate(&dimer(equilibrium)).unwrap();

        assert_approx_eq!(result.energy, -1.0, 1e-2);
    }

    #[test]
    fn test_compressed_dimer_repels() {
        let calculator = LennardJones::new();
        let result = calculator.evaluate(&dimer(0.9)).unwrap();

        // Atom 0 sits left of atom 1 and is pushed further left
        assert!(result.forces[0].x < 0.0);
        assert!(result.forces[1].x > 0.0);
        assert!(result.energy > 0.0);
    }

    #[test]
    fn test_forces_sum_to_zero() {
        let calculator = LennardJones::new();
        let config = AtomicConfiguration::new(vec![
            Atom::new(Element::Copper, Vector3::new(0.0, 0.0, 0.0)),
            Atom::new(Element::Copper, Vector3::new(1.1, 0.2, 0.0)),
            Atom::new(Element::Copper, Vector3::new(0.4, 1.0, 0.3)),
        ]);
        let result = calculator.evaluate(&config).unwrap();

        let total: Vector3<f64> = result.forces.iter().sum();
        assert_approx_eq!(total.norm(), 0.0, 1e-12);
    }

    #[test]
    fn test_minimum_image_wraps_periodic_axis() {
        let calculator = LennardJones::new();
        let cell = Matrix3::from_diagonal(&Vector3::new(10.0, 10.0, 10.0));
        let atoms = vec![
            Atom::new(Element::Copper, Vector3::new(0.5, 0.0, 0.0)),
            Atom::new(Element::Copper, Vector3::new(9.5, 0.0, 0.0)),
        ];

        let periodic =
            AtomicConfiguration::with_cell(atoms.clone(), cell, [true, true, true]);
        let open = AtomicConfiguration::with_cell(atoms, cell, [false, false, false]);

        let wrapped = calculator.evaluate(&periodic).unwrap();
        let direct = calculator.evaluate(&open).unwrap();

        // Across the boundary the atoms are 1.0 apart; without wrapping they
        // are 9.0 apart and beyond the cutoff.
        assert!(wrapped.energy < -0.01);
        assert_approx_eq!(direct.energy, 0.0);
    }

    #[test]
    fn test_periodic_axis_with_singular_cell_is_rejected() {
        let calculator = LennardJones::new();
        let config = AtomicConfiguration::with_cell(
            vec![Atom::new(Element::Copper, Vector3::zeros())],
            Matrix3::zeros(),
            [true, false, false],
        );
        assert!(matches!(
            calculator.evaluate(&config),
            Err(CalculatorError::SingularCell)
        ));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let params = LennardJonesParams {
            epsilon: -1.0,
            ..LennardJonesParams::default()
        };
        assert!(matches!(
            LennardJones::with_params(params),
            Err(CalculatorError::InvalidParameters(_))
        ));
    }
}
