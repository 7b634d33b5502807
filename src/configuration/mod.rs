//! Atomic configuration representation and related functionality

use crate::atom::{Atom, Element};
use crate::constraints::ConstraintSet;
use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

/// Errors that can occur when working with atomic configurations
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid atom index: {0}")]
    InvalidAtomIndex(usize),

    #[error("Mismatched array lengths: expected {expected}, got {actual}")]
    MismatchedLengths { expected: usize, actual: usize },

    #[error("No atoms in configuration")]
    EmptyConfiguration,
}

/// A set of atoms with cell geometry, periodicity flags and constraints.
///
/// Atom count and ordering are fixed for the lifetime of a relaxation run;
/// only positions change, and only through the optimizer.
#[derive(Debug)]
pub struct AtomicConfiguration {
    /// List of atoms in the configuration
    pub atoms: Vec<Atom>,

    /// Cell matrix, rows are the cell vectors (in Angstroms)
    pub cell: Matrix3<f64>,

    /// Periodicity flag per cell axis
    pub pbc: [bool; 3],

    /// Constraints applied during relaxation
    pub constraints: ConstraintSet,
}

impl AtomicConfiguration {
    /// Create a new configuration with no cell and no periodicity
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self {
            atoms,
            cell: Matrix3::zeros(),
            pbc: [false; 3],
            constraints: ConstraintSet::new(),
        }
    }

    /// Create a new periodic configuration
    pub fn with_cell(atoms: Vec<Atom>, cell: Matrix3<f64>, pbc: [bool; 3]) -> Self {
        Self {
            atoms,
            cell,
            pbc,
            constraints: ConstraintSet::new(),
        }
    }

    /// Attach a constraint set, replacing any existing one
    pub fn set_constraints(&mut self, constraints: ConstraintSet) {
        self.constraints = constraints;
    }

    /// Add an atom to the configuration, returning its index
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        let idx = self.atoms.len();
        self.atoms.push(atom);
        idx
    }

    /// Number of atoms
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Whether the configuration holds no atoms
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Current positions, in atom order
    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.atoms.iter().map(|atom| atom.position).collect()
    }

    /// Species labels, in atom order
    pub fn species(&self) -> Vec<Element> {
        self.atoms.iter().map(|atom| atom.element).collect()
    }

    /// Overwrite all positions at once
    pub fn set_positions(&mut self, positions: &[Vector3<f64>]) -> Result<(), ConfigurationError> {
        if positions.len() != self.atoms.len() {
            return Err(ConfigurationError::MismatchedLengths {
                expected: self.atoms.len(),
                actual: positions.len(),
            });
        }
        for (atom, position) in self.atoms.iter_mut().zip(positions) {
            atom.position = *position;
        }
        Ok(())
    }

    /// Displace all positions by per-atom vectors
    pub fn translate(&mut self, displacement: &[Vector3<f64>]) -> Result<(), ConfigurationError> {
        if displacement.len() != self.atoms.len() {
            return Err(ConfigurationError::MismatchedLengths {
                expected: self.atoms.len(),
                actual: displacement.len(),
            });
        }
        for (atom, delta) in self.atoms.iter_mut().zip(displacement) {
            atom.position += delta;
        }
        Ok(())
    }

    /// Get the geometric center of the configuration
    pub fn center(&self) -> Result<Vector3<f64>, ConfigurationError> {
        if self.atoms.is_empty() {
            return Err(ConfigurationError::EmptyConfiguration);
        }

        let sum = self
            .atoms
            .iter()
            .fold(Vector3::zeros(), |acc, atom| acc + atom.position);

        Ok(sum / self.atoms.len() as f64)
    }

    /// Check that the configuration is a legal optimization input:
    /// non-empty, with every constraint index inside bounds.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.atoms.is_empty() {
            return Err(ConfigurationError::EmptyConfiguration);
        }
        self.constraints.validate(self.atoms.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::FixAtoms;
    use nalgebra::Vector3;

    fn two_atoms() -> AtomicConfiguration {
        AtomicConfiguration::new(vec![
            Atom::new(Element::Copper, Vector3::new(0.0, 0.0, 0.0)),
            Atom::new(Element::Oxygen, Vector3::new(0.0, 0.0, 2.0)),
        ])
    }

    #[test]
    fn test_center() {
        let config = two_atoms();
        let center = config.center().expect("Should compute center");
        assert_eq!(center, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_center_empty() {
        let config = AtomicConfiguration::new(Vec::new());
        assert!(matches!(
            config.center(),
            Err(ConfigurationError::EmptyConfiguration)
        ));
    }

    #[test]
    fn test_set_positions_length_mismatch() {
        let mut config = two_atoms();
        let result = config.set_positions(&[Vector3::zeros()]);
        assert!(matches!(
            result,
            Err(ConfigurationError::MismatchedLengths {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_translate() {
        let mut config = two_atoms();
        let shift = vec![Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)];
        config.translate(&shift).unwrap();
        assert_eq!(config.atoms[0].position, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(config.atoms[1].position, Vector3::new(0.0, 1.0, 2.0));
    }

    #[test]
    fn test_validate_rejects_out_of_range_constraint() {
        let mut config = two_atoms();
        let mut constraints = ConstraintSet::new();
        constraints.add(FixAtoms::new(vec![5]));
        config.set_constraints(constraints);
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidAtomIndex(5))
        ));
    }

    #[test]
    fn test_validate_accepts_in_range_constraint() {
        let mut config = two_atoms();
        let mut constraints = ConstraintSet::new();
        constraints.add(FixAtoms::new(vec![0]));
        config.set_constraints(constraints);
        assert!(config.validate().is_ok());
    }
}
