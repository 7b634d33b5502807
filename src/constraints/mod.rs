//! Positional constraints applied during relaxation

use crate::configuration::ConfigurationError;
use nalgebra::Vector3;
use std::fmt;

/// A geometric restriction on the degrees of freedom of some atoms.
///
/// Implementations nullify the force and displacement components of the
/// atoms they restrict, so the optimizer never moves them. Both projections
/// must be idempotent: projecting an already-projected slice is a no-op.
pub trait Constraint: Send + Sync + fmt::Debug {
    /// Zero out force components of restricted degrees of freedom
    fn project_forces(&self, forces: &mut [Vector3<f64>]);

    /// Zero out displacement components of restricted degrees of freedom
    fn project_displacement(&self, displacement: &mut [Vector3<f64>]);

    /// Check that every referenced atom index is below `n_atoms`
    fn validate(&self, n_atoms: usize) -> Result<(), ConfigurationError>;
}

/// Holds a group of atoms entirely immovable
#[derive(Debug, Clone)]
pub struct FixAtoms {
    indices: Vec<usize>,
}

impl FixAtoms {
    /// Fix the atoms at the given indices. Duplicates are collapsed.
    pub fn new(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    /// Fix every atom whose position lies at or below `z_cutoff`
    pub fn below(positions: &[Vector3<f64>], z_cutoff: f64) -> Self {
        let indices = positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.z <= z_cutoff)
            .map(|(i, _)| i)
            .collect();
        Self::new(indices)
    }

    /// Indices of the fixed atoms, sorted ascending
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl Constraint for FixAtoms {
    fn project_forces(&self, forces: &mut [Vector3<f64>]) {
        for &idx in &self.indices {
            if let Some(force) = forces.get_mut(idx) {
                *force = Vector3::zeros();
            }
        }
    }

    fn project_displacement(&self, displacement: &mut [Vector3<f64>]) {
        for &idx in &self.indices {
            if let Some(delta) = displacement.get_mut(idx) {
                *delta = Vector3::zeros();
            }
        }
    }

    fn validate(&self, n_atoms: usize) -> Result<(), ConfigurationError> {
        match self.indices.last() {
            Some(&idx) if idx >= n_atoms => Err(ConfigurationError::InvalidAtomIndex(idx)),
            _ => Ok(()),
        }
    }
}

/// An ordered collection of constraints applied in sequence
#[derive(Debug, Default)]
pub struct ConstraintSet {
    constraints: Vec<Box<dyn Constraint>>,
}

impl ConstraintSet {
    /// Create an empty constraint set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a constraint
    pub fn add<C: Constraint + 'static>(&mut self, constraint: C) {
        self.constraints.push(Box::new(constraint));
    }

    /// Whether any constraints are attached
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Apply every constraint's force projection in order
    pub fn project_forces(&self, forces: &mut [Vector3<f64>]) {
        for constraint in &self.constraints {
            constraint.project_forces(forces);
        }
    }

    /// Apply every constraint's displacement projection in order
    pub fn project_displacement(&self, displacement: &mut [Vector3<f64>]) {
        for constraint in &self.constraints {
            constraint.project_displacement(displacement);
        }
    }

    /// Validate every constraint against the atom count
    pub fn validate(&self, n_atoms: usize) -> Result<(), ConfigurationError> {
        for constraint in &self.constraints {
            constraint.validate(n_atoms)?;
        }
        Ok(())
    }
}
