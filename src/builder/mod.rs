//! Construction of slab/adsorbate starting configurations
//!
//! Produces the initial [`AtomicConfiguration`] and constraints consumed by
//! the optimizer. The optimizer itself never depends on this module.

use nalgebra::{Matrix3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::atom::{Atom, Element};
use crate::configuration::AtomicConfiguration;
use crate::constraints::FixAtoms;

/// Errors that can occur while building a configuration
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Slab size must be nonzero in every direction")]
    EmptySlab,

    #[error("No tabulated fcc lattice constant for {0:?}")]
    UnknownLatticeConstant(Element),

    #[error("Atom count {n_atoms} is not divisible into {layers} layers")]
    UnevenLayers { n_atoms: usize, layers: usize },

    #[error("Requested {requested} fixed layers but the slab has {available}")]
    TooManyFixedLayers { requested: usize, available: usize },
}

/// Build an orthogonal fcc(111) slab.
///
/// `size` is (nx, ny, layers) repetitions of the two-atom surface mesh;
/// atoms are ordered layer by layer from the bottom up. The slab is
/// periodic in x and y, with `vacuum` Angstroms of padding on each side
/// along z. When `lattice_constant` is `None` the tabulated value for the
/// element is used.
pub fn fcc111(
    element: Element,
    lattice_constant: Option<f64>,
    size: (usize, usize, usize),
    vacuum: f64,
) -> Result<AtomicConfiguration, BuildError> {
    let (nx, ny, layers) = size;
    if nx == 0 || ny == 0 || layers == 0 {
        return Err(BuildError::EmptySlab);
    }
    let a = match lattice_constant.or_else(|| element.fcc_lattice_constant()) {
        Some(a) => a,
        None => return Err(BuildError::UnknownLatticeConstant(element)),
    };

    // Nearest-neighbor distance and (111) interlayer spacing
    let d = a / 2.0_f64.sqrt();
    let row = d * 3.0_f64.sqrt();
    let h = a / 3.0_f64.sqrt();

    let cell_x = nx as f64 * d;
    let cell_y = ny as f64 * row;
    let cell_z = (layers - 1) as f64 * h + 2.0 * vacuum;

    // Two-point basis of the centered-rectangular surface mesh
    let basis = [(0.0, 0.0), (0.5 * d, 0.5 * row)];

    let mut atoms = Vec::with_capacity(2 * nx * ny * layers);
    for layer in 0..layers {
        // ABC stacking: successive layers slide along y by a third of a row
        let stacking_shift = (layer % 3) as f64 * row / 3.0;
        let z = vacuum + layer as f64 * h;
        for iy in 0..ny {
            for ix in 0..nx {
                for (bx, by) in basis {
                    let x = (ix as f64 * d + bx).rem_euclid(cell_x);
                    let y = (iy as f64 * row + by + stacking_shift).rem_euclid(cell_y);
                    atoms.push(Atom::new(element, Vector3::new(x, y, z)));
                }
            }
        }
    }

    let cell = Matrix3::from_diagonal(&Vector3::new(cell_x, cell_y, cell_z));
    Ok(AtomicConfiguration::with_cell(atoms, cell, [true, true, false]))
}

/// Fix the lowest `n_layers` of a layer-ordered slab.
///
/// Relies on the bottom-up atom ordering produced by [`fcc111`].
pub fn fix_bottom_layers(
    configuration: &mut AtomicConfiguration,
    n_layers: usize,
    total_layers: usize,
) -> Result<(), BuildError> {
    let n_atoms = configuration.len();
    if total_layers == 0 || n_atoms % total_layers != 0 {
        return Err(BuildError::UnevenLayers {
            n_atoms,
            layers: total_layers,
        });
    }
    if n_layers > total_layers {
        return Err(BuildError::TooManyFixedLayers {
            requested: n_layers,
            available: total_layers,
        });
    }

    let per_layer = n_atoms / total_layers;
    let fixed: Vec<usize> = (0..n_layers * per_layer).collect();
    configuration.constraints.add(FixAtoms::new(fixed));
    Ok(())
}

/// Place an adsorbate above the slab surface.
///
/// The adsorbate's lowest atom lands `height` Angstroms above the topmost
/// slab atom, laterally at `site`. Adsorbate coordinates are relative.
pub fn add_adsorbate(
    slab: &mut AtomicConfiguration,
    adsorbate: &[Atom],
    height: f64,
    site: (f64, f64),
) -> Result<(), BuildError> {
    if slab.is_empty() || adsorbate.is_empty() {
        return Err(BuildError::EmptySlab);
    }

    let z_top = slab
        .atoms
        .iter()
        .map(|atom| atom.position.z)
        .fold(f64::NEG_INFINITY, f64::max);
    let z_base = adsorbate
        .iter()
        .map(|atom| atom.position.z)
        .fold(f64::INFINITY, f64::min);

    for atom in adsorbate {
        let position = Vector3::new(
            site.0 + atom.position.x,
            site.1 + atom.position.y,
            z_top + height + (atom.position.z - z_base),
        );
        slab.add_atom(Atom::new(atom.element, position));
    }
    Ok(())
}

/// CO molecule, carbon end down, in relative coordinates
pub fn carbon_monoxide() -> Vec<Atom> {
    vec![
        Atom::new(Element::Carbon, Vector3::zeros()),
        Atom::new(Element::Oxygen, Vector3::new(0.0, 0.0, 1.128)),
    ]
}

/// N2 molecule, axis along z, in relative coordinates
pub fn dinitrogen() -> Vec<Atom> {
    vec![
        Atom::new(Element::Nitrogen, Vector3::zeros()),
        Atom::new(Element::Nitrogen, Vector3::new(0.0, 0.0, 1.098)),
    ]
}

/// Displace free atoms by uniform random amounts up to `amplitude`.
///
/// Constrained atoms stay put; a fixed seed reproduces the same
/// perturbation exactly.
pub fn rattle(configuration: &mut AtomicConfiguration, amplitude: f64, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut displacement: Vec<Vector3<f64>> = (0..configuration.len())
        .map(|_| {
            Vector3::new(
                (rng.gen::<f64>() - 0.5) * 2.0 * amplitude,
                (rng.gen::<f64>() - 0.5) * 2.0 * amplitude,
                (rng.gen::<f64>() - 0.5) * 2.0 * amplitude,
            )
        })
        .collect();
    configuration
        .constraints
        .project_displacement(&mut displacement);
    // Length matches by construction, so this cannot fail
    let _ = configuration.translate(&displacement);
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_fcc111_atom_count_and_cell() {
        let slab = fcc111(Element::Copper, None, (3, 2, 4), 10.0).unwrap();
        assert_eq!(slab.len(), 2 * 3 * 2 * 4);
        assert_eq!(slab.pbc, [true, true, false]);

        let d = 3.61 / 2.0_f64.sqrt();
        assert_approx_eq!(slab.cell[(0, 0)], 3.0 * d, 1e-12);
    }

    #[test]
    fn test_fcc111_layer_spacing() {
        let slab = fcc111(Element::Copper, Some(3.61), (1, 1, 3), 5.0).unwrap();
        let h = 3.61 / 3.0_f64.sqrt();

        // Two atoms per layer, ordered bottom-up
        assert_approx_eq!(slab.atoms[0].position.z, 5.0, 1e-12);
        assert_approx_eq!(slab.atoms[2].position.z, 5.0 + h, 1e-12);
        assert_approx_eq!(slab.atoms[4].position.z, 5.0 + 2.0 * h, 1e-12);
    }

    #[test]
    fn test_fcc111_requires_lattice_constant() {
        assert!(matches!(
            fcc111(Element::Oxygen, None, (2, 2, 2), 5.0),
            Err(BuildError::UnknownLatticeConstant(Element::Oxygen))
        ));
    }

    #[test]
    fn test_fix_bottom_layers() {
        let mut slab = fcc111(Element::Copper, None, (2, 2, 3), 8.0).unwrap();
        fix_bottom_layers(&mut slab, 2, 3).unwrap();

        let per_layer = 2 * 2 * 2;
        let mut forces = vec![Vector3::new(1.0, 1.0, 1.0); slab.len()];
        slab.constraints.project_forces(&mut forces);

        for (idx, force) in forces.iter().enumerate() {
            if idx < 2 * per_layer {
                assert_eq!(*force, Vector3::zeros());
            } else {
                assert_eq!(*force, Vector3::new(1.0, 1.0, 1.0));
            }
        }
    }

    #[test]
    fn test_fix_bottom_layers_rejects_excess() {
        let mut slab = fcc111(Element::Copper, None, (2, 2, 3), 8.0).unwrap();
        assert!(matches!(
            fix_bottom_layers(&mut slab, 4, 3),
            Err(BuildError::TooManyFixedLayers { .. })
        ));
    }

    #[test]
    fn test_add_adsorbate_sits_above_surface() {
        let mut slab = fcc111(Element::Copper, None, (2, 2, 2), 8.0).unwrap();
        let z_top = slab
            .atoms
            .iter()
            .map(|a| a.position.z)
            .fold(f64::NEG_INFINITY, f64::max);

        add_adsorbate(&mut slab, &carbon_monoxide(), 2.0, (1.0, 1.0)).unwrap();

        let carbon = &slab.atoms[slab.len() - 2];
        let oxygen = &slab.atoms[slab.len() - 1];
        assert_eq!(carbon.element, Element::Carbon);
        assert_approx_eq!(carbon.position.z, z_top + 2.0, 1e-12);
        assert_approx_eq!(oxygen.position.z, z_top + 2.0 + 1.128, 1e-12);
    }

    #[test]
    fn test_rattle_is_reproducible() {
        let mut first = fcc111(Element::Copper, None, (2, 2, 2), 8.0).unwrap();
        let mut second = fcc111(Element::Copper, None, (2, 2, 2), 8.0).unwrap();

        rattle(&mut first, 0.1, 42);
        rattle(&mut second, 0.1, 42);
        assert_eq!(first.positions(), second.positions());

        let mut third = fcc111(Element::Copper, None, (2, 2, 2), 8.0).unwrap();
        rattle(&mut third, 0.1, 43);
        assert_ne!(first.positions(), third.positions());
    }

    #[test]
    fn test_rattle_respects_constraints() {
        let mut slab = fcc111(Element::Copper, None, (2, 2, 2), 8.0).unwrap();
        fix_bottom_layers(&mut slab, 1, 2).unwrap();
        let before = slab.positions();

        rattle(&mut slab, 0.2, 7);
        let after = slab.positions();

        let per_layer = 2 * 2 * 2;
        for idx in 0..per_layer {
            assert_eq!(before[idx], after[idx]);
        }
        assert_ne!(before[per_layer], after[per_layer]);
    }
}
