//! Atom representation and related functionality

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chemical elements supported by the builder and the bundled calculators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    Hydrogen,  // H
    Carbon,    // C
    Nitrogen,  // N
    Oxygen,    // O

    // fcc metals commonly used as slab substrates
    Aluminium, // Al
    Nickel,    // Ni
    Copper,    // Cu
    Palladium, // Pd
    Silver,    // Ag
    Platinum,  // Pt
    Gold,      // Au

    // For species that don't match any of the above
    Unknown,
}

impl Element {
    /// Returns the covalent radius of the element in Angstroms
    pub fn covalent_radius(&self) -> f64 {
        match self {
            Element::Hydrogen => 0.31,
            Element::Carbon => 0.76,
            Element::Nitrogen => 0.71,
            Element::Oxygen => 0.66,
            Element::Aluminium => 1.21,
            Element::Nickel => 1.24,
            Element::Copper => 1.32,
            Element::Palladium => 1.39,
            Element::Silver => 1.45,
            Element::Platinum => 1.36,
            Element::Gold => 1.36,
            Element::Unknown => 1.5, // Default radius
        }
    }

    /// Conventional fcc lattice constant in Angstroms, where one is tabulated
    pub fn fcc_lattice_constant(&self) -> Option<f64> {
        match self {
            Element::Aluminium => Some(4.05),
            Element::Nickel => Some(3.52),
            Element::Copper => Some(3.61),
            Element::Palladium => Some(3.89),
            Element::Silver => Some(4.09),
            Element::Platinum => Some(3.92),
            Element::Gold => Some(4.08),
            _ => None,
        }
    }

    /// Parse an element from its chemical symbol
    pub fn from_symbol(s: &str) -> Self {
        match s.trim() {
            "H" => Element::Hydrogen,
            "C" => Element::Carbon,
            "N" => Element::Nitrogen,
            "O" => Element::Oxygen,
            "Al" => Element::Aluminium,
            "Ni" => Element::Nickel,
            "Cu" => Element::Copper,
            "Pd" => Element::Palladium,
            "Ag" => Element::Silver,
            "Pt" => Element::Platinum,
            "Au" => Element::Gold,
            _ => Element::Unknown,
        }
    }

    /// Chemical symbol for this element
    pub fn symbol(&self) -> &'static str {
        match self {
            Element::Hydrogen => "H",
            Element::Carbon => "C",
            Element::Nitrogen => "N",
            Element::Oxygen => "O",
            Element::Aluminium => "Al",
            Element::Nickel => "Ni",
            Element::Copper => "Cu",
            Element::Palladium => "Pd",
            Element::Silver => "Ag",
            Element::Platinum => "Pt",
            Element::Gold => "Au",
            Element::Unknown => "X",
        }
    }
}

/// Represents an atom in 3D space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    /// Chemical element
    pub element: Element,

    /// 3D coordinates (in Angstroms)
    pub position: Vector3<f64>,
}

impl Atom {
    /// Create a new atom
    pub fn new(element: Element, position: Vector3<f64>) -> Self {
        Self { element, position }
    }

    /// Calculate distance to another atom
    pub fn distance(&self, other: &Atom) -> f64 {
        (self.position - other.position).norm()
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({:.4}, {:.4}, {:.4})",
            self.element.symbol(),
            self.position.x,
            self.position.y,
            self.position.z
        )
    }
}
