//! Molecular geometry in output units.
//!
//! [`Geometry`] stores element labels and a flat coordinate vector
//! `[x1, y1, z1, x2, y2, z2, ...]` in Angstrom, the unit the BDF geometry
//! section expects by default. Input in Bohr is converted once on
//! construction so that every downstream formatter sees Angstrom.

use crate::config::{Atom, CoordinateUnits, BOHR_TO_ANGSTROM};
use nalgebra::DVector;

/// Width of each formatted Cartesian component.
pub const COORD_WIDTH: usize = 12;
/// Decimal places of each formatted Cartesian component.
pub const COORD_DECIMALS: usize = 4;

/// Convert coordinates from Bohr to Angstrom.
pub fn bohr_to_angstrom(coords: &DVector<f64>) -> DVector<f64> {
    coords * BOHR_TO_ANGSTROM
}

/// Element labels plus Cartesian coordinates in Angstrom.
///
/// # Examples
///
/// ```
/// use bdfgen::config::{Atom, CoordinateUnits};
/// use bdfgen::geometry::Geometry;
///
/// let atoms = vec![Atom::new("H", 1.0, 0.0, 0.0)];
/// let geometry = Geometry::from_atoms(&atoms, CoordinateUnits::Bohr);
/// assert!((geometry.get_atom_coords(0)[0] - 0.529177).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Atom labels in input order
    pub elements: Vec<String>,
    /// Flattened Cartesian coordinates in Angstrom
    pub coords: DVector<f64>,
    /// Number of atoms
    pub num_atoms: usize,
}

impl Geometry {
    /// Create a geometry from labels and Angstrom coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `coords.len() != elements.len() * 3`.
    pub fn new(elements: Vec<String>, coords: Vec<f64>) -> Self {
        let num_atoms = elements.len();
        assert_eq!(coords.len(), num_atoms * 3);
        Self {
            elements,
            coords: DVector::from_vec(coords),
            num_atoms,
        }
    }

    /// Build a geometry from descriptor atoms, converting Bohr input to
    /// Angstrom. Angstrom input is taken unchanged.
    pub fn from_atoms(atoms: &[Atom], units: CoordinateUnits) -> Self {
        let elements = atoms.iter().map(|a| a.element.clone()).collect();
        let flat = atoms.iter().flat_map(|a| a.position).collect();
        let mut geometry = Self::new(elements, flat);
        if units == CoordinateUnits::Bohr {
            geometry.coords = bohr_to_angstrom(&geometry.coords);
        }
        geometry
    }

    /// Cartesian coordinates of one atom (zero-based index).
    pub fn get_atom_coords(&self, atom_idx: usize) -> [f64; 3] {
        let i = atom_idx * 3;
        [self.coords[i], self.coords[i + 1], self.coords[i + 2]]
    }

    /// Formats one atom as a geometry line: label left-aligned in two
    /// columns, then x, y, z right-aligned at width 12 with 4 decimals.
    pub fn format_atom_line(&self, atom_idx: usize) -> String {
        let [x, y, z] = self.get_atom_coords(atom_idx);
        format!(
            "{:<2} {:>w$.p$} {:>w$.p$} {:>w$.p$}",
            self.elements[atom_idx],
            x,
            y,
            z,
            w = COORD_WIDTH,
            p = COORD_DECIMALS
        )
    }

    /// All geometry lines in input order.
    pub fn format_lines(&self) -> Vec<String> {
        (0..self.num_atoms).map(|i| self.format_atom_line(i)).collect()
    }
}
