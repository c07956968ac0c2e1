//! Periodic table lookups used for relativistic auto-detection and
//! electron counting.
//!
//! The table is static data indexed by atomic number. Atom labels coming
//! from user input (`Fe`, `fe`, `FE`, `Fe1`, `Cl_a`) are normalized to the
//! canonical symbol before lookup.

/// Element symbols ordered by atomic number (index 0 is hydrogen).
pub const ELEMENT_SYMBOLS: [&str; 118] = [
    "H", "He", // period 1
    "Li", "Be", "B", "C", "N", "O", "F", "Ne", // period 2
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", // period 3
    "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se",
    "Br", "Kr", // period 4
    "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn", "Sb", "Te",
    "I", "Xe", // period 5
    "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm",
    "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At",
    "Rn", // period 6
    "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm", "Md", "No",
    "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts",
    "Og", // period 7
];

/// Last atomic number of each period.
const PERIOD_ENDS: [u32; 7] = [2, 10, 18, 36, 54, 86, 118];

/// First period whose elements count as heavy for scalar-relativistic treatment.
pub const HEAVY_ELEMENT_MIN_PERIOD: u32 = 4;

/// Strips numeric or underscore suffixes from an atom label and fixes the
/// capitalization: `"fe1"` becomes `"Fe"`.
pub fn normalize_symbol(label: &str) -> String {
    let letters: String = label
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let mut chars = letters.chars();
    match chars.next() {
        Some(first) => {
            let mut symbol = first.to_ascii_uppercase().to_string();
            symbol.push_str(&chars.as_str().to_ascii_lowercase());
            symbol
        }
        None => String::new(),
    }
}

/// Returns the atomic number for an atom label, or `None` if the label is
/// not a known element.
///
/// # Examples
///
/// ```
/// use bdfgen::elements::atomic_number;
///
/// assert_eq!(atomic_number("O"), Some(8));
/// assert_eq!(atomic_number("fe2"), Some(26));
/// assert_eq!(atomic_number("Xx"), None);
/// ```
pub fn atomic_number(label: &str) -> Option<u32> {
    let symbol = normalize_symbol(label);
    ELEMENT_SYMBOLS
        .iter()
        .position(|s| *s == symbol)
        .map(|idx| idx as u32 + 1)
}

/// Returns the symbol for an atomic number (1-based), `"X"` if out of range.
pub fn symbol(atomic_number: u32) -> &'static str {
    match atomic_number {
        1..=118 => ELEMENT_SYMBOLS[atomic_number as usize - 1],
        _ => "X",
    }
}

/// Period (row) of the periodic table for an atomic number.
pub fn period(atomic_number: u32) -> Option<u32> {
    PERIOD_ENDS
        .iter()
        .position(|&end| atomic_number >= 1 && atomic_number <= end)
        .map(|idx| idx as u32 + 1)
}

/// True when the label names an element of period 4 or later.
pub fn is_heavy_element(label: &str) -> bool {
    atomic_number(label)
        .and_then(period)
        .is_some_and(|p| p >= HEAVY_ELEMENT_MIN_PERIOD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("fe"), "Fe");
        assert_eq!(normalize_symbol("CL1"), "Cl");
        assert_eq!(normalize_symbol(" h_a "), "H");
        assert_eq!(normalize_symbol("12"), "");
    }

    #[test]
    fn test_period_boundaries() {
        assert_eq!(period(1), Some(1));
        assert_eq!(period(18), Some(3));
        assert_eq!(period(19), Some(4));
        assert_eq!(period(86), Some(6));
        assert_eq!(period(118), Some(7));
        assert_eq!(period(0), None);
        assert_eq!(period(119), None);
    }

    #[test]
    fn test_heavy_elements() {
        assert!(!is_heavy_element("C"));
        assert!(!is_heavy_element("Ar"));
        assert!(is_heavy_element("K"));
        assert!(is_heavy_element("Br"));
        assert!(is_heavy_element("pt"));
        assert!(!is_heavy_element("Q"));
    }

    #[test]
    fn test_symbol_round_trip_for_known_elements() {
        assert_eq!(symbol(26), "Fe");
        assert_eq!(symbol(0), "X");
        assert_eq!(atomic_number(symbol(79)), Some(79));
    }
}
