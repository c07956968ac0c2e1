//! Normalization utilities shared by the module generators.
//!
//! - Point group canonicalization ([`normalize_point_group`])
//! - SCF method derivation ([`derive_scf_method`])
//! - Functional string normalization ([`normalize_functional`])
//! - Heavy element and relativistic/ECP basis detection
//! - Truthiness of loosely typed settings values ([`boolish`])
//! - Number formatting for value lines ([`format_float`], [`format_scientific`])
//!
//! Reference tables here are immutable constants. Bump
//! [`POINT_GROUP_TABLE_VERSION`] when the point group list changes.

use crate::config::{Atom, Functional};
use crate::elements::is_heavy_element;
use crate::error::CompileError;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Version of [`POINT_GROUPS`].
pub const POINT_GROUP_TABLE_VERSION: u32 = 1;

/// Point groups accepted by the `Group` keyword, in canonical spelling.
pub const POINT_GROUPS: &[&str] = &[
    "C1", "Ci", "Cs", //
    "C2", "C3", "C4", "C5", "C6", "C7", "C8", //
    "C2v", "C3v", "C4v", "C5v", "C6v", "C7v", "C8v", //
    "C2h", "C3h", "C4h", "C5h", "C6h", "C7h", "C8h", //
    "D2", "D3", "D4", "D5", "D6", "D7", "D8", //
    "D2h", "D3h", "D4h", "D5h", "D6h", "D7h", "D8h", //
    "D2d", "D3d", "D4d", "D5d", "D6d", "D7d", "D8d", //
    "S4", "S6", "S8", //
    "T", "Td", "Th", "O", "Oh", "I", "Ih",
];

/// Substrings of a basis set name that mark an all-electron relativistic basis.
pub const RELATIVISTIC_BASIS_TAGS: &[&str] = &["x2c", "dkh", "dk", "dyall", "relativistic", "rcc"];

/// Substrings of a basis set name that mark an effective core potential.
pub const ECP_BASIS_TAGS: &[&str] = &["ecp", "lanl", "sdd", "stuttgart", "crenb", "sbkjc", "-pp"];

/// Strings that read as false in [`boolish`].
const FALSE_WORDS: &[&str] = &["false", "no", "off", "0", "none", "null"];

lazy_static! {
    // Leading axis letter, then order/suffix, optionally in parentheses: "c2v", "D(6h)", "td"
    static ref POINT_GROUP_RE: Regex =
        Regex::new(r"^([A-Za-z])\s*\(?\s*([0-9]*[A-Za-z]*)\s*\)?$").unwrap();
}

/// Canonicalizes a point group name to the target spelling, e.g. `"c2v"`
/// to `"C(2v)"`.
///
/// Returns `None` for names outside [`POINT_GROUPS`]; callers drop the
/// `Group` keyword in that case without raising an error.
///
/// # Examples
///
/// ```
/// use bdfgen::normalize::normalize_point_group;
///
/// assert_eq!(normalize_point_group("c2v").as_deref(), Some("C(2v)"));
/// assert_eq!(normalize_point_group("D6h").as_deref(), Some("D(6h)"));
/// assert_eq!(normalize_point_group("X7"), None);
/// ```
pub fn normalize_point_group(name: &str) -> Option<String> {
    let caps = POINT_GROUP_RE.captures(name.trim())?;
    let axis = caps[1].to_ascii_uppercase();
    let suffix = caps[2].to_ascii_lowercase();
    let canonical = format!("{}{}", axis, suffix);
    if !POINT_GROUPS.contains(&canonical.as_str()) {
        return None;
    }
    if suffix.is_empty() {
        Some(axis)
    } else {
        Some(format!("{}({})", axis, suffix))
    }
}

/// SCF reference determinant type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScfMethod {
    /// Restricted Hartree-Fock
    Rhf,
    /// Unrestricted Hartree-Fock
    Uhf,
    /// Restricted open-shell Hartree-Fock
    Rohf,
    /// Restricted Kohn-Sham
    Rks,
    /// Unrestricted Kohn-Sham
    Uks,
    /// Restricted open-shell Kohn-Sham
    Roks,
}

impl ScfMethod {
    /// Keyword as written in the SCF block.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScfMethod::Rhf => "RHF",
            ScfMethod::Uhf => "UHF",
            ScfMethod::Rohf => "ROHF",
            ScfMethod::Rks => "RKS",
            ScfMethod::Uks => "UKS",
            ScfMethod::Roks => "ROKS",
        }
    }

    /// True for Kohn-Sham (DFT) references.
    pub fn is_kohn_sham(&self) -> bool {
        matches!(self, ScfMethod::Rks | ScfMethod::Uks | ScfMethod::Roks)
    }
}

impl fmt::Display for ScfMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives the SCF method from method type, multiplicity, functional and
/// the spin-adapted flag.
///
/// | type | multiplicity = 1 | multiplicity > 1 | spin adapted |
/// |------|------------------|------------------|--------------|
/// | hf   | RHF              | UHF              | ROHF         |
/// | dft  | RKS              | UKS              | ROKS         |
///
/// An empty method type with a functional present is read as `dft`.
///
/// # Errors
///
/// [`CompileError::InvalidMultiplicity`] for multiplicity < 1 and
/// [`CompileError::UnsupportedMethod`] for any other method type.
pub fn derive_scf_method(
    method_type: &str,
    multiplicity: i64,
    functional: Option<&str>,
    spin_adapted: bool,
) -> Result<ScfMethod, CompileError> {
    if multiplicity < 1 {
        return Err(CompileError::InvalidMultiplicity(multiplicity));
    }
    let mut kind = method_type.trim().to_ascii_lowercase();
    if kind.is_empty() && functional.is_some_and(|f| !f.trim().is_empty()) {
        kind = "dft".to_string();
    }
    let open_shell = multiplicity > 1;
    match (kind.as_str(), spin_adapted, open_shell) {
        ("hf", true, _) => Ok(ScfMethod::Rohf),
        ("hf", false, false) => Ok(ScfMethod::Rhf),
        ("hf", false, true) => Ok(ScfMethod::Uhf),
        ("dft", true, _) => Ok(ScfMethod::Roks),
        ("dft", false, false) => Ok(ScfMethod::Rks),
        ("dft", false, true) => Ok(ScfMethod::Uks),
        _ => Err(CompileError::UnsupportedMethod {
            method: method_type.to_string(),
            multiplicity,
        }),
    }
}

/// Returns the exact text that follows the `DFT` keyword.
///
/// User-chosen names are never remapped: whitespace is collapsed and an
/// `{x, c}` pair is joined with a single space.
///
/// # Examples
///
/// ```
/// use bdfgen::config::Functional;
/// use bdfgen::normalize::normalize_functional;
///
/// assert_eq!(normalize_functional(&Functional::Name(" b3lyp ".into())), "b3lyp");
/// assert_eq!(normalize_functional(&Functional::Name("B88   LYP".into())), "B88 LYP");
/// let pair = Functional::Components { x: "B88".into(), c: "LYP".into() };
/// assert_eq!(normalize_functional(&pair), "B88 LYP");
/// ```
pub fn normalize_functional(functional: &Functional) -> String {
    functional_components(functional).join(" ")
}

/// Splits a functional into its whitespace-separated parts.
pub fn functional_components(functional: &Functional) -> Vec<String> {
    match functional {
        Functional::Name(name) => name.split_whitespace().map(str::to_string).collect(),
        Functional::Components { x, c } => [x, c]
            .iter()
            .flat_map(|part| part.split_whitespace())
            .map(str::to_string)
            .collect(),
    }
}

/// True when any atom belongs to period 4 or later.
pub fn has_heavy_elements(atoms: &[Atom]) -> bool {
    atoms.iter().any(|atom| is_heavy_element(&atom.element))
}

/// True when the basis name carries a relativistic tag (`x2c`, `dkh`, ...).
pub fn is_relativistic_basis(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    RELATIVISTIC_BASIS_TAGS.iter().any(|tag| lower.contains(tag))
}

/// True when the basis name carries an ECP tag (`lanl2dz`, `sdd`, ...).
pub fn is_ecp_basis(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ECP_BASIS_TAGS.iter().any(|tag| lower.contains(tag))
}

/// Loose truthiness for settings values.
///
/// Booleans are taken as is, numbers are true when non-zero, strings are
/// true when non-empty and not one of `false`, `no`, `off`, `0`, `none`,
/// `null`. Lists and mappings are true when non-empty.
pub fn boolish(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => {
            let word = s.trim().to_ascii_lowercase();
            !word.is_empty() && !FALSE_WORDS.contains(&word.as_str())
        }
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Formats a float the way value lines expect: shortest round-trip digits,
/// always with a decimal point or exponent (`2.0`, `0.7`, `1e-06`, `1e+16`).
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if value != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let text = format!("{:e}", value);
        return pad_exponent(&text, "e");
    }
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Scientific notation with a fixed number of mantissa decimals and a
/// signed, two-digit upper-case exponent: `format_scientific(1e-6, 1)` is
/// `"1.0E-06"`.
pub fn format_scientific(value: f64, decimals: usize) -> String {
    let text = format!("{:.*e}", decimals, value);
    pad_exponent(&text, "E")
}

fn pad_exponent(text: &str, marker: &str) -> String {
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let exp: i32 = exponent.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}{}{}{:02}", mantissa, marker, sign, exp.abs())
        }
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_group_forms() {
        assert_eq!(normalize_point_group("c2v").as_deref(), Some("C(2v)"));
        assert_eq!(normalize_point_group("D6h").as_deref(), Some("D(6h)"));
        assert_eq!(normalize_point_group("C(2V)").as_deref(), Some("C(2v)"));
        assert_eq!(normalize_point_group(" td ").as_deref(), Some("T(d)"));
        assert_eq!(normalize_point_group("cs").as_deref(), Some("C(s)"));
        assert_eq!(normalize_point_group("C1").as_deref(), Some("C(1)"));
        assert_eq!(normalize_point_group("O").as_deref(), Some("O"));
    }

    #[test]
    fn test_invalid_point_groups() {
        assert_eq!(normalize_point_group("X7"), None);
        assert_eq!(normalize_point_group("C9v"), None);
        assert_eq!(normalize_point_group(""), None);
        assert_eq!(normalize_point_group("C2v extra"), None);
    }

    #[test]
    fn test_scf_method_table() {
        let m = |t: &str, mult: i64, sa: bool| derive_scf_method(t, mult, None, sa);
        assert_eq!(m("dft", 1, false).unwrap().as_str(), "RKS");
        assert_eq!(m("dft", 2, false).unwrap().as_str(), "UKS");
        assert_eq!(m("DFT", 3, true).unwrap().as_str(), "ROKS");
        assert_eq!(m("hf", 1, false).unwrap().as_str(), "RHF");
        assert_eq!(m("hf", 3, false).unwrap().as_str(), "UHF");
        assert_eq!(m("hf", 1, true).unwrap().as_str(), "ROHF");
        assert_eq!(m("hf", 2, true).unwrap().as_str(), "ROHF");
    }

    #[test]
    fn test_scf_method_errors() {
        assert!(matches!(
            derive_scf_method("mcscf", 1, None, false),
            Err(CompileError::UnsupportedMethod { .. })
        ));
        assert_eq!(
            derive_scf_method("hf", 0, None, false),
            Err(CompileError::InvalidMultiplicity(0))
        );
    }

    #[test]
    fn test_empty_type_with_functional_is_dft() {
        assert_eq!(
            derive_scf_method("", 1, Some("PBE0"), false),
            Ok(ScfMethod::Rks)
        );
        assert!(derive_scf_method("", 1, None, false).is_err());
    }

    #[test]
    fn test_basis_tags() {
        assert!(is_relativistic_basis("x2c-TZVPall"));
        assert!(is_relativistic_basis("cc-pVTZ-DK"));
        assert!(is_relativistic_basis("ANO-RCC-VDZP"));
        assert!(!is_relativistic_basis("def2-SVP"));
        assert!(is_ecp_basis("LANL2DZ"));
        assert!(is_ecp_basis("cc-pVTZ-PP"));
        assert!(!is_ecp_basis("6-31G*"));
    }

    #[test]
    fn test_heavy_element_scan() {
        let light = vec![Atom::new("C", 0.0, 0.0, 0.0), Atom::new("Cl", 1.0, 0.0, 0.0)];
        assert!(!has_heavy_elements(&light));
        let heavy = vec![Atom::new("C", 0.0, 0.0, 0.0), Atom::new("Br", 1.9, 0.0, 0.0)];
        assert!(has_heavy_elements(&heavy));
    }

    #[test]
    fn test_boolish() {
        assert!(boolish(&json!(true)));
        assert!(!boolish(&json!(false)));
        assert!(boolish(&json!(2)));
        assert!(!boolish(&json!(0)));
        assert!(boolish(&json!(0.5)));
        assert!(boolish(&json!("yes")));
        assert!(boolish(&json!("so1e")));
        assert!(!boolish(&json!("Off")));
        assert!(!boolish(&json!("")));
        assert!(!boolish(&json!(null)));
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(0.7), "0.7");
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(-0.25), "-0.25");
        assert_eq!(format_float(1e-6), "1e-06");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(0.0), "0.0");
    }

    #[test]
    fn test_format_scientific() {
        assert_eq!(format_scientific(1e-6, 1), "1.0E-06");
        assert_eq!(format_scientific(5e-7, 1), "5.0E-07");
        assert_eq!(format_scientific(1e-10, 2), "1.00E-10");
        assert_eq!(format_scientific(250.0, 1), "2.5E+02");
    }
}
