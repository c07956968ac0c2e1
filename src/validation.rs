//! Task descriptor validation.
//!
//! The compiler assumes required fields are present; a [`Validator`] checks
//! that before compilation and reports problems as [`ValidationError`]s,
//! which callers can tell apart from [`CompileError`](crate::error::CompileError)s.
//! Valid but suspicious input (unknown functional names, an electron count
//! that does not fit the multiplicity) produces warnings instead.

use crate::config::TaskDescriptor;
use crate::elements::atomic_number;
use crate::functionals::check_functional;
use log::warn;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error with user guidance.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category for programmatic handling
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
    /// Optional reference to documentation or examples
    pub reference: Option<String>,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    /// A required field is absent or empty
    MissingField,
    /// A field is present but its value is not allowed
    InvalidValue,
    /// The descriptor asks for something the tool does not support
    UnsupportedFeature,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {}", suggestion)?;
        }
        if let Some(reference) = &self.reference {
            write!(f, "\n\nFor more information: {}", reference)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Checks a descriptor before compilation.
///
/// `Ok` carries advisory warnings; `Err` means the descriptor must not be
/// compiled.
pub trait Validator {
    /// Returns the warnings for a usable descriptor, or the first error.
    fn validate(&self, descriptor: &TaskDescriptor) -> ValidationResult<Vec<String>>;
}

/// Structural checks on the descriptor model plus soft chemistry checks.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    /// Warn about functional names missing from the reference list
    pub check_functionals: bool,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self {
            check_functionals: true,
        }
    }
}

impl Validator for SchemaValidator {
    fn validate(&self, descriptor: &TaskDescriptor) -> ValidationResult<Vec<String>> {
        validate_molecule(descriptor)?;
        validate_method(descriptor)?;

        let mut warnings = Vec::new();
        if self.check_functionals {
            if let Some(functional) = &descriptor.method.functional {
                warnings.extend(check_functional(functional));
            }
        }
        warnings.extend(element_warnings(descriptor));
        warnings.extend(parity_warning(descriptor));

        for warning in &warnings {
            warn!("{}", warning);
        }
        Ok(warnings)
    }
}

fn missing_field(field: &str, suggestion: &str) -> ValidationError {
    ValidationError {
        category: ErrorCategory::MissingField,
        message: format!("Required field '{}' is missing", field),
        suggestion: Some(suggestion.to_string()),
        reference: None,
    }
}

fn validate_molecule(descriptor: &TaskDescriptor) -> ValidationResult<()> {
    let molecule = &descriptor.molecule;
    if molecule.charge.is_none() {
        return Err(missing_field(
            "molecule.charge",
            "Add 'charge: 0' (or the net charge) to the molecule section",
        ));
    }
    let multiplicity = molecule.multiplicity.ok_or_else(|| {
        missing_field(
            "molecule.multiplicity",
            "Add 'multiplicity: 1' for a closed-shell singlet, 2 for a doublet, ...",
        )
    })?;
    if multiplicity < 1 {
        return Err(ValidationError {
            category: ErrorCategory::InvalidValue,
            message: format!("Multiplicity must be at least 1, got {}", multiplicity),
            suggestion: Some("Multiplicity is 2S+1: 1 for singlets, 2 for doublets, 3 for triplets".to_string()),
            reference: None,
        });
    }
    if molecule.coordinates.is_empty() {
        return Err(missing_field(
            "molecule.coordinates",
            "List the atoms as [element, x, y, z] entries or reference a geometry file with \"@file.xyz\"",
        ));
    }
    Ok(())
}

fn validate_method(descriptor: &TaskDescriptor) -> ValidationResult<()> {
    let method = &descriptor.method;
    if method.method_type.trim().is_empty() && method.functional.is_none() {
        return Err(missing_field("method.type", "Set method.type to hf or dft"));
    }
    let has_basis = method.basis.as_deref().is_some_and(|b| !b.trim().is_empty())
        || descriptor
            .settings
            .get_path(&["compass", "basis", "block", "default"])
            .is_some();
    if !has_basis {
        return Err(missing_field(
            "method.basis",
            "Set method.basis, e.g. 'basis: def2-SVP', or settings.compass.basis.block.default",
        ));
    }
    if method.is_dft() && method.functional.is_none() {
        return Err(missing_field(
            "method.functional",
            "DFT calculations need a functional, e.g. 'functional: B3LYP'",
        ));
    }
    Ok(())
}

fn element_warnings(descriptor: &TaskDescriptor) -> Vec<String> {
    descriptor
        .molecule
        .coordinates
        .iter()
        .enumerate()
        .filter(|(_, atom)| atomic_number(&atom.element).is_none())
        .map(|(i, atom)| {
            format!(
                "atom {} has unrecognised element symbol '{}'",
                i + 1,
                atom.element
            )
        })
        .collect()
}

/// Even electron counts need odd multiplicities and vice versa.
fn parity_warning(descriptor: &TaskDescriptor) -> Option<String> {
    let molecule = &descriptor.molecule;
    let charge = molecule.charge?;
    let multiplicity = molecule.multiplicity?;
    let nuclear: i64 = molecule
        .coordinates
        .iter()
        .map(|atom| atomic_number(&atom.element).map(i64::from))
        .sum::<Option<i64>>()?;
    let electrons = nuclear - charge;
    if electrons < 0 {
        return Some(format!(
            "charge {} leaves a negative electron count ({})",
            charge, electrons
        ));
    }
    if electrons % 2 == multiplicity % 2 {
        Some(format!(
            "{} electrons cannot have multiplicity {}; check charge and multiplicity",
            electrons, multiplicity
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(molecule: serde_json::Value, method: serde_json::Value) -> TaskDescriptor {
        serde_json::from_value(json!({
            "task": {"type": "energy"},
            "molecule": molecule,
            "method": method
        }))
        .unwrap()
    }

    fn water(charge: i64, multiplicity: i64) -> serde_json::Value {
        json!({"charge": charge, "multiplicity": multiplicity,
               "coordinates": [["O", 0, 0, 0], ["H", 0, 0.76, 0.59], ["H", 0, -0.76, 0.59]]})
    }

    #[test]
    fn test_valid_descriptor_has_no_warnings() {
        let d = descriptor(water(0, 1), json!({"type": "dft", "functional": "B3LYP", "basis": "def2-SVP"}));
        assert_eq!(SchemaValidator::default().validate(&d), Ok(vec![]));
    }

    #[test]
    fn test_missing_fields() {
        let d = descriptor(
            json!({"multiplicity": 1, "coordinates": [["H", 0, 0, 0]]}),
            json!({"type": "hf", "basis": "sto-3g"}),
        );
        let err = SchemaValidator::default().validate(&d).unwrap_err();
        assert_eq!(err.category, ErrorCategory::MissingField);
        assert!(err.message.contains("molecule.charge"));
        assert!(err.to_string().contains("Suggestion:"));

        let d = descriptor(water(0, 1), json!({"type": "dft", "basis": "sto-3g"}));
        let err = SchemaValidator::default().validate(&d).unwrap_err();
        assert!(err.message.contains("method.functional"));

        let d = descriptor(water(0, 1), json!({"type": "hf"}));
        let err = SchemaValidator::default().validate(&d).unwrap_err();
        assert!(err.message.contains("method.basis"));
    }

    #[test]
    fn test_invalid_multiplicity() {
        let d = descriptor(water(0, 0), json!({"type": "hf", "basis": "sto-3g"}));
        let err = SchemaValidator::default().validate(&d).unwrap_err();
        assert_eq!(err.category, ErrorCategory::InvalidValue);
    }

    #[test]
    fn test_soft_warnings() {
        let d = descriptor(water(0, 2), json!({"type": "dft", "functional": "MyFunc", "basis": "sto-3g"}));
        let warnings = SchemaValidator::default().validate(&d).unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("MyFunc"));
        assert!(warnings[1].contains("10 electrons"));

        let quiet = SchemaValidator {
            check_functionals: false,
        };
        assert_eq!(quiet.validate(&d).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_element_skips_parity() {
        let d = descriptor(
            json!({"charge": 0, "multiplicity": 2, "coordinates": [["Xx", 0, 0, 0]]}),
            json!({"type": "hf", "basis": "sto-3g"}),
        );
        let warnings = SchemaValidator::default().validate(&d).unwrap();
        assert_eq!(warnings, vec!["atom 1 has unrecognised element symbol 'Xx'".to_string()]);
    }
}
