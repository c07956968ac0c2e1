//! SCF block: reference method, charge/spin, functional, convergence,
//! occupation and implicit solvation.

use crate::config::TaskDescriptor;
use crate::error::CompileError;
use crate::keywords::{emit_passthrough, render_value, ModuleBlock, SectionExt};
use crate::normalize::{boolish, derive_scf_method, format_scientific, normalize_functional};
use log::debug;
use serde_json::{Map, Value};

/// Energy convergence threshold the target program uses when none is given.
pub const DEFAULT_THRENE: f64 = 1e-8;

const PROTECTED: &[&str] = &[
    "charge",
    "spin",
    "convergence",
    "occupied",
    "solvent",
    "dft",
    "functional",
    "molden",
    "threne",
    "spin_adapted",
];

/// Solvent model names and the `Solmodel` value they select.
const SOLVENT_MODELS: &[(&str, &str)] = &[
    ("pcm", "iefpcm"),
    ("iefpcm", "iefpcm"),
    ("cpcm", "cpcm"),
    ("cosmo", "cosmo"),
    ("ddcosmo", "ddcosmo"),
    ("ssvpe", "ssvpe"),
    ("smd", "smd"),
];

const CAVITY_KEYWORDS: &[(&str, &str)] = &[
    ("type", "Cavity"),
    ("radius_type", "RadiusType"),
    ("scale", "VdWScale"),
];

const SMD_KEYWORDS: &[(&str, &str)] = &[
    ("dielectric", "Dielectric"),
    ("optical_dielectric", "OpticalDielectric"),
    ("acidity", "Acidity"),
    ("basicity", "Basicity"),
    ("surface_tension", "SurfaceTensionAtInterface"),
    ("aromaticity", "CarbonAromaticity"),
    ("halogenicity", "ElectronegativeHalogenicity"),
];

/// Non-electrostatic terms in output order.
const NON_ES_TERMS: &[(&str, &str)] = &[
    ("cavitation", "cav"),
    ("dispersion", "disp"),
    ("repulsion", "rep"),
];

/// Builds the SCF block.
///
/// # Errors
///
/// - [`CompileError::MissingField`] for a missing charge, multiplicity, or
///   a DFT method without a functional
/// - [`CompileError::InvalidMultiplicity`] / [`CompileError::UnsupportedMethod`]
///   from method derivation
pub fn generate(descriptor: &TaskDescriptor) -> Result<ModuleBlock, CompileError> {
    let scf = descriptor.settings.section("scf");
    let molecule = &descriptor.molecule;
    let charge = molecule.charge.ok_or(CompileError::MissingField("molecule.charge"))?;
    let multiplicity = molecule
        .multiplicity
        .ok_or(CompileError::MissingField("molecule.multiplicity"))?;

    let functional = descriptor
        .method
        .functional
        .as_ref()
        .map(normalize_functional)
        .filter(|f| !f.is_empty());
    let spin_adapted = descriptor
        .method
        .spin_adapted
        .unwrap_or_else(|| scf.flag("spin_adapted"));
    let method = derive_scf_method(
        &descriptor.method.method_type,
        multiplicity,
        functional.as_deref(),
        spin_adapted,
    )?;
    debug!("SCF reference: {}", method);

    let mut block = ModuleBlock::new("SCF");
    block.keyword(method.as_str());
    block.value("Charge", charge);
    block.value("Spin", multiplicity);

    if method.is_kohn_sham() {
        let functional = functional.ok_or(CompileError::MissingField("method.functional"))?;
        block.value("DFT", functional);
    }

    if let Some(threshold) = energy_threshold(scf) {
        if !is_default_threshold(threshold) {
            block.value("THRENE", format_scientific(threshold, 1));
        }
    }

    if let Some(occupied) = scf.first_of(&["occupied"]).and_then(render_value) {
        block.value("Occupied", occupied);
    }

    if let Some(solvent) = scf.get("solvent") {
        emit_solvent(&mut block, solvent);
    }

    emit_passthrough(&mut block, scf, PROTECTED);
    block.keyword("Molden");
    Ok(block)
}

/// Reads `convergence` (a number, or a mapping with an `energy` entry),
/// falling back to `threne`.
fn energy_threshold(scf: &Map<String, Value>) -> Option<f64> {
    let from_convergence = match scf.get("convergence") {
        Some(Value::Object(convergence)) => convergence.number(&["energy"]),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    from_convergence.or_else(|| scf.number(&["threne"]))
}

fn is_default_threshold(value: f64) -> bool {
    (value - DEFAULT_THRENE).abs() <= DEFAULT_THRENE * 1e-9
}

/// Maps a model name to its `Solmodel` value; unknown names pass through
/// lower-cased.
pub fn solvent_model(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    SOLVENT_MODELS
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, model)| model.to_string())
        .unwrap_or(lower)
}

fn emit_solvent(block: &mut ModuleBlock, solvent: &Value) {
    let settings = match solvent {
        Value::String(name) if boolish(solvent) => {
            block.value("Solvent", name.trim());
            return;
        }
        Value::Object(settings) => settings,
        _ => return,
    };

    if let Some(name) = settings.scalar(&["name", "solvent"]) {
        block.value("Solvent", name);
    }
    if let Some(model) = settings.scalar(&["model", "solmodel"]) {
        block.value("Solmodel", solvent_model(&model));
    }
    if let Some(cavity) = settings.mapping("cavity") {
        for (key, keyword) in CAVITY_KEYWORDS {
            if let Some(value) = cavity.scalar(&[*key]) {
                block.value(keyword, value);
            }
        }
    }
    if let Some(smd) = settings.mapping("smd") {
        for (key, keyword) in SMD_KEYWORDS {
            if let Some(value) = smd.scalar(&[*key]) {
                block.value(keyword, value);
            }
        }
    }
    if let Some(terms) = non_electrostatic_terms(settings.get("nonelectrostatic")) {
        block.value("NonES", terms);
    }
}

/// `true` selects every term; a mapping selects the truthy ones.
fn non_electrostatic_terms(value: Option<&Value>) -> Option<String> {
    let selected: Vec<&str> = match value? {
        Value::Object(terms) => NON_ES_TERMS
            .iter()
            .filter(|(key, _)| terms.flag(key))
            .map(|(_, term)| *term)
            .collect(),
        other if boolish(other) => NON_ES_TERMS.iter().map(|(_, term)| *term).collect(),
        _ => Vec::new(),
    };
    if selected.is_empty() {
        None
    } else {
        Some(selected.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::test_support::descriptor;
    use serde_json::json;

    fn water(method: Value, multiplicity: i64, scf: Value) -> TaskDescriptor {
        descriptor(json!({
            "task": {"type": "energy"},
            "molecule": {"charge": 0, "multiplicity": multiplicity,
                         "coordinates": [["O", 0, 0, 0], ["H", 0, 0.76, 0.59], ["H", 0, -0.76, 0.59]]},
            "method": method,
            "settings": {"scf": scf}
        }))
    }

    #[test]
    fn test_closed_shell_dft() {
        let d = water(json!({"type": "dft", "functional": "B3LYP", "basis": "cc-pvdz"}), 1, json!({}));
        assert_eq!(
            generate(&d).unwrap().render(),
            "$SCF\nRKS\nCharge\n 0\nSpin\n 1\nDFT\n B3LYP\nMolden\n$END"
        );
    }

    #[test]
    fn test_open_shell_and_spin_adapted() {
        let d = water(json!({"type": "hf", "basis": "cc-pvdz"}), 3, json!({}));
        assert_eq!(generate(&d).unwrap().lines()[0], "UHF");

        let d = water(json!({"type": "hf", "basis": "cc-pvdz"}), 3, json!({"spin_adapted": true}));
        let block = generate(&d).unwrap();
        assert_eq!(block.lines()[0], "ROHF");
        assert!(!block.has_keyword("Spin_adapted"));

        let d = water(
            json!({"type": "dft", "functional": "PBE0", "basis": "cc-pvdz", "spin_adapted": true}),
            2,
            json!({}),
        );
        assert_eq!(generate(&d).unwrap().lines()[0], "ROKS");
    }

    #[test]
    fn test_missing_required_fields() {
        let mut d = water(json!({"type": "hf", "basis": "sto-3g"}), 1, json!({}));
        d.molecule.charge = None;
        assert_eq!(generate(&d).unwrap_err(), CompileError::MissingField("molecule.charge"));

        let mut d = water(json!({"type": "hf", "basis": "sto-3g"}), 1, json!({}));
        d.molecule.multiplicity = None;
        assert_eq!(
            generate(&d).unwrap_err(),
            CompileError::MissingField("molecule.multiplicity")
        );

        let d = water(json!({"type": "dft", "basis": "sto-3g"}), 1, json!({}));
        assert_eq!(generate(&d).unwrap_err(), CompileError::MissingField("method.functional"));

        let d = water(json!({"type": "ccsd", "basis": "sto-3g"}), 1, json!({}));
        assert!(matches!(generate(&d), Err(CompileError::UnsupportedMethod { .. })));
    }

    #[test]
    fn test_threne_only_when_not_default() {
        let hf = json!({"type": "hf", "basis": "sto-3g"});
        let block = generate(&water(hf.clone(), 1, json!({}))).unwrap();
        assert!(!block.has_keyword("THRENE"));

        let block = generate(&water(hf.clone(), 1, json!({"convergence": 1e-8}))).unwrap();
        assert!(!block.has_keyword("THRENE"));

        let block = generate(&water(hf.clone(), 1, json!({"convergence": 1e-6}))).unwrap();
        assert!(block.lines().windows(2).any(|w| w[0] == "THRENE" && w[1] == " 1.0E-06"));

        let block = generate(&water(hf.clone(), 1, json!({"convergence": {"energy": 5e-7}}))).unwrap();
        assert!(block.lines().windows(2).any(|w| w[0] == "THRENE" && w[1] == " 5.0E-07"));

        let block = generate(&water(hf, 1, json!({"Convergence": 1e-6}))).unwrap();
        assert!(block.lines().windows(2).any(|w| w[0] == "THRENE" && w[1] == " 1.0E-06"));
        assert!(!block.has_keyword("Convergence"));
    }

    #[test]
    fn test_occupied_and_passthrough() {
        let d = water(
            json!({"type": "hf", "basis": "sto-3g"}),
            1,
            json!({"occupied": [3, 0, 1, 1], "maxiter": 200, "charge": 5, "molden": false}),
        );
        assert_eq!(
            generate(&d).unwrap().lines(),
            &["RHF", "Charge", " 0", "Spin", " 1", "Occupied", " 3 0 1 1", "Maxiter", " 200", "Molden"]
        );
    }

    #[test]
    fn test_solvent_mapping() {
        let d = water(
            json!({"type": "hf", "basis": "sto-3g"}),
            1,
            json!({"solvent": {
                "name": "water",
                "model": "PCM",
                "cavity": {"type": "swig", "radius_type": "UFF", "scale": 1.1},
                "smd": {"dielectric": 78.4, "acidity": 0.82},
                "nonelectrostatic": {"cavitation": true, "repulsion": true}
            }}),
        );
        let block = generate(&d).unwrap();
        let lines = block.lines();
        let start = lines.iter().position(|l| l == "Solvent").unwrap();
        assert_eq!(
            &lines[start..],
            &[
                "Solvent", " water", "Solmodel", " iefpcm", "Cavity", " swig", "RadiusType", " UFF",
                "VdWScale", " 1.1", "Dielectric", " 78.4", "Acidity", " 0.82", "NonES", " cav rep",
                "Molden"
            ]
        );
    }

    #[test]
    fn test_solvent_name_only() {
        let d = water(json!({"type": "hf", "basis": "sto-3g"}), 1, json!({"solvent": "toluene"}));
        let block = generate(&d).unwrap();
        assert!(block.lines().windows(2).any(|w| w[0] == "Solvent" && w[1] == " toluene"));
        assert!(!block.has_keyword("Solmodel"));
        assert_eq!(solvent_model("COSMO"), "cosmo");
        assert_eq!(solvent_model("custom"), "custom");
    }
}
