//! TDDFT block.
//!
//! Called once per excited-state branch. Each call layers its own override
//! mapping over `settings.tddft` and shares nothing with other calls.

use crate::config::TaskDescriptor;
use crate::keywords::{emit_passthrough, layered, render_value, ModuleBlock, SectionExt};
use serde_json::{Map, Value};

const PROTECTED: &[&str] = &[
    "isf",
    "nstates",
    "iroot",
    "tda",
    "itda",
    "idiag",
    "iwindow",
    "istore",
    "crit_vec",
    "crit_e",
    "print_level",
    "iprint",
    "nonequilibrium",
    "equilibrium",
    "singlet",
    "triplet",
    "soc",
    "target_root",
];

/// Per-call parameters of one TDDFT block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TddftParams {
    /// Spin-flip selector; wins over `settings.tddft.isf`
    pub isf: Option<i64>,
    /// Storage slot for the excitations; wins over `settings.tddft.istore`
    pub istore: Option<i64>,
    /// Mapping layered over `settings.tddft` (override wins)
    pub overrides: Map<String, Value>,
}

impl TddftParams {
    /// Parameters for a spin branch: `isf`, `istore` and that branch's
    /// override mapping.
    pub fn branch(isf: i64, istore: Option<i64>, overrides: Map<String, Value>) -> Self {
        Self {
            isf: Some(isf),
            istore,
            overrides,
        }
    }
}

/// Builds one TDDFT block.
pub fn generate(descriptor: &TaskDescriptor, params: &TddftParams) -> ModuleBlock {
    let config = layered(descriptor.settings.section("tddft"), &params.overrides);
    let mut block = ModuleBlock::new("TDDFT");

    if let Some(isf) = params.isf.or_else(|| config.integer(&["isf"])) {
        block.value("Isf", isf);
    }
    if let Some(roots) = config.first_of(&["nstates", "iroot"]).and_then(render_value) {
        block.value("Iroot", roots);
    }
    if config.flag("tda") {
        block.value("Itda", 1);
    } else if let Some(itda) = config.scalar(&["itda"]) {
        block.value("Itda", itda);
    }
    if let Some(idiag) = config.scalar(&["idiag"]) {
        block.value("Idiag", idiag);
    }
    if let Some(window) = config.get("iwindow").and_then(energy_window) {
        block.value("Iwindow", window);
    }
    if let Some(istore) = params.istore.or_else(|| config.integer(&["istore"])) {
        block.value("Istore", istore);
    }
    if let Some(crit) = config.scalar(&["crit_vec"]) {
        block.value("Crit_vec", crit);
    }
    if let Some(crit) = config.scalar(&["crit_e"]) {
        block.value("Crit_e", crit);
    }
    if let Some(level) = config.scalar(&["print_level", "iprint"]) {
        block.value("Iprint", level);
    }
    if config.flag("nonequilibrium") {
        block.keyword("SolNeqLR");
    }
    if config.flag("equilibrium") {
        block.keyword("SolEqLR");
    }

    emit_passthrough(&mut block, &config, PROTECTED);
    block
}

/// `{min, max, unit}` or a `[min, max]` pair as `min max [unit]`.
fn energy_window(value: &Value) -> Option<String> {
    match value {
        Value::Object(window) => {
            let min = window.scalar(&["min"])?;
            let max = window.scalar(&["max"])?;
            Some(match window.scalar(&["unit"]) {
                Some(unit) => format!("{} {} {}", min, max, unit),
                None => format!("{} {}", min, max),
            })
        }
        Value::Array(items) if items.len() == 2 => render_value(value),
        Value::String(_) => render_value(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::test_support::descriptor;
    use serde_json::json;

    fn with_tddft(tddft: Value) -> TaskDescriptor {
        descriptor(json!({
            "task": {"type": "tddft"},
            "molecule": {"charge": 0, "multiplicity": 1, "coordinates": [["H", 0, 0, 0], ["F", 0, 0, 0.9]]},
            "method": {"type": "dft", "functional": "PBE0", "basis": "def2-SVP"},
            "settings": {"tddft": tddft}
        }))
    }

    #[test]
    fn test_full_keyword_set() {
        let d = with_tddft(json!({
            "nstates": 10,
            "tda": true,
            "idiag": 2,
            "iwindow": {"min": 1.0, "max": 8.5, "unit": "ev"},
            "crit_vec": 1e-5,
            "crit_e": 1e-7,
            "print_level": 3,
            "equilibrium": true,
            "target_root": 2
        }));
        let block = generate(&d, &TddftParams::default());
        assert_eq!(
            block.lines(),
            &[
                "Iroot", " 10", "Itda", " 1", "Idiag", " 2", "Iwindow", " 1.0 8.5 ev", "Crit_vec",
                " 1e-05", "Crit_e", " 1e-07", "Iprint", " 3", "SolEqLR"
            ]
        );
    }

    #[test]
    fn test_explicit_params_override_config() {
        let d = with_tddft(json!({"isf": 1, "istore": 4, "iroot": 5}));
        let block = generate(&d, &TddftParams::branch(0, Some(1), Map::new()));
        assert_eq!(block.lines(), &["Isf", " 0", "Iroot", " 5", "Istore", " 1"]);

        let block = generate(&d, &TddftParams::default());
        assert_eq!(block.lines(), &["Isf", " 1", "Iroot", " 5", "Istore", " 4"]);
    }

    #[test]
    fn test_branch_overrides_are_independent() {
        let d = with_tddft(json!({
            "nstates": 5,
            "singlet": {"nstates": 8},
            "triplet": {"nstates": 3, "tda": true}
        }));
        let singlet = d.settings.section("tddft").mapping("singlet").cloned().unwrap();
        let triplet = d.settings.section("tddft").mapping("triplet").cloned().unwrap();

        let first = generate(&d, &TddftParams::branch(0, None, singlet));
        let second = generate(&d, &TddftParams::branch(1, None, triplet));
        assert_eq!(first.lines(), &["Isf", " 0", "Iroot", " 8"]);
        assert_eq!(second.lines(), &["Isf", " 1", "Iroot", " 3", "Itda", " 1"]);
        assert_eq!(d.settings.section("tddft")["nstates"], json!(5));
    }

    #[test]
    fn test_mixed_case_keys() {
        let d = with_tddft(json!({"NStates": 8, "ITDA": 0, "singlet": {"NSTATES": 4}}));
        let block = generate(&d, &TddftParams::default());
        assert_eq!(block.lines(), &["Iroot", " 8", "Itda", " 0"]);

        let singlet = d.settings.section("tddft").mapping("singlet").cloned().unwrap();
        let block = generate(&d, &TddftParams::branch(0, None, singlet));
        assert_eq!(block.lines(), &["Isf", " 0", "Iroot", " 4", "Itda", " 0"]);
    }

    #[test]
    fn test_explicit_itda() {
        let block = generate(&with_tddft(json!({"itda": 1})), &TddftParams::default());
        assert_eq!(block.lines(), &["Itda", " 1"]);

        let block = generate(&with_tddft(json!({"tda": false, "itda": 0})), &TddftParams::default());
        assert_eq!(block.lines(), &["Itda", " 0"]);

        let block = generate(&with_tddft(json!({"tda": true, "itda": 0})), &TddftParams::default());
        assert_eq!(block.lines(), &["Itda", " 1"]);
    }

    #[test]
    fn test_window_forms_and_passthrough() {
        let d = with_tddft(json!({"iwindow": [2, 6], "nonequilibrium": true, "nprt": 4, "soc": {"enabled": false}}));
        let block = generate(&d, &TddftParams::default());
        assert_eq!(block.lines(), &["Iwindow", " 2 6", "SolNeqLR", "Nprt", " 4"]);

        assert_eq!(energy_window(&json!([1, 2, 3])), None);
        assert_eq!(energy_window(&json!({"min": 1})), None);
    }
}
