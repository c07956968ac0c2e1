//! RESP block: gradients and Hessians.

use crate::config::TaskDescriptor;
use crate::keywords::{emit_passthrough, render_value, resolve, ModuleBlock, SectionExt};
use serde_json::{Map, Value};

/// Derivative order when nothing else is given (gradient).
pub const DEFAULT_NORDER: i64 = 1;
/// Response method when nothing else is given (ground state).
pub const DEFAULT_METHOD: i64 = 1;
/// Response method for excited states.
pub const EXCITED_METHOD: i64 = 2;

const PROTECTED: &[&str] = &[
    "geom", "norder", "method", "nfiles", "iroot", "solvent", "soleqlr", "solneqlr", "soleqss",
    "solneqss",
];

/// `(nested key, flat key, keyword)` for the solvent correction toggles.
const SOLVENT_TOGGLES: &[(&str, &str, &str)] = &[
    ("eq_lr", "soleqlr", "SolEqLR"),
    ("neq_lr", "solneqlr", "SolNeqLR"),
    ("eq_ss", "soleqss", "SolEqSS"),
    ("neq_ss", "solneqss", "SolNeqSS"),
];

/// Values the pipeline derives from the task. `None` falls back to
/// `settings.resp`, then to the defaults above.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RespParams {
    /// Derivative order: 1 for gradients, 2 for Hessians
    pub norder: Option<i64>,
    /// 1 for a ground-state reference, 2 for an excited state
    pub method: Option<i64>,
    /// TDDFT result file to read the excited state from
    pub nfiles: Option<i64>,
    /// Excited state(s) to differentiate
    pub iroot: Option<Value>,
}

/// Builds the RESP block.
pub fn generate(descriptor: &TaskDescriptor, params: &RespParams) -> ModuleBlock {
    let config = descriptor.settings.section("resp");
    let mut block = ModuleBlock::new("RESP");

    block.keyword("Geom");
    block.value(
        "Norder",
        resolve(params.norder, config.integer(&["norder"]), DEFAULT_NORDER),
    );
    block.value(
        "Method",
        resolve(params.method, config.integer(&["method"]), DEFAULT_METHOD),
    );
    if let Some(nfiles) = params.nfiles.or_else(|| config.integer(&["nfiles"])) {
        block.value("Nfiles", nfiles);
    }
    let iroot = params
        .iroot
        .as_ref()
        .or_else(|| config.first_of(&["iroot"]))
        .and_then(render_value);
    if let Some(iroot) = iroot {
        block.value("Iroot", iroot);
    }

    let solvent = config.mapping("solvent").cloned().unwrap_or_else(Map::new);
    for (nested, flat, keyword) in SOLVENT_TOGGLES {
        if solvent.flag(nested) || config.flag(flat) {
            block.keyword(keyword);
        }
    }

    emit_passthrough(&mut block, config, PROTECTED);
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::test_support::descriptor;
    use serde_json::json;

    fn with_resp(resp: Value) -> TaskDescriptor {
        descriptor(json!({
            "task": {"type": "optimize"},
            "molecule": {"charge": 0, "multiplicity": 1, "coordinates": [["H", 0, 0, 0], ["H", 0, 0, 0.74]]},
            "method": {"type": "hf", "basis": "sto-3g"},
            "settings": {"resp": resp}
        }))
    }

    #[test]
    fn test_defaults() {
        let block = generate(&with_resp(json!({})), &RespParams::default());
        assert_eq!(block.render(), "$RESP\nGeom\nNorder\n 1\nMethod\n 1\n$END");
    }

    #[test]
    fn test_precedence_explicit_config_default() {
        let d = with_resp(json!({"norder": 2, "method": 2, "nfiles": 3}));
        let params = RespParams {
            norder: Some(1),
            ..RespParams::default()
        };
        assert_eq!(
            generate(&d, &params).lines(),
            &["Geom", "Norder", " 1", "Method", " 2", "Nfiles", " 3"]
        );
    }

    #[test]
    fn test_excited_state_roots() {
        let params = RespParams {
            norder: Some(2),
            method: Some(EXCITED_METHOD),
            nfiles: Some(1),
            iroot: Some(json!([1, 2])),
        };
        assert_eq!(
            generate(&with_resp(json!({})), &params).lines(),
            &["Geom", "Norder", " 2", "Method", " 2", "Nfiles", " 1", "Iroot", " 1 2"]
        );
    }

    #[test]
    fn test_solvent_toggles_and_passthrough() {
        let d = with_resp(json!({
            "solvent": {"eq_lr": true, "neq_ss": true},
            "solneqlr": true,
            "soleqss": false,
            "jahnteller": true
        }));
        assert_eq!(
            generate(&d, &RespParams::default()).lines(),
            &["Geom", "Norder", " 1", "Method", " 1", "SolEqLR", "SolNeqLR", "SolNeqSS", "Jahnteller"]
        );

        let d = with_resp(json!({"solvent": {"eq_ss": true}}));
        assert_eq!(
            generate(&d, &RespParams::default()).lines(),
            &["Geom", "Norder", " 1", "Method", " 1", "SolEqSS"]
        );
    }
}
