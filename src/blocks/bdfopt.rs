//! BDFOPT block: geometry optimization, Hessian and thermochemistry
//! control, constraints, scans, crossing points and NEB.
//!
//! Every feature is gated on the presence of its setting. No cross-feature
//! validation is done here (a dimer search with the built-in solver is
//! written as requested).

use crate::config::{Atom, TaskDescriptor};
use crate::geometry::Geometry;
use crate::keywords::{emit_passthrough, render_scalar, render_value, resolve, ModuleBlock, SectionExt};
use log::{debug, warn};
use serde_json::{Map, Value};

/// Built-in optimizer.
pub const DEFAULT_SOLVER: i64 = 1;
/// `IOpt` for a minimum search.
pub const IOPT_MINIMUM: i64 = 3;
/// `IOpt` for a transition state search.
pub const IOPT_TRANSITION_STATE: i64 = 10;
/// Freeze code used when a frozen atom gives none.
pub const DEFAULT_FREEZE_CODE: i64 = -1;

const PROTECTED: &[&str] = &[
    "solver",
    "iopt",
    "type",
    "hessian",
    "hess",
    "convergence",
    "trust",
    "trust_radius",
    "max_iterations",
    "maxcycle",
    "rmimag",
    "dimer",
    "qrrho",
    "thermo",
    "constraints",
    "frozen",
    "scan",
    "multistate",
    "imulti",
    "noncoupl",
    "neb",
];

const TOLERANCE_KEYWORDS: &[(&str, &str)] = &[
    ("gradient", "TolGrad"),
    ("step", "TolStep"),
    ("energy", "TolEne"),
];

const THERMO_KEYWORDS: &[(&str, &str)] = &[
    ("scale", "Scale"),
    ("temperature", "Temp"),
    ("pressure", "Press"),
    ("degeneracy", "NDeg"),
];

/// Per-call parameters of the BDFOPT block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BdfoptParams {
    /// Hessian mode that wins over `settings.geometry_optimization.hessian.mode`
    pub hessian_mode: Option<String>,
}

/// Hessian mode configured in `settings.geometry_optimization`: either
/// `hessian: {mode: ...}` or `hessian: "..."`.
pub fn configured_hessian_mode(descriptor: &TaskDescriptor) -> Option<String> {
    let config = descriptor.settings.section("geometry_optimization");
    let mode = match config.get("hessian") {
        Some(Value::Object(hessian)) => hessian.scalar(&["mode"]),
        Some(value @ Value::String(_)) => render_scalar(value),
        _ => config.scalar(&["hess"]),
    };
    mode.map(|mode| mode.trim().to_ascii_lowercase())
        .filter(|mode| !mode.is_empty())
}

/// Builds the BDFOPT block.
pub fn generate(descriptor: &TaskDescriptor, params: &BdfoptParams) -> ModuleBlock {
    let config = descriptor.settings.section("geometry_optimization");
    let hessian = config.mapping("hessian").cloned().unwrap_or_default();
    let mut block = ModuleBlock::new("BDFOPT");

    block.value("Solver", resolve(None, config.integer(&["solver"]), DEFAULT_SOLVER));
    if let Some(iopt) = optimization_target(config) {
        block.value("IOpt", iopt);
    }
    let hessian_mode = params
        .hessian_mode
        .clone()
        .or_else(|| configured_hessian_mode(descriptor));
    if let Some(mode) = hessian_mode {
        block.value("Hess", mode);
    }

    if let Some(convergence) = config.mapping("convergence") {
        for (key, keyword) in TOLERANCE_KEYWORDS {
            if let Some(value) = convergence.scalar(&[*key]) {
                block.value(keyword, value);
            }
        }
    }
    if let Some(trust) = config.scalar(&["trust", "trust_radius"]) {
        block.value("Trust", trust);
    }
    if let Some(cycles) = config.scalar(&["max_iterations", "maxcycle"]) {
        block.value("MaxCycle", cycles);
    }
    if config.flag("rmimag") {
        block.keyword("RmImag");
    }
    if config.flag("dimer") {
        block.keyword("Dimer");
    }

    emit_hessian_options(&mut block, &hessian);
    if config.flag("qrrho") {
        block.keyword("QRRHO");
    }
    if let Some(thermo) = config.mapping("thermo") {
        for (key, keyword) in THERMO_KEYWORDS {
            if let Some(value) = thermo.scalar(&[*key]) {
                block.value(keyword, value);
            }
        }
    }

    if let Some(constraints) = config.get("constraints") {
        emit_counted(&mut block, "Constraint", &as_items(constraints), constraint_line);
    }
    if let Some(frozen) = config.get("frozen") {
        emit_counted(&mut block, "Frozen", &as_items(frozen), frozen_line);
    }
    if let Some(scan) = config.get("scan") {
        emit_counted(&mut block, "Scan", &as_items(scan), scan_line);
    }
    if let Some(states) = config.get("multistate").and_then(multistate_line) {
        block.value("Multistate", states);
    }
    if let Some(imulti) = config.get("imulti").and_then(crossing_kind) {
        block.value("IMulti", imulti);
    }
    if config.flag("noncoupl") {
        block.keyword("NonCoupl");
    }
    if let Some(neb) = config.mapping("neb") {
        emit_neb(&mut block, neb, descriptor);
    }

    emit_passthrough(&mut block, config, PROTECTED);
    block
}

/// Explicit `iopt`, else the `type` of stationary point searched for.
fn optimization_target(config: &Map<String, Value>) -> Option<i64> {
    if let Some(iopt) = config.integer(&["iopt"]) {
        return Some(iopt);
    }
    let target = config.scalar(&["type"])?.trim().to_ascii_lowercase();
    match target.as_str() {
        "minimum" | "min" => Some(IOPT_MINIMUM),
        "transition_state" | "ts" => Some(IOPT_TRANSITION_STATE),
        other => {
            warn!("unknown optimization type '{}', IOpt left to program default", other);
            None
        }
    }
}

fn emit_hessian_options(block: &mut ModuleBlock, hessian: &Map<String, Value>) {
    if hessian.flag("o1numhess") {
        block.keyword("O1NumHess");
        if let Some(ncore) = hessian.scalar(&["ncore"]) {
            block.value("NCoreHess", ncore);
        }
    }
    if hessian.flag("parallel") || hessian.flag("parhess") {
        block.keyword("ParHess");
    }
    if let Some(every) = hessian.integer(&["recalc"]).filter(|n| *n > 0) {
        block.value("RecalcHess", every);
    }
    if hessian.flag("read") {
        block.keyword("ReadHess");
    }
    if hessian.flag("restart") {
        block.keyword("RestartHess");
    }
}

/// A single mapping is treated as a one-item list.
fn as_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null | Value::Bool(false) => Vec::new(),
        other => vec![other],
    }
}

/// Writes `keyword`, the item count, then one line per item. Items that do
/// not render are skipped and not counted.
fn emit_counted(
    block: &mut ModuleBlock,
    keyword: &str,
    items: &[&Value],
    line: fn(&Value) -> Option<String>,
) {
    let lines: Vec<String> = items.iter().filter_map(|item| line(item)).collect();
    if lines.len() < items.len() {
        warn!(
            "${}: {} of {} {} entries could not be read and were skipped",
            block.name(),
            items.len() - lines.len(),
            items.len(),
            keyword
        );
    }
    if lines.is_empty() {
        return;
    }
    block.value(keyword, lines.len());
    for line in lines {
        block.value_line(line);
    }
}

/// Atom indices as a space-joined string from a list, a number or a string.
fn atom_list(value: &Value) -> Option<String> {
    render_value(value).filter(|atoms| !atoms.trim().is_empty())
}

/// `[1, 2]`, `"1 2 3"` or `{atoms: [...], value: x}` as ` atoms [value]`.
fn constraint_line(item: &Value) -> Option<String> {
    match item {
        Value::Object(constraint) => {
            let atoms = atom_list(constraint.first_of(&["atoms"])?)?;
            Some(match constraint.scalar(&["value", "target"]) {
                Some(value) => format!("{} {}", atoms, value),
                None => atoms,
            })
        }
        other => atom_list(other),
    }
}

/// `3`, `[3, -2]` or `{atom: 3, code: -2}` as ` atom code`.
fn frozen_line(item: &Value) -> Option<String> {
    let (atom, code) = match item {
        Value::Object(frozen) => (
            frozen.scalar(&["atom", "index"])?,
            frozen.integer(&["code", "type"]),
        ),
        Value::Array(pair) => (
            pair.first().and_then(render_scalar)?,
            pair.get(1).and_then(Value::as_i64),
        ),
        other => (render_scalar(other)?, None),
    };
    Some(format!("{} {}", atom, code.unwrap_or(DEFAULT_FREEZE_CODE)))
}

/// Range form ` atoms start end interval` or scattered form
/// ` atoms P v1 v2 ...`.
fn scan_line(item: &Value) -> Option<String> {
    let scan = item.as_object()?;
    let atoms = atom_list(scan.first_of(&["atoms"])?)?;
    if let Some(points) = scan.first_of(&["points"]).and_then(render_value) {
        return Some(format!("{} P {}", atoms, points));
    }
    let start = scan.scalar(&["start"])?;
    let end = scan.scalar(&["end"])?;
    let interval = scan.scalar(&["interval", "step"])?;
    Some(format!("{} {} {} {}", atoms, start, end, interval))
}

/// ` n`, or ` nSOC soc` when a coupling value is given.
fn multistate_line(value: &Value) -> Option<String> {
    match value {
        Value::Object(states) => {
            let count = states.scalar(&["nstates", "states", "n"])?;
            Some(match states.scalar(&["soc"]) {
                Some(soc) => format!("{}SOC {}", count, soc),
                None => count,
            })
        }
        other => render_scalar(other),
    }
}

/// `mecp` is 1, `ci` is 2, numbers are used as given.
fn crossing_kind(value: &Value) -> Option<String> {
    match value {
        Value::String(kind) => match kind.trim().to_ascii_lowercase().as_str() {
            "mecp" => Some("1".to_string()),
            "ci" | "meci" => Some("2".to_string()),
            _ => {
                warn!("unknown imulti value '{}'", kind);
                None
            }
        },
        other => render_scalar(other),
    }
}

fn emit_neb(block: &mut ModuleBlock, neb: &Map<String, Value>, descriptor: &TaskDescriptor) {
    let Some(images) = neb.scalar(&["nimages", "images"]) else {
        warn!("NEB settings without an image count are ignored");
        return;
    };
    block.value("NEB", images);
    if neb.flag("climbing") {
        block.keyword("CINEB");
    }

    let product = match neb.get("geometry2") {
        Some(value) => match serde_json::from_value::<Vec<Atom>>(value.clone()) {
            Ok(atoms) => atoms,
            Err(e) => {
                warn!("NEB geometry2 could not be read: {}", e);
                return;
            }
        },
        None => return,
    };
    debug!("NEB end point with {} atoms", product.len());
    let geometry = Geometry::from_atoms(&product, descriptor.molecule.units);
    block.keyword("Geometry2");
    for line in geometry.format_lines() {
        block.raw(line);
    }
    block.raw("End Geometry2");
}
