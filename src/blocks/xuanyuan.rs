//! XUANYUAN block: integral settings, range separation and relativistic
//! Hamiltonian selection.
//!
//! Scalar relativity (`Heff`) is switched on automatically when the molecule
//! contains an element of period 4 or later, or when a basis name carries a
//! relativistic tag, unless an ECP basis is in use. Spin-orbit coupling
//! (`Hso`) is only ever emitted on explicit request.

use super::compass::basis_spec;
use crate::config::{Functional, TaskDescriptor};
use crate::functionals::default_range_separation;
use crate::keywords::{emit_passthrough, layered, render_scalar, ModuleBlock, SectionExt};
use crate::normalize::{boolish, format_float, has_heavy_elements, is_ecp_basis, is_relativistic_basis};
use log::debug;
use serde_json::{Map, Value};

const PROTECTED: &[&str] = &["rs", "heff", "hso"];

/// Scalar relativistic Hamiltonian used when auto-detection fires.
pub const DEFAULT_HEFF: i64 = 3;
/// Spin-orbit treatment for all-electron basis sets.
pub const HSO_ALL_ELECTRON: i64 = 2;
/// Spin-orbit treatment for ECP basis sets.
pub const HSO_ECP: i64 = 10;

/// Builds the XUANYUAN block. `settings.xuanyuan` is layered over
/// `settings.atomic_orbital_integral`.
pub fn generate(descriptor: &TaskDescriptor) -> ModuleBlock {
    let settings = &descriptor.settings;
    let config = layered(
        settings.section("atomic_orbital_integral"),
        settings.section("xuanyuan"),
    );
    let ecp = basis_spec(descriptor)
        .map(|spec| spec.names().into_iter().any(is_ecp_basis))
        .unwrap_or(false);

    let mut block = ModuleBlock::new("XUANYUAN");
    if let Some(rs) = range_separation(descriptor, &config) {
        block.value("RS", rs);
    }
    if let Some(heff) = scalar_hamiltonian(descriptor, &config, ecp) {
        block.value("Heff", heff);
    }
    if let Some(hso) = spin_orbit(descriptor, &config, ecp) {
        block.value("Hso", hso);
    }
    emit_passthrough(&mut block, &config, PROTECTED);
    block
}

/// Explicit `rs` wins; otherwise the literature default for the functional.
fn range_separation(descriptor: &TaskDescriptor, config: &Map<String, Value>) -> Option<String> {
    if let Some(rs) = config.scalar(&["rs"]) {
        return Some(rs);
    }
    match &descriptor.method.functional {
        Some(Functional::Name(name)) => default_range_separation(name).map(format_float),
        _ => None,
    }
}

/// True when heavy elements or a relativistic basis call for scalar relativity.
pub fn needs_scalar_relativity(descriptor: &TaskDescriptor) -> bool {
    if has_heavy_elements(&descriptor.molecule.coordinates) {
        return true;
    }
    basis_spec(descriptor)
        .map(|spec| spec.names().into_iter().any(is_relativistic_basis))
        .unwrap_or(false)
}

fn scalar_hamiltonian(
    descriptor: &TaskDescriptor,
    config: &Map<String, Value>,
    ecp: bool,
) -> Option<String> {
    let explicit = descriptor
        .hamiltonian
        .as_ref()
        .and_then(|h| h.scalar_hamiltonian.as_ref())
        .filter(|v| !v.is_null())
        .or_else(|| config.first_of(&["heff"]));

    match explicit {
        Some(value) => explicit_heff(value),
        None if needs_scalar_relativity(descriptor) && !ecp => {
            debug!("heavy element or relativistic basis detected, enabling heff {}", DEFAULT_HEFF);
            Some(DEFAULT_HEFF.to_string())
        }
        None => None,
    }
}

/// A user-supplied heff: falsy values disable it, `true` (or a yes-like
/// word) selects the default, anything else is used verbatim.
fn explicit_heff(value: &Value) -> Option<String> {
    if !boolish(value) {
        return None;
    }
    match value {
        Value::Bool(true) => Some(DEFAULT_HEFF.to_string()),
        Value::String(s) if matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "on" | "auto") => {
            Some(DEFAULT_HEFF.to_string())
        }
        other => render_scalar(other),
    }
}

fn spin_orbit(descriptor: &TaskDescriptor, config: &Map<String, Value>, ecp: bool) -> Option<String> {
    let request = descriptor
        .hamiltonian
        .as_ref()
        .and_then(|h| h.spin_orbit_coupling.as_ref())
        .filter(|v| !v.is_null())
        .or_else(|| config.first_of(&["hso"]))?;

    if !boolish(request) {
        return None;
    }
    let explicit_level = match request {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match explicit_level {
        Some(level) if level != 1 => Some(level.to_string()),
        _ => Some(if ecp { HSO_ECP } else { HSO_ALL_ELECTRON }.to_string()),
    }
}
