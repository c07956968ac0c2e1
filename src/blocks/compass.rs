//! COMPASS block: title, basis, geometry and symmetry.

use crate::config::TaskDescriptor;
use crate::error::CompileError;
use crate::geometry::Geometry;
use crate::keywords::{emit_passthrough, render_scalar, ModuleBlock, SectionExt};
use crate::normalize::{boolish, normalize_functional, normalize_point_group};
use serde_json::{Map, Value};

/// Keys of `settings.compass` handled here rather than passed through.
/// `saorb` is listed so users cannot force SAORB past the MCSCF/RI rule.
const PROTECTED: &[&str] = &[
    "title", "basis", "symmetry", "ri_j_basis", "ri_k_basis", "ri_c_basis", "cd_ri", "saorb",
    "check", "geometry", "unit", "nosymm", "group",
];

/// RI auxiliary basis keys and the keyword each one emits.
const RI_KEYWORDS: &[(&str, &str)] = &[
    ("ri_j_basis", "RI-J"),
    ("ri_k_basis", "RI-K"),
    ("ri_c_basis", "RI-C"),
];

/// Builds the COMPASS block.
///
/// # Errors
///
/// [`CompileError::MissingField`] when no basis is given anywhere or the
/// molecule has no atoms.
pub fn generate(descriptor: &TaskDescriptor) -> Result<ModuleBlock, CompileError> {
    let compass = descriptor.settings.section("compass");
    let mut block = ModuleBlock::new("COMPASS");

    block.value("Title", title(descriptor));
    emit_basis(&mut block, descriptor)?;

    if descriptor.molecule.coordinates.is_empty() {
        return Err(CompileError::MissingField("molecule.coordinates"));
    }
    let geometry = Geometry::from_atoms(&descriptor.molecule.coordinates, descriptor.molecule.units);
    block.keyword("Geometry");
    for line in geometry.format_lines() {
        block.raw(line);
    }
    block.raw("End Geometry");

    emit_symmetry(&mut block, compass);

    if uses_mcscf(descriptor) && !uses_ri(descriptor) {
        block.keyword("SAORB");
    }
    for (key, keyword) in RI_KEYWORDS {
        if let Some(basis) = ri_setting(descriptor, key).and_then(render_scalar) {
            block.value(keyword, basis);
        }
    }

    emit_passthrough(&mut block, compass, PROTECTED);
    block.keyword("Check");
    Ok(block)
}

/// Title line: the task description, or a default built from the method.
/// The value must stay on one line, so runs of whitespace collapse to a space.
fn title(descriptor: &TaskDescriptor) -> String {
    if let Some(description) = descriptor.task.description.as_deref().map(single_line) {
        if !description.is_empty() {
            return description;
        }
    }
    let kind = descriptor.method.method_type.trim().to_ascii_uppercase();
    let method = match &descriptor.method.functional {
        Some(functional) if descriptor.method.is_dft() => {
            format!("{}/{}", kind, normalize_functional(functional))
        }
        _ => kind,
    };
    match descriptor.molecule.name.as_deref().map(single_line) {
        Some(name) if !name.is_empty() => format!("{}: {} calculation", name, method),
        _ => format!("{} calculation", method),
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Basis specification resolved from `method.basis` and
/// `settings.compass.basis.block`.
#[derive(Debug, Clone, PartialEq)]
pub enum BasisSpec {
    /// One basis for all atoms
    Single(String),
    /// Default basis, per-element overrides and raw inline basis text
    Block {
        /// Basis for elements without an override
        default: String,
        /// `(element, basis)` overrides in input order
        overrides: Vec<(String, String)>,
        /// Raw basis lines copied verbatim
        inline: Vec<String>,
    },
}

impl BasisSpec {
    /// Every basis set name mentioned, for tag detection.
    pub fn names(&self) -> Vec<&str> {
        match self {
            BasisSpec::Single(name) => vec![name.as_str()],
            BasisSpec::Block {
                default, overrides, ..
            } => std::iter::once(default.as_str())
                .chain(overrides.iter().map(|(_, basis)| basis.as_str()))
                .collect(),
        }
    }
}

/// Resolves the basis. The block form wins when both forms are present.
pub fn basis_spec(descriptor: &TaskDescriptor) -> Option<BasisSpec> {
    let method_basis = descriptor
        .method
        .basis
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string);

    let block = descriptor
        .settings
        .get_path(&["compass", "basis", "block"])
        .and_then(Value::as_object);

    match block {
        Some(block) => {
            let default = block.scalar(&["default"]).or(method_basis)?;
            Some(BasisSpec::Block {
                default,
                overrides: element_overrides(block),
                inline: inline_lines(block.get("inline")),
            })
        }
        None => method_basis.map(BasisSpec::Single),
    }
}

fn element_overrides(block: &Map<String, Value>) -> Vec<(String, String)> {
    match block.get("elements") {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(el, basis)| render_scalar(basis).map(|b| (el.clone(), b)))
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|item| Some((item.scalar(&["element"])?, item.scalar(&["basis"])?)))
            .collect(),
        _ => Vec::new(),
    }
}

fn inline_lines(inline: Option<&Value>) -> Vec<String> {
    match inline {
        Some(Value::String(text)) => text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => items.iter().filter_map(render_scalar).collect(),
        _ => Vec::new(),
    }
}

fn emit_basis(block: &mut ModuleBlock, descriptor: &TaskDescriptor) -> Result<(), CompileError> {
    match basis_spec(descriptor).ok_or(CompileError::MissingField("method.basis"))? {
        BasisSpec::Single(name) => {
            block.value("Basis", name);
        }
        BasisSpec::Block {
            default,
            overrides,
            inline,
        } => {
            block.value("Basis-block", default);
            for (element, basis) in overrides {
                block.value_line(format!("{} = {}", element, basis));
            }
            for line in inline {
                block.raw(line);
            }
            block.raw("End Basis");
        }
    }
    Ok(())
}

/// `NoSymm` wins over `Group`; unrecognised group names are dropped silently.
fn emit_symmetry(block: &mut ModuleBlock, compass: &Map<String, Value>) {
    let (nosymm, group) = match compass.get("symmetry") {
        Some(Value::String(name)) => (compass.flag("nosymm"), Some(name.clone())),
        Some(Value::Object(symmetry)) => (
            symmetry.flag("nosymm") || compass.flag("nosymm"),
            symmetry.scalar(&["group"]).or_else(|| compass.scalar(&["group"])),
        ),
        _ => (compass.flag("nosymm"), compass.scalar(&["group"])),
    };

    if nosymm {
        block.keyword("NoSymm");
    } else if let Some(group) = group.as_deref().and_then(normalize_point_group) {
        block.value("Group", group);
    }
}

fn uses_mcscf(descriptor: &TaskDescriptor) -> bool {
    descriptor.method.kind() == "mcscf"
        || descriptor.settings.has_section("mcscf")
        || descriptor.settings.has_section("traint")
}

fn ri_setting<'a>(descriptor: &'a TaskDescriptor, key: &str) -> Option<&'a Value> {
    descriptor
        .settings
        .section("compass")
        .first_of(&[key])
        .or_else(|| descriptor.method.extra.first_of(&[key]))
}

fn uses_ri(descriptor: &TaskDescriptor) -> bool {
    ["ri_j_basis", "ri_k_basis", "ri_c_basis", "cd_ri"]
        .iter()
        .any(|key| ri_setting(descriptor, key).is_some_and(boolish))
}
