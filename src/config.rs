//! Task descriptor data model.
//!
//! This module defines the in-memory form of a task descriptor, the document
//! the compiler turns into a BDF input file:
//!
//! - [`TaskDescriptor`]: top-level document (`task`, `molecule`, `method`,
//!   `settings`, `hamiltonian`)
//! - [`TaskSpec`] / [`TaskType`]: what kind of calculation to run
//! - [`MoleculeSpec`] / [`Atom`] / [`CoordinateUnits`]: charge, spin and geometry
//! - [`MethodSpec`] / [`Functional`]: electronic structure method and basis
//! - [`Settings`]: free-form, task-dependent sub-documents
//! - [`HamiltonianSpec`]: relativistic overrides
//!
//! Descriptors are usually loaded with [`parser`](crate::parser) from YAML or
//! JSON, but can be built programmatically as well.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bohr to Angstrom conversion factor used for geometry output.
pub const BOHR_TO_ANGSTROM: f64 = 0.529177;

lazy_static! {
    static ref EMPTY_SECTION: Map<String, Value> = Map::new();
}

/// Calculation type. Selects the module pipeline.
///
/// Unknown names are kept as [`TaskType::Other`] so the compiler can report
/// them as unimplemented instead of failing at deserialization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    /// Single-point ground state energy
    Energy,
    /// Geometry optimization (ground or excited state)
    Optimize,
    /// Harmonic frequency calculation
    Frequency,
    /// Excited states via TDDFT
    Tddft,
    /// Any other task name
    Other(String),
}

impl TaskType {
    /// Lower-case name as written in descriptors.
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::Energy => "energy",
            TaskType::Optimize => "optimize",
            TaskType::Frequency => "frequency",
            TaskType::Tddft => "tddft",
            TaskType::Other(name) => name,
        }
    }
}

impl From<String> for TaskType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "energy" => TaskType::Energy,
            "optimize" => TaskType::Optimize,
            "frequency" => TaskType::Frequency,
            "tddft" => TaskType::Tddft,
            _ => TaskType::Other(value),
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TaskType> for String {
    fn from(value: TaskType) -> Self {
        value.as_str().to_string()
    }
}

/// The `task` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Calculation type
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Free-text description, used as the COMPASS title when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Units of the input coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateUnits {
    /// Angstrom, the target program's implicit unit
    #[default]
    #[serde(alias = "Angstrom", alias = "ANGSTROM", alias = "angs", alias = "a")]
    Angstrom,
    /// Bohr (atomic units); converted to Angstrom on output
    #[serde(alias = "Bohr", alias = "BOHR", alias = "au")]
    Bohr,
}

/// One atom of the input geometry.
///
/// Accepted input forms:
///
/// ```yaml
/// coordinates:
///   - [O, 0.0, 0.0, 0.1173]
///   - "H 0.0 0.7572 -0.4692"
///   - {element: H, x: 0.0, y: -0.7572, z: -0.4692}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AtomRepr", into = "AtomRepr")]
pub struct Atom {
    /// Element symbol or atom label as given
    pub element: String,
    /// Cartesian position in the descriptor's units
    pub position: [f64; 3],
}

impl Atom {
    /// Creates an atom from a label and a position.
    pub fn new(element: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            element: element.into(),
            position: [x, y, z],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum AtomRepr {
    Tuple(String, f64, f64, f64),
    Map {
        element: String,
        x: f64,
        y: f64,
        z: f64,
    },
    Line(String),
}

impl TryFrom<AtomRepr> for Atom {
    type Error = String;

    fn try_from(value: AtomRepr) -> Result<Self, Self::Error> {
        match value {
            AtomRepr::Tuple(element, x, y, z) | AtomRepr::Map { element, x, y, z } => {
                Ok(Atom::new(element, x, y, z))
            }
            AtomRepr::Line(line) => {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() != 4 {
                    return Err(format!(
                        "coordinate line '{}' must have the form 'El x y z'",
                        line
                    ));
                }
                let mut xyz = [0.0; 3];
                for (slot, text) in xyz.iter_mut().zip(&parts[1..]) {
                    *slot = text
                        .parse()
                        .map_err(|_| format!("invalid coordinate '{}' in '{}'", text, line))?;
                }
                Ok(Atom::new(parts[0], xyz[0], xyz[1], xyz[2]))
            }
        }
    }
}

impl From<Atom> for AtomRepr {
    fn from(atom: Atom) -> Self {
        let [x, y, z] = atom.position;
        AtomRepr::Tuple(atom.element, x, y, z)
    }
}

/// The `molecule` section.
///
/// `charge` and `multiplicity` are optional at the type level only so that
/// their absence can be reported as a compile error; they are never defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleculeSpec {
    /// Optional molecule name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Net charge
    #[serde(default)]
    pub charge: Option<i64>,
    /// Spin multiplicity 2S+1
    #[serde(default)]
    pub multiplicity: Option<i64>,
    /// Atoms in input order
    #[serde(default)]
    pub coordinates: Vec<Atom>,
    /// Units of `coordinates`
    #[serde(default)]
    pub units: CoordinateUnits,
}

/// Exchange-correlation functional as written by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Functional {
    /// A single name (`B3LYP`) or a combined `"X C"` string (`"B88 LYP"`)
    Name(String),
    /// Separate exchange and correlation parts
    Components {
        /// Exchange functional
        x: String,
        /// Correlation functional
        c: String,
    },
}

/// The `method` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSpec {
    /// Method family (`hf`, `dft`, `mcscf`, ...)
    #[serde(rename = "type")]
    pub method_type: String,
    /// Functional, required for DFT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functional: Option<Functional>,
    /// Basis set name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basis: Option<String>,
    /// Request a spin-adapted open-shell reference (ROHF/ROKS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin_adapted: Option<bool>,
    /// Any further method keys (RI basis sets and the like)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MethodSpec {
    /// Lower-cased method type.
    pub fn kind(&self) -> String {
        self.method_type.trim().to_ascii_lowercase()
    }

    /// True for density functional methods.
    pub fn is_dft(&self) -> bool {
        self.kind() == "dft"
    }
}

/// The top-level `hamiltonian` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HamiltonianSpec {
    /// Scalar relativistic Hamiltonian override (`heff`)
    #[serde(
        rename = "scalar_Hamiltonian",
        alias = "scalar_hamiltonian",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub scalar_hamiltonian: Option<Value>,
    /// Spin-orbit coupling request (`hso`)
    #[serde(
        rename = "spin-orbit-coupling",
        alias = "spin_orbit_coupling",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub spin_orbit_coupling: Option<Value>,
}

/// Task-dependent settings: `scf`, `tddft`, `geometry_optimization`, `resp`,
/// `mp2`, `xuanyuan`, `atomic_orbital_integral`, `compass`, ...
///
/// Kept as a free-form JSON object because most of its keys are forwarded
/// to the target program as passthrough keywords.
///
/// Section names and the keys directly inside each section are lower-cased
/// on construction, so `Convergence` and `convergence` are the same setting.
/// Deeper keys keep their case; some of them are data, like the element
/// symbols of a basis block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Settings(pub Map<String, Value>);

impl Settings {
    /// Returns the raw value stored under a top-level key.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// True when the section is present and not explicitly `false`.
    ///
    /// `mp2: true`, `mp2: {}` and a bare `mp2:` all count as present.
    pub fn has_section(&self, name: &str) -> bool {
        !matches!(self.0.get(name), None | Some(Value::Bool(false)))
    }

    /// The section as a mapping, or an empty mapping if it is absent or not
    /// a mapping.
    pub fn section(&self, name: &str) -> &Map<String, Value> {
        match self.0.get(name) {
            Some(Value::Object(map)) => map,
            _ => &EMPTY_SECTION,
        }
    }

    /// Follows a path of mapping keys, e.g. `["geometry_optimization", "hessian", "mode"]`.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.0.get(*first)?;
        for key in rest {
            current = current.as_object()?.get(*key)?;
        }
        Some(current)
    }
}

impl From<Map<String, Value>> for Settings {
    fn from(map: Map<String, Value>) -> Self {
        let sections = lowercase_keys(map)
            .into_iter()
            .map(|(name, section)| match section {
                Value::Object(entries) => (name, Value::Object(lowercase_keys(entries))),
                other => (name, other),
            })
            .collect();
        Settings(sections)
    }
}

impl From<Settings> for Map<String, Value> {
    fn from(settings: Settings) -> Self {
        settings.0
    }
}

/// Lower-cases the keys of one mapping level. On a case-only clash the
/// later entry wins.
pub fn lowercase_keys(map: Map<String, Value>) -> Map<String, Value> {
    let mut lowered = Map::with_capacity(map.len());
    for (key, value) in map {
        lowered.insert(key.to_lowercase(), value);
    }
    lowered
}

/// A complete task descriptor.
///
/// # Examples
///
/// ```
/// use bdfgen::config::TaskDescriptor;
///
/// let yaml = r#"
/// task: {type: energy}
/// molecule:
///   charge: 0
///   multiplicity: 1
///   coordinates:
///     - [H, 0.0, 0.0, 0.0]
///     - [H, 0.0, 0.0, 0.74]
/// method: {type: hf, basis: cc-pvdz}
/// "#;
/// let descriptor: TaskDescriptor = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(descriptor.molecule.coordinates.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// What to compute
    pub task: TaskSpec,
    /// The molecular system
    pub molecule: MoleculeSpec,
    /// Electronic structure method
    pub method: MethodSpec,
    /// Task-dependent settings
    #[serde(default)]
    pub settings: Settings,
    /// Relativistic overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hamiltonian: Option<HamiltonianSpec>,
}
