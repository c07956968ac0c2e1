//! Task descriptor loading.
//!
//! Descriptors are YAML (`.yaml`, `.yml`, the default) or JSON (`.json`)
//! documents:
//!
//! ```yaml
//! task:
//!   type: energy
//!   description: water single point
//! molecule:
//!   charge: 0
//!   multiplicity: 1
//!   coordinates:
//!     - [O, 0.0, 0.0, 0.1173]
//!     - [H, 0.0, 0.7572, -0.4692]
//!     - [H, 0.0, -0.7572, -0.4692]
//! method:
//!   type: dft
//!   functional: B3LYP
//!   basis: cc-pVDZ
//! ```
//!
//! The coordinate list can also reference an external geometry file, resolved
//! relative to the descriptor:
//!
//! ```yaml
//! molecule:
//!   coordinates: "@water.xyz"
//! ```
//!
//! Supported geometry files are XYZ, Gaussian input (`.gjf`, `.com`) and
//! Gaussian output (`.log`, `.out`, last `Input orientation` table).

use crate::config::{Atom, TaskDescriptor};
use crate::elements;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for descriptor and geometry loading.
#[derive(Error, Debug)]
pub enum ParseError {
    /// I/O error when reading files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed YAML
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Malformed JSON, or a document that does not fit the descriptor model
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Parse error with descriptive message
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Type alias for parse operation results
type Result<T> = std::result::Result<T, ParseError>;

lazy_static! {
    // Charge and multiplicity line of a Gaussian input: "0 1", "-1 2"
    static ref CHARGE_MULT_RE: Regex = Regex::new(r"^\s*(-?\d+)\s+(\d+)\s*$").unwrap();
}

/// Document syntax of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl TaskFormat {
    /// Picks the format from the file extension; anything but `.json` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => TaskFormat::Json,
            _ => TaskFormat::Yaml,
        }
    }
}

/// Geometry read from an external file.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryFile {
    /// Atoms in file order, coordinates in Angstrom
    pub atoms: Vec<Atom>,
    /// Charge, when the file states one (Gaussian input)
    pub charge: Option<i64>,
    /// Multiplicity, when the file states one (Gaussian input)
    pub multiplicity: Option<i64>,
}

/// Loads a task descriptor file.
///
/// # Examples
///
/// ```no_run
/// use bdfgen::parser::parse_task_file;
/// use std::path::Path;
///
/// let descriptor = parse_task_file(Path::new("water.yaml"))?;
/// println!("{} atoms", descriptor.molecule.coordinates.len());
/// # Ok::<(), bdfgen::parser::ParseError>(())
/// ```
pub fn parse_task_file(path: &Path) -> Result<TaskDescriptor> {
    let content = fs::read_to_string(path)?;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    debug!("loading task descriptor {}", path.display());
    parse_document(&content, TaskFormat::from_path(path), &base)
}

/// Parses descriptor text. External geometry references are resolved
/// relative to the working directory.
pub fn parse_task_str(text: &str, format: TaskFormat) -> Result<TaskDescriptor> {
    parse_document(text, format, &PathBuf::new())
}

fn parse_document(text: &str, format: TaskFormat, base: &Path) -> Result<TaskDescriptor> {
    let mut document: Value = match format {
        TaskFormat::Yaml => serde_yaml::from_str(text)?,
        TaskFormat::Json => serde_json::from_str(text)?,
    };
    if !document.is_object() {
        return Err(ParseError::Parse(
            "task descriptor must be a mapping with task, molecule and method sections".into(),
        ));
    }
    resolve_geometry_reference(&mut document, base)?;
    Ok(serde_json::from_value(document)?)
}

/// Replaces `molecule.coordinates: "@file"` with the atoms of that file.
fn resolve_geometry_reference(document: &mut Value, base: &Path) -> Result<()> {
    let Some(coordinates) = document.pointer_mut("/molecule/coordinates") else {
        return Ok(());
    };
    let reference = match coordinates.as_str().map(str::trim) {
        Some(text) if text.starts_with('@') => text[1..].trim().to_string(),
        _ => return Ok(()),
    };
    let path = base.join(&reference);
    let geometry = read_geometry_file(&path)?;
    debug!("read {} atoms from {}", geometry.atoms.len(), path.display());
    *coordinates = serde_json::to_value(&geometry.atoms)?;
    Ok(())
}

/// True for the geometry file extensions [`read_geometry_file`] understands.
pub fn is_geometry_file(path: &Path) -> bool {
    matches!(
        extension(path).as_str(),
        "xyz" | "gjf" | "com" | "log" | "out"
    )
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Reads a geometry from an XYZ, Gaussian input or Gaussian output file.
pub fn read_geometry_file(path: &Path) -> Result<GeometryFile> {
    let content = fs::read_to_string(path)?;
    let geometry = match extension(path).as_str() {
        "xyz" => read_geom_from_xyz(&content)?,
        "gjf" | "com" => read_geom_from_gjf(&content)?,
        "log" | "out" => read_geom_from_log(&content)?,
        other => {
            return Err(ParseError::Parse(format!(
                "Unsupported geometry file format '{}': {}",
                other,
                path.display()
            )))
        }
    };
    if geometry.atoms.is_empty() {
        return Err(ParseError::Parse(format!(
            "No atoms found in {}",
            path.display()
        )));
    }
    Ok(geometry)
}

fn parse_atom(parts: &[&str], what: &str) -> Result<Atom> {
    let mut xyz = [0.0; 3];
    for (slot, text) in xyz.iter_mut().zip(parts[1..4].iter()) {
        *slot = text
            .parse()
            .map_err(|_| ParseError::Parse(format!("Invalid coordinate '{}' in {}", text, what)))?;
    }
    Ok(Atom::new(parts[0], xyz[0], xyz[1], xyz[2]))
}

fn read_geom_from_xyz(content: &str) -> Result<GeometryFile> {
    let mut atoms = Vec::new();
    // Line 1 is the atom count and line 2 a free comment
    for line in content.lines().skip(2) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 || !parts[0].starts_with(|c: char| c.is_ascii_alphabetic()) {
            continue;
        }
        atoms.push(parse_atom(&parts, "XYZ file")?);
    }
    Ok(GeometryFile {
        atoms,
        charge: None,
        multiplicity: None,
    })
}

fn read_geom_from_gjf(content: &str) -> Result<GeometryFile> {
    let mut atoms = Vec::new();
    let mut charge = None;
    let mut multiplicity = None;
    let mut in_geom = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if !in_geom {
            if let Some(caps) = CHARGE_MULT_RE.captures(trimmed) {
                charge = caps[1].parse().ok();
                multiplicity = caps[2].parse().ok();
                in_geom = true;
            }
            continue;
        }
        if trimmed.is_empty() {
            break;
        }
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() >= 4 {
            let mut atom = parse_atom(&parts, "Gaussian input")?;
            // Strip ONIOM/fragment decorations such as "C(Fragment=1)" or "C-CA-0.1"
            atom.element = atom
                .element
                .split(['(', '-'])
                .next()
                .unwrap_or_default()
                .to_string();
            atoms.push(atom);
        }
    }
    Ok(GeometryFile {
        atoms,
        charge,
        multiplicity,
    })
}

fn read_geom_from_log(content: &str) -> Result<GeometryFile> {
    let mut atoms = Vec::new();
    let mut in_geom = false;

    for line in content.lines() {
        if line.contains("Input orientation") {
            in_geom = true;
            atoms.clear();
            continue;
        } else if line.contains("Distance matrix") || line.contains("Rotational constants") {
            in_geom = false;
            continue;
        }
        if in_geom {
            let parts: Vec<&str> = line.split_whitespace().collect();
            // Center number, atomic number, atomic type, x, y, z
            if parts.len() >= 6 && parts[0].chars().all(|c| c.is_ascii_digit()) {
                let z: u32 = parts[1]
                    .parse()
                    .map_err(|_| ParseError::Parse(format!("Invalid atomic number '{}'", parts[1])))?;
                let mut xyz = [0.0; 3];
                for (slot, text) in xyz.iter_mut().zip(parts[3..6].iter()) {
                    *slot = text.parse().map_err(|_| {
                        ParseError::Parse(format!("Invalid coordinate '{}' in Gaussian output", text))
                    })?;
                }
                atoms.push(Atom::new(elements::symbol(z), xyz[0], xyz[1], xyz[2]));
            }
        }
    }
    Ok(GeometryFile {
        atoms,
        charge: None,
        multiplicity: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskType;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(TaskFormat::from_path(Path::new("a.json")), TaskFormat::Json);
        assert_eq!(TaskFormat::from_path(Path::new("a.JSON")), TaskFormat::Json);
        assert_eq!(TaskFormat::from_path(Path::new("a.yml")), TaskFormat::Yaml);
        assert_eq!(TaskFormat::from_path(Path::new("a")), TaskFormat::Yaml);
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = "task: {type: tddft}\nmolecule: {charge: 0, multiplicity: 1, coordinates: [\"H 0 0 0\"]}\nmethod: {type: hf, basis: sto-3g}\n";
        let d = parse_task_str(yaml, TaskFormat::Yaml).unwrap();
        assert_eq!(d.task.task_type, TaskType::Tddft);

        let json = r#"{"task": {"type": "energy"}, "molecule": {"charge": 1, "multiplicity": 2,
            "coordinates": [{"element": "O", "x": 0, "y": 0, "z": 0}]}, "method": {"type": "hf"}}"#;
        let d = parse_task_str(json, TaskFormat::Json).unwrap();
        assert_eq!(d.molecule.charge, Some(1));
        assert_eq!(d.molecule.coordinates[0].element, "O");
    }

    #[test]
    fn test_non_mapping_document() {
        assert!(matches!(
            parse_task_str("- 1\n- 2\n", TaskFormat::Yaml),
            Err(ParseError::Parse(_))
        ));
        assert!(matches!(
            parse_task_str("{not json", TaskFormat::Json),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn test_xyz_reader() {
        let geometry = read_geom_from_xyz("3\nwater\nO 0.0 0.0 0.1173\nH 0.0 0.7572 -0.4692\nH 0.0 -0.7572 -0.4692\n").unwrap();
        assert_eq!(geometry.atoms.len(), 3);
        assert_eq!(geometry.atoms[1].position, [0.0, 0.7572, -0.4692]);
    }

    #[test]
    fn test_gjf_reader() {
        let gjf = "%chk=w.chk\n#p b3lyp/6-31g*\n\nwater\n\n-1 2\nO(Fragment=1) 0.0 0.0 0.0\nH 0.0 0.0 1.0\n\n";
        let geometry = read_geom_from_gjf(gjf).unwrap();
        assert_eq!(geometry.charge, Some(-1));
        assert_eq!(geometry.multiplicity, Some(2));
        assert_eq!(geometry.atoms.len(), 2);
        assert_eq!(geometry.atoms[0].element, "O");
    }

    #[test]
    fn test_log_reader_keeps_last_orientation() {
        let log = "\
                          Input orientation:
 ---------------------------------------------------------------------
 Center     Atomic      Atomic             Coordinates (Angstroms)
 Number     Number       Type             X           Y           Z
 ---------------------------------------------------------------------
      1          8           0        0.000000    0.000000    0.100000
 ---------------------------------------------------------------------
 Distance matrix (angstroms):
                          Input orientation:
 ---------------------------------------------------------------------
      1          8           0        0.000000    0.000000    0.200000
      2          1           0        0.000000    0.750000   -0.400000
 ---------------------------------------------------------------------
 Rotational constants (GHZ):
";
        let geometry = read_geom_from_log(log).unwrap();
        assert_eq!(geometry.atoms.len(), 2);
        assert_eq!(geometry.atoms[0].element, "O");
        assert_eq!(geometry.atoms[0].position[2], 0.2);
        assert_eq!(geometry.atoms[1].element, "H");
    }
}
