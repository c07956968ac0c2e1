//! Task descriptor templates from geometry files.
//!
//! Reads an XYZ, Gaussian input or Gaussian output file and writes a YAML
//! descriptor with the geometry inlined and the common settings commented
//! out, ready to be edited and compiled.

use crate::config::Atom;
use crate::elements::atomic_number;
use crate::parser::{is_geometry_file, read_geometry_file};
use std::fs;
use std::path::{Path, PathBuf};

/// Generates a template from a geometry file.
/// Supports .xyz, .gjf/.com and .log/.out formats.
pub fn generate_template_from_file<P: AsRef<Path>>(
    geometry_file: P,
) -> Result<String, Box<dyn std::error::Error>> {
    let geometry_file = geometry_file.as_ref();

    if !geometry_file.exists() {
        return Err(format!("File not found: {}", geometry_file.display()).into());
    }
    if !is_supported_format(geometry_file) {
        let extension = geometry_file
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        return Err(format!("Unsupported file format: {}", extension).into());
    }

    let geometry = read_geometry_file(geometry_file)?;
    let name = geometry_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("molecule");
    let charge = geometry.charge.unwrap_or(0);
    let multiplicity = geometry
        .multiplicity
        .unwrap_or_else(|| lowest_multiplicity(&geometry.atoms, charge));

    Ok(generate_template(name, &geometry.atoms, charge, multiplicity))
}

/// 1 for an even electron count, 2 for an odd one. Unknown elements give 1.
fn lowest_multiplicity(atoms: &[Atom], charge: i64) -> i64 {
    let nuclear: Option<i64> = atoms
        .iter()
        .map(|atom| atomic_number(&atom.element).map(i64::from))
        .sum();
    match nuclear {
        Some(z) if (z - charge).rem_euclid(2) == 1 => 2,
        _ => 1,
    }
}

/// A string as a YAML scalar that reads back as the same string; names such
/// as `123` or `true` come out quoted.
fn yaml_string(text: &str) -> String {
    serde_yaml::to_string(text)
        .map(|yaml| yaml.trim_end().to_string())
        .unwrap_or_else(|_| format!("{:?}", text))
}

/// Builds the template text.
fn generate_template(name: &str, atoms: &[Atom], charge: i64, multiplicity: i64) -> String {
    let coordinates: String = atoms
        .iter()
        .map(|atom| {
            let [x, y, z] = atom.position;
            format!(
                "    - [{}, {:.6}, {:.6}, {:.6}]\n",
                yaml_string(&atom.element),
                x,
                y,
                z
            )
        })
        .collect();
    let quoted_name = yaml_string(name);

    format!(
        r#"# bdfgen task descriptor
# Edit the sections below, then run: bdfgen {name}.yaml

task:
  type: energy            # energy | optimize | frequency | tddft
  description: {quoted_name}

molecule:
  name: {quoted_name}
  charge: {charge}
  multiplicity: {multiplicity}
  units: angstrom         # angstrom | bohr
  coordinates:
{coordinates}
method:
  type: dft               # hf | dft
  functional: B3LYP       # a name, "X C", or {{x: B88, c: LYP}}
  basis: def2-SVP

settings:
  scf:
    convergence: 1.0e-8   # THRENE is written only when this differs from 1e-8
    # solvent: {{name: water, model: pcm}}
  # tddft:
  #   nstates: 10
  #   tda: true
  #   target_root: 1      # excited state followed by optimize/frequency
  # geometry_optimization:
  #   type: minimum       # minimum | transition_state
  #   hessian:
  #     mode: final       # only | init | final | init+final
  # resp: {{}}
  # mp2: {{}}
  # xuanyuan:
  #   heff: 3             # scalar relativistic Hamiltonian, set automatically for heavy elements

# hamiltonian:
#   scalar_Hamiltonian: 3
#   spin-orbit-coupling: true
"#,
        name = name,
        quoted_name = quoted_name,
        charge = charge,
        multiplicity = multiplicity,
        coordinates = coordinates,
    )
}

/// Write template to file
pub fn write_template_to_file<P: AsRef<Path>>(
    template: &str,
    output_path: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(output_path, template)?;
    Ok(())
}

/// Get default output filename based on input geometry file
pub fn get_default_output_path<P: AsRef<Path>>(geometry_file: P) -> PathBuf {
    let geometry_file = geometry_file.as_ref();
    let stem = geometry_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("template");

    PathBuf::from(format!("{}.yaml", stem))
}

/// Validate file extension
pub fn is_supported_format(path: &Path) -> bool {
    is_geometry_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_task_str, TaskFormat};
    use tempfile::tempdir;

    #[test]
    fn test_is_supported_format() {
        assert!(is_supported_format(Path::new("test.xyz")));
        assert!(is_supported_format(Path::new("test.LOG")));
        assert!(is_supported_format(Path::new("test.gjf")));
        assert!(!is_supported_format(Path::new("test.txt")));
        assert!(!is_supported_format(Path::new("test")));
    }

    #[test]
    fn test_get_default_output_path() {
        let path = get_default_output_path(Path::new("molecule.xyz"));
        assert_eq!(path.to_str().unwrap(), "molecule.yaml");

        let path = get_default_output_path(Path::new("/path/to/molecule.xyz"));
        assert_eq!(path.to_str().unwrap(), "molecule.yaml");
    }

    #[test]
    fn test_multiplicity_guess() {
        let water = [
            Atom::new("O", 0.0, 0.0, 0.0),
            Atom::new("H", 0.0, 0.0, 1.0),
            Atom::new("H", 0.0, 1.0, 0.0),
        ];
        assert_eq!(lowest_multiplicity(&water, 0), 1);
        assert_eq!(lowest_multiplicity(&water, 1), 2);
        assert_eq!(lowest_multiplicity(&water[..2], 0), 2);
    }

    #[test]
    fn test_template_parses_back() {
        let dir = tempdir().unwrap();
        let xyz = dir.path().join("water.xyz");
        fs::write(&xyz, "3\n\nO 0.0 0.0 0.1173\nH 0.0 0.7572 -0.4692\nH 0.0 -0.7572 -0.4692\n").unwrap();

        let template = generate_template_from_file(&xyz).unwrap();
        let descriptor = parse_task_str(&template, TaskFormat::Yaml).unwrap();
        assert_eq!(descriptor.molecule.name.as_deref(), Some("water"));
        assert_eq!(descriptor.molecule.multiplicity, Some(1));
        assert_eq!(descriptor.molecule.coordinates.len(), 3);
        assert_eq!(descriptor.molecule.coordinates[1].position, [0.0, 0.7572, -0.4692]);
    }

    #[test]
    fn test_names_that_look_like_other_types() {
        let dir = tempdir().unwrap();
        for stem in ["123", "true", "null", "4.5"] {
            let xyz = dir.path().join(format!("{}.xyz", stem));
            fs::write(&xyz, "1\n\nHe 0.0 0.0 0.0\n").unwrap();

            let template = generate_template_from_file(&xyz).unwrap();
            let descriptor = parse_task_str(&template, TaskFormat::Yaml).unwrap();
            assert_eq!(descriptor.molecule.name.as_deref(), Some(stem));
            assert_eq!(descriptor.task.description.as_deref(), Some(stem));
        }
        assert_eq!(yaml_string("water"), "water");
        assert_ne!(yaml_string("123"), "123");
    }

    #[test]
    fn test_missing_and_unsupported_files() {
        assert!(generate_template_from_file("does-not-exist.xyz").is_err());
        let dir = tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, "hello").unwrap();
        assert!(generate_template_from_file(&txt).is_err());
    }
}
