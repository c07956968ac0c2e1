use bdfgen::parser::{parse_task_file, ParseError};
use bdfgen::template_generator::{generate_template_from_file, write_template_to_file};
use bdfgen::{compile, TaskType};
use std::fs;
use tempfile::tempdir;

const WATER_XYZ: &str = "3\nwater\nO 0.0 0.0 0.1173\nH 0.0 0.7572 -0.4692\nH 0.0 -0.7572 -0.4692\n";

#[test]
fn test_yaml_task_with_geometry_reference() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("water.xyz"), WATER_XYZ).unwrap();
    let task = dir.path().join("water.yaml");
    fs::write(
        &task,
        r#"
task:
  type: tddft
molecule:
  name: water
  charge: 0
  multiplicity: 1
  coordinates: "@water.xyz"
method:
  type: dft
  functional: B3LYP
  basis: def2-SVP
settings:
  tddft:
    nstates: 6
    tda: true
"#,
    )
    .unwrap();

    let descriptor = parse_task_file(&task).unwrap();
    assert_eq!(descriptor.task.task_type, TaskType::Tddft);
    assert_eq!(descriptor.molecule.coordinates.len(), 3);
    assert_eq!(descriptor.molecule.coordinates[2].position, [0.0, -0.7572, -0.4692]);

    let text = compile(&descriptor).unwrap();
    assert!(text.contains("\n$TDDFT\n"));
    assert!(text.contains("\nIroot\n 6\n"));
    assert!(text.contains("\nItda\n 1\n"));
}

#[test]
fn test_json_task_file() {
    let dir = tempdir().unwrap();
    let task = dir.path().join("h2.json");
    fs::write(
        &task,
        r#"{"task": {"type": "energy"},
            "molecule": {"charge": 0, "multiplicity": 1,
                         "coordinates": ["H 0.0 0.0 0.0", "H 0.0 0.0 0.74"]},
            "method": {"type": "hf", "basis": "cc-pVDZ"},
            "settings": {"mp2": true}}"#,
    )
    .unwrap();

    let text = compile(&parse_task_file(&task).unwrap()).unwrap();
    assert!(text.contains("$SCF\nRHF\n"));
    assert!(text.ends_with("$MP2\n$END\n"));
}

#[test]
fn test_missing_geometry_reference() {
    let dir = tempdir().unwrap();
    let task = dir.path().join("broken.yaml");
    fs::write(
        &task,
        "task: {type: energy}\nmolecule: {charge: 0, multiplicity: 1, coordinates: \"@nowhere.xyz\"}\nmethod: {type: hf, basis: sto-3g}\n",
    )
    .unwrap();
    assert!(matches!(parse_task_file(&task), Err(ParseError::Io(_))));
}

#[test]
fn test_template_from_gaussian_input_compiles() {
    let dir = tempdir().unwrap();
    let gjf = dir.path().join("hydroxide.gjf");
    fs::write(
        &gjf,
        "#p b3lyp/def2svp\n\nhydroxide\n\n-1 1\nO 0.0 0.0 0.0\nH 0.0 0.0 0.97\n\n",
    )
    .unwrap();

    let template = generate_template_from_file(&gjf).unwrap();
    let output = dir.path().join("templates").join("hydroxide.yaml");
    write_template_to_file(&template, &output).unwrap();

    let descriptor = parse_task_file(&output).unwrap();
    assert_eq!(descriptor.molecule.charge, Some(-1));
    assert_eq!(descriptor.molecule.multiplicity, Some(1));

    let text = compile(&descriptor).unwrap();
    assert!(text.starts_with("$COMPASS\nTitle\n hydroxide\nBasis\n def2-SVP\n"));
    assert!(text.contains("$SCF\nRKS\nCharge\n -1\nSpin\n 1\nDFT\n B3LYP\n"));
}
