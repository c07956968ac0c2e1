//! Command-line interface for bdfgen
//!
//! Compiles task descriptors into BDF input files and writes templates.
//!
//! Commands:
//! - `bdfgen <task.yaml|task.json> [output]` compiles a task descriptor
//! - `bdfgen ci <geometry_file> [output]` writes a task descriptor template
//! - `bdfgen ci bdfgen_config.cfg` writes a settings template
//! - `bdfgen --help` prints usage
//!
//! The log level comes from the `[logging]` section of the settings file.

use bdfgen::parser::parse_task_file;
use bdfgen::settings::{SettingsManager, CONFIG_FILE_NAME};
use bdfgen::validation::SchemaValidator;
use log::{debug, LevelFilter};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

/// Main entry point for the bdfgen command-line tool.
fn main() {
    let settings = SettingsManager::load().unwrap_or_else(|_| SettingsManager::load_from(&[]));

    let level = settings
        .logging()
        .level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Info);
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .format_timestamp_millis()
        .init();
    debug!("Program settings from: {}", settings.config_source());

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    check_help_flags(&args);

    let command = &args[1];

    match command.as_str() {
        "ci" => {
            if args.len() < 3 {
                eprintln!("Error: Missing file argument");
                eprintln!("Usage:");
                eprintln!(
                    "  {} ci <geometry_file> [output_file]  - Create task template",
                    args[0]
                );
                eprintln!(
                    "  {} ci {}              - Create settings template",
                    args[0], CONFIG_FILE_NAME
                );
                process::exit(1);
            }

            let file_arg = &args[2];

            if file_arg == CONFIG_FILE_NAME {
                match run_create_settings_template() {
                    Ok(()) => {
                        println!("✓ Settings template created successfully!");
                        println!("  Output file: {}", CONFIG_FILE_NAME);
                        println!("\nNext steps:");
                        println!("  1. Review and edit the {} file", CONFIG_FILE_NAME);
                        println!("  2. The settings will be automatically loaded by bdfgen");
                    }
                    Err(e) => {
                        eprintln!("Error creating settings template: {}", e);
                        process::exit(1);
                    }
                }
            } else {
                let geometry_path = Path::new(file_arg);
                let output_path = args.get(3).map(Path::new);

                match run_create_template(geometry_path, output_path) {
                    Ok(output_file) => {
                        println!("✓ Task template created successfully!");
                        println!("  Output file: {}", output_file.display());
                        println!("\nNext steps:");
                        println!("  1. Review and edit the generated template file");
                        println!("  2. Set the task type, method and basis set as needed");
                        println!("  3. Run bdfgen: {} {}", args[0], output_file.display());
                    }
                    Err(e) => {
                        eprintln!("Error creating template: {}", e);
                        process::exit(1);
                    }
                }
            }
        }
        _ => {
            if !command.starts_with('-') {
                let input_path = Path::new(&args[1]);
                let output_path = args.get(2).map(Path::new);
                match run_generate(input_path, output_path, &settings) {
                    Ok(output_file) => {
                        if settings.general().print_level >= 1 {
                            println!("✓ Input file written: {}", output_file.display());
                        }
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(1);
                    }
                }
            } else {
                eprintln!("Error: Unknown command: {}", command);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }
}

/// Check for help flags and print usage
fn check_help_flags(args: &[String]) {
    let wants_help = |arg: &String| arg == "--help" || arg == "-h";

    if args.len() == 2 && wants_help(&args[1]) {
        print_usage(&args[0]);
        process::exit(0);
    }

    if args.len() >= 3 && args[1] == "ci" && wants_help(&args[2]) {
        print_ci_help(&args[0]);
        process::exit(0);
    }
}

fn print_usage(program_name: &str) {
    eprintln!("bdfgen - BDF input generation from task descriptors");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {} <task_file> [output_file]", program_name);
    eprintln!("                    Compile a YAML (.yaml/.yml) or JSON (.json) task descriptor");
    eprintln!();
    eprintln!("  {} ci <geometry_file> [output_file]", program_name);
    eprintln!("                    Create a task descriptor template from a geometry file");
    eprintln!();
    eprintln!("  {} ci {}", program_name, CONFIG_FILE_NAME);
    eprintln!("                    Create a settings template file for configuration");
    eprintln!();
    eprintln!("Supported geometry formats:");
    eprintln!("  .xyz       - XYZ coordinate file");
    eprintln!("  .gjf/.com  - Gaussian input file");
    eprintln!("  .log/.out  - Gaussian output file");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} ci molecule.xyz", program_name);
    eprintln!("  {} molecule.yaml", program_name);
    eprintln!("  {} molecule.yaml custom.inp", program_name);
}

fn print_ci_help(program_name: &str) {
    eprintln!("Create templates");
    eprintln!();
    eprintln!("  {} ci <geometry_file> [output_file]", program_name);
    eprintln!("      Writes <stem>.yaml (or output_file) with the geometry inlined.");
    eprintln!("      Charge and multiplicity come from Gaussian input files when present;");
    eprintln!("      otherwise charge 0 and the lowest multiplicity for the electron count.");
    eprintln!();
    eprintln!("  {} ci {}", program_name, CONFIG_FILE_NAME);
    eprintln!("      Writes a commented settings file in the current directory.");
}

/// Compiles a task descriptor file and writes the input file.
///
/// The output defaults to the descriptor path with the configured input
/// extension. Returns the path written.
fn run_generate(
    input_path: &Path,
    output_path: Option<&Path>,
    settings: &SettingsManager,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let descriptor = parse_task_file(input_path)?;
    let validator = SchemaValidator {
        check_functionals: settings.validation().check_functionals,
    };
    let generated = bdfgen::generate_input(&descriptor, &validator)?;

    let output_path = match output_path {
        Some(p) => p.to_path_buf(),
        None => input_path.with_extension(&settings.output().extension),
    };
    if output_path == input_path {
        return Err(format!(
            "Output would overwrite the task file {}; pass an output path",
            input_path.display()
        )
        .into());
    }

    fs::write(&output_path, &generated.text)?;

    if settings.general().print_level >= 2 {
        print!("{}", generated.text);
    }
    if settings.general().print_level >= 1 && !generated.warnings.is_empty() {
        println!("{} warning(s) reported during validation", generated.warnings.len());
    }
    Ok(output_path)
}

/// Creates a task descriptor template from a geometry file.
fn run_create_template(
    geometry_file: &Path,
    output_path: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    use bdfgen::template_generator::*;

    if !geometry_file.exists() {
        return Err(format!("Geometry file not found: {}", geometry_file.display()).into());
    }
    if !is_supported_format(geometry_file) {
        return Err("Unsupported file format. Supported formats: .xyz, .gjf, .com, .log, .out".into());
    }

    println!("Reading geometry from: {}", geometry_file.display());
    let template_content = generate_template_from_file(geometry_file)?;

    let output_path = match output_path {
        Some(p) => p.to_path_buf(),
        None => get_default_output_path(geometry_file),
    };

    write_template_to_file(&template_content, &output_path)?;

    Ok(output_path)
}

/// Creates a settings template in the working directory.
///
/// Refuses to overwrite an existing file.
fn run_create_settings_template() -> Result<(), Box<dyn std::error::Error>> {
    let settings_path = Path::new(CONFIG_FILE_NAME);

    if settings_path.exists() {
        return Err(format!(
            "{} already exists. Please remove it first or choose a different location.",
            CONFIG_FILE_NAME
        )
        .into());
    }

    SettingsManager::create_template(settings_path)?;

    Ok(())
}
