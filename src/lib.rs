#![deny(missing_docs)]

//! bdfgen - BDF input generation from declarative task descriptors
//!
//! bdfgen compiles a task descriptor (molecule, method, task type and
//! free-form per-module settings) into the text of a BDF input file. The
//! output is a sequence of module blocks, each opened by `$NAME` and closed
//! by `$END`:
//!
//! ```text
//! $COMPASS
//! Title
//!  water
//! Basis
//!  def2-SVP
//! Geometry
//! O        0.0000       0.0000       0.1173
//! ...
//! End Geometry
//! $END
//!
//! $SCF
//! RKS
//! ...
//! $END
//! ```
//!
//! # Overview
//!
//! - [`pipeline`] picks the module sequence for the task type and assembles
//!   the document.
//! - [`blocks`] holds one generator per program module (COMPASS, XUANYUAN,
//!   SCF, TDDFT, BDFOPT, RESP, MP2).
//! - [`keywords`] is the passthrough engine that turns descriptor settings
//!   into keyword lines.
//! - [`normalize`] maps descriptor vocabulary (method names, point groups,
//!   functionals, number formats) onto the program's.
//! - [`validation`] checks a descriptor before compilation.
//!
//! Compilation is a pure function of the descriptor: no I/O, no global
//! state, and identical descriptors give byte-identical output.
//!
//! # Quick Start
//!
//! ```no_run
//! use bdfgen::parser::parse_task_file;
//! use bdfgen::validation::SchemaValidator;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let descriptor = parse_task_file(Path::new("water.yaml"))?;
//!     let generated = bdfgen::generate_input(&descriptor, &SchemaValidator::default())?;
//!     for warning in &generated.warnings {
//!         eprintln!("warning: {}", warning);
//!     }
//!     print!("{}", generated.text);
//!     Ok(())
//! }
//! ```
//!
//! # Task Types
//!
//! | Task | Blocks |
//! |------|--------|
//! | energy | COMPASS, XUANYUAN, SCF, [MP2] |
//! | tddft | COMPASS, XUANYUAN, SCF, [MP2], TDDFT |
//! | optimize | COMPASS, BDFOPT, XUANYUAN, SCF, [MP2], [TDDFT], RESP |
//! | frequency | COMPASS, BDFOPT, XUANYUAN, SCF, [MP2], [TDDFT], RESP |
//!
//! Spin-orbit coupling is recognised but not implemented and always fails
//! with [`CompileError::NotImplemented`].

/// Per-module block generators
pub mod blocks;
pub mod config;
/// Periodic table lookups
pub mod elements;
pub mod error;
/// Reference list of exchange-correlation functionals
pub mod functionals;
pub mod geometry;
pub mod keywords;
pub mod normalize;
pub mod parser;
pub mod pipeline;
/// Configuration management system
pub mod settings;
/// Task descriptor templates
pub mod template_generator;
pub mod validation;

pub use config::{TaskDescriptor, TaskType};
pub use error::{CompileError, GenerateError};
pub use pipeline::compile;
pub use validation::{SchemaValidator, ValidationError, Validator};

/// A compiled input document together with the validator's warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedInput {
    /// Complete input text, ending with a newline
    pub text: String,
    /// Advisory findings that did not stop compilation
    pub warnings: Vec<String>,
}

/// Validates a descriptor, then compiles it.
///
/// # Errors
///
/// [`GenerateError::Validation`] when the descriptor is malformed, and
/// [`GenerateError::Compile`] when it is well-formed but cannot be compiled.
pub fn generate_input(
    descriptor: &TaskDescriptor,
    validator: &dyn Validator,
) -> Result<GeneratedInput, GenerateError> {
    let warnings = validator.validate(descriptor)?;
    let text = compile(descriptor)?;
    Ok(GeneratedInput { text, warnings })
}
