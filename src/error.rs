//! Error types for input compilation.
//!
//! Two families are kept apart so callers can tell them apart:
//!
//! - [`ValidationError`](crate::validation::ValidationError): the descriptor is malformed
//!   (raised by the validator before compilation starts).
//! - [`CompileError`]: the descriptor is well-formed but this combination of
//!   inputs cannot be compiled (missing mandatory molecule data, unsupported
//!   method, unimplemented task type or feature).
//!
//! [`GenerateError`] wraps both for the [`generate_input`](crate::generate_input)
//! front door.

use crate::validation::ValidationError;
use thiserror::Error;

/// Errors raised while compiling a task descriptor into an input document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// A mandatory field is absent. Mandatory fields are never defaulted.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Spin multiplicity below 1.
    #[error("invalid multiplicity {0}: must be >= 1")]
    InvalidMultiplicity(i64),

    /// No SCF method exists for this method type and multiplicity.
    #[error("unsupported method type '{method}' for multiplicity {multiplicity}")]
    UnsupportedMethod {
        /// Method type as written in the descriptor.
        method: String,
        /// Spin multiplicity of the molecule.
        multiplicity: i64,
    },

    /// Task type or feature that is recognised but not implemented.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

/// Errors from [`generate_input`](crate::generate_input).
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The descriptor failed validation.
    #[error("invalid task descriptor: {0}")]
    Validation(#[from] ValidationError),

    /// The descriptor is valid but could not be compiled.
    #[error("compilation failed: {0}")]
    Compile(#[from] CompileError),
}
