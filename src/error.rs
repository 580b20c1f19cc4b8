//! Error Taxonomy
//!
//! Configuration errors are fatal to initialization.
//! Transform input errors live in `transforms` and never leave the engine.

use thiserror::Error;

use crate::fields::{FieldKey, FieldKind};
use crate::outputs::OutputKey;

/// A declared field, output or layout region has nothing to bind to.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Missing layout region: no element matches {selector}")]
    MissingRegion { selector: String },

    #[error("Controls element has no id, cannot derive field names")]
    UnnamedControls,

    #[error("Missing field {key}: no input matches #{element_id}")]
    MissingField { key: FieldKey, element_id: String },

    #[error("Missing output {key}: no element matches {marker}")]
    MissingOutput { key: OutputKey, marker: String },

    #[error("Duplicate container {selector} must be empty before the preview is copied")]
    DuplicateNotEmpty { selector: String },

    #[error("Duplicate container {selector} lies inside the preview template it would copy")]
    DuplicateInsideTemplate { selector: String },

    #[error("Binding #{binding} reads field {key}, which is not registered")]
    UnknownSource { binding: usize, key: FieldKey },

    #[error("Binding #{binding} writes output {key}, which is not registered")]
    UnknownTarget { binding: usize, key: OutputKey },

    #[error("Binding #{binding} cannot apply {transform} to {kind} field {key}")]
    IncompatibleKind {
        binding: usize,
        key: FieldKey,
        kind: FieldKind,
        transform: &'static str,
    },

    #[error("Binding #{binding} ({transform}) takes {expected} source field(s), got {actual}")]
    Arity {
        binding: usize,
        transform: &'static str,
        expected: &'static str,
        actual: usize,
    },
}

/// An edit that the registry refuses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Field {0} is not registered")]
    Unknown(FieldKey),

    #[error("Field {key} is a {kind} field and cannot hold a {actual} value")]
    KindMismatch {
        key: FieldKey,
        kind: FieldKind,
        actual: &'static str,
    },
}
