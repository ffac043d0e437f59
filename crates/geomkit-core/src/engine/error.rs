use thiserror::Error;

use super::placement::UnresolvedAtom;
use crate::core::models::atom::{AtomLabel, ParameterKind};
use crate::core::models::molecule::MoleculeError;
use crate::core::models::records::RecordError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Could not compute positions for {} atom(s): {}", .0.len(), join(.0))]
    UnresolvedGeometry(Vec<UnresolvedAtom>),

    #[error(
        "Bond graph has {components} disconnected fragments; atoms outside the largest one: {}",
        join(.atoms)
    )]
    DisconnectedGraph {
        atoms: Vec<AtomLabel>,
        components: usize,
    },

    #[error(
        "No well-conditioned references found for {} atom(s): {} (add a dummy atom to break linear or planar runs)",
        .unassigned.len(),
        join(.unassigned)
    )]
    AutozStalled { unassigned: Vec<AtomLabel> },

    #[error(
        "Constraint violated at {atom}: {parameter}{} expected {expected:.6}, measured {measured:.6}",
        describe_variable(.variable)
    )]
    ConstraintViolation {
        atom: AtomLabel,
        parameter: ParameterKind,
        variable: Option<String>,
        expected: f64,
        measured: f64,
    },

    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    #[error(
        "No host atom around {atom} passes the {threshold}-degree angle test for placeholder {placeholder}"
    )]
    NoSuitableReference {
        atom: AtomLabel,
        placeholder: i8,
        threshold: f64,
    },

    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown fragment '{0}'")]
    UnknownFragment(String),
}

impl From<MoleculeError> for GeometryError {
    fn from(err: MoleculeError) -> Self {
        match err {
            MoleculeError::InvalidReference { .. } | MoleculeError::AtomOutOfRange { .. } => {
                Self::UnknownReference(err.to_string())
            }
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

impl From<RecordError> for GeometryError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::InvalidReference { .. } => Self::UnknownReference(err.to_string()),
            RecordError::Molecule(inner) => inner.into(),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_variable(variable: &Option<String>) -> String {
    match variable {
        Some(name) => format!(" (variable '{name}')"),
        None => String::new(),
    }
}
