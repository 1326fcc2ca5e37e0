use thiserror::Error;

use crate::{
    backend::TransportError,
    domain::{FieldErrors, FieldKind},
};

/// Misuse of the controller by the calling code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("field '{0}' is not declared on this form")]
    UnknownField(String),
    #[error("field '{field}' holds {expected} values, got {found}")]
    TypeMismatch {
        field: String,
        expected: FieldKind,
        found: FieldKind,
    },
    #[error("field '{field}' cannot take input '{input}': {reason}")]
    InvalidInput {
        field: String,
        input: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("a submission is already in flight")]
    InFlight,
    #[error("submission rejected with {} field error(s)", .0.len())]
    Rejected(FieldErrors),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("form controller was disposed")]
    Disposed,
}

impl SubmitError {
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            SubmitError::Rejected(errors) => Some(errors),
            _ => None,
        }
    }
}
