//! Closed error taxonomy (§7). Every failure surfaced across the crate boundary is one
//! of these kinds; anything else (storage I/O, decoding) is wrapped as [`PolyplaneError::Internal`]
//! with the original cause preserved.

use serde::Serialize;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum PolyplaneError {
    #[error("{entity_kind} not found: {key}")]
    NotFound { entity_kind: &'static str, key: String },

    #[error("integrity violation on {entity_kind}: {key}")]
    IntegrityViolation { entity_kind: &'static str, key: String },

    #[error("type mismatch at {site}: expected {expected}, got {actual}")]
    TypeMismatch {
        site: String,
        expected: String,
        actual: String,
    },

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("unknown collation: {0}")]
    UnknownCollation(String),

    #[error("unsupported operation on adapter {adapter}: {op}")]
    UnsupportedOperation { adapter: String, op: String },

    #[error("constraint violation: {constraint_name} ({kind:?})")]
    ConstraintViolation {
        constraint_name: String,
        kind: ConstraintKind,
    },

    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("prepare failed on adapter {adapter} for transaction {xid}")]
    PrepareFailed { adapter: String, xid: String },

    #[error("cancelled")]
    Cancelled,

    #[error("timeout")]
    Timeout,

    #[error("invalid parameter value at index {index}: expected {expected}, got {actual}")]
    InvalidParameterValue {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("parse error at {position:?}: {message}")]
    ParseError {
        position: Option<usize>,
        message: String,
    },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    NotNull,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::Unique => write!(f, "UNIQUE"),
            ConstraintKind::ForeignKey => write!(f, "FOREIGN_KEY"),
            ConstraintKind::NotNull => write!(f, "NOT_NULL"),
        }
    }
}

/// The `{kind, message, position?, hint?}` wire shape from §6, derived from a
/// [`PolyplaneError`] at the query boundary.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub kind: String,
    pub message: String,
    pub position: Option<usize>,
    pub hint: Option<String>,
}

impl From<&PolyplaneError> for ErrorEnvelope {
    fn from(err: &PolyplaneError) -> Self {
        let (kind, position, hint) = match err {
            PolyplaneError::NotFound { .. } => ("NotFound", None, None),
            PolyplaneError::IntegrityViolation { .. } => ("IntegrityViolation", None, None),
            PolyplaneError::TypeMismatch { .. } => ("TypeMismatch", None, None),
            PolyplaneError::UnknownOperator(_) => ("UnknownOperator", None, None),
            PolyplaneError::UnknownType(_) => ("UnknownType", None, None),
            PolyplaneError::UnknownCollation(_) => ("UnknownCollation", None, None),
            PolyplaneError::UnsupportedOperation { .. } => ("UnsupportedOperation", None, None),
            PolyplaneError::ConstraintViolation { constraint_name, .. } => (
                "ConstraintViolation",
                None,
                Some(format!("check constraint {constraint_name}")),
            ),
            PolyplaneError::TransactionConflict(_) => ("TransactionConflict", None, None),
            PolyplaneError::PrepareFailed { .. } => ("PrepareFailed", None, None),
            PolyplaneError::Cancelled => ("Cancelled", None, None),
            PolyplaneError::Timeout => ("Timeout", None, None),
            PolyplaneError::InvalidParameterValue { index, .. } => {
                ("InvalidParameterValue", Some(*index), None)
            }
            PolyplaneError::ParseError { position, .. } => ("ParseError", *position, None),
            PolyplaneError::InvalidIdentifier(_) => ("InvalidIdentifier", None, None),
            PolyplaneError::Internal(_) => ("Internal", None, None),
        };
        ErrorEnvelope {
            kind: kind.to_string(),
            message: err.to_string(),
            position,
            hint,
        }
    }
}

pub type Result<T> = std::result::Result<T, PolyplaneError>;
