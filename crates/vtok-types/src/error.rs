use thiserror::Error;

use crate::attribute::{AttributeType, ValueKind};

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("attribute {attribute} expects a {expected} value, got {actual}")]
    WrongValueKind {
        attribute: AttributeType,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("attribute {0} is not present")]
    MissingAttribute(AttributeType),

    #[error("invalid object handle: 0")]
    NullHandle,
}
