use vtok_types::AttributeType;

/// Errors produced when an attribute set violates an object policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// The attribute is unknown, missing, or carries an unacceptable value.
    #[error("invalid attribute {attribute}: {reason}")]
    InvalidAttribute {
        attribute: AttributeType,
        reason: String,
    },

    /// The attribute cannot be written in this context.
    #[error("attribute {0} is read-only")]
    AttributeReadOnly(AttributeType),
}

impl PolicyError {
    /// Create an invalid-attribute error with a reason.
    pub fn invalid(attribute: AttributeType, reason: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            attribute,
            reason: reason.into(),
        }
    }

    /// The attribute the error refers to.
    pub fn attribute(&self) -> AttributeType {
        match self {
            Self::InvalidAttribute { attribute, .. } => *attribute,
            Self::AttributeReadOnly(attribute) => *attribute,
        }
    }
}

/// Convenience alias used throughout the policy crate.
pub type PolicyResult<T> = Result<T, PolicyError>;
