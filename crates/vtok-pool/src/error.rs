use vtok_policy::PolicyError;
use vtok_store::StoreError;
use vtok_types::{AttributeType, ObjectHandle};

/// Errors produced by object pool operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("invalid attribute {attribute}: {reason}")]
    InvalidAttribute {
        attribute: AttributeType,
        reason: String,
    },

    #[error("attribute {0} is read-only")]
    AttributeReadOnly(AttributeType),

    #[error("invalid object handle {0}")]
    InvalidHandle(ObjectHandle),

    /// A token pool was used before [`init`](crate::ObjectPool::init)
    /// loaded its store.
    #[error("object pool not initialized")]
    NotInitialized,

    /// A store write failed during a live mutation. Nothing was applied.
    #[error("object store failure: {0}")]
    Store(#[from] StoreError),

    /// The store could not be read during initialization; the pool is
    /// unusable.
    #[error("object pool corrupted: {0}")]
    Corruption(#[source] StoreError),
}

impl From<PolicyError> for PoolError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::InvalidAttribute { attribute, reason } => {
                Self::InvalidAttribute { attribute, reason }
            }
            PolicyError::AttributeReadOnly(attribute) => Self::AttributeReadOnly(attribute),
        }
    }
}

/// Result alias for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
