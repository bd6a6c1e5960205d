use vtok_policy::PolicyError;
use vtok_pool::PoolError;
use vtok_store::StoreError;
use vtok_types::{AttributeType, ObjectHandle};

/// Errors returned by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session is closed")]
    SessionClosed,

    #[error("session is read-only")]
    SessionReadOnly,

    #[error("invalid object handle {0}")]
    InvalidHandle(ObjectHandle),

    #[error("invalid attribute {attribute}: {reason}")]
    InvalidAttribute {
        attribute: AttributeType,
        reason: String,
    },

    #[error("attribute {0} is read-only")]
    AttributeReadOnly(AttributeType),

    /// Private objects are locked on this token.
    #[error("user not logged in")]
    UserNotLoggedIn,

    #[error("a find operation is already active")]
    OperationActive,

    #[error("no find operation is active")]
    OperationNotInitialized,

    /// The token this session was opened against has been unloaded.
    #[error("token not present")]
    TokenNotPresent,

    #[error("object store failure: {0}")]
    Store(#[from] StoreError),

    /// The token's store could not be read; its pool is unusable.
    #[error("object pool corrupted: {0}")]
    PoolCorruption(#[source] StoreError),
}

impl From<PoolError> for SessionError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::InvalidAttribute { attribute, reason } => {
                Self::InvalidAttribute { attribute, reason }
            }
            PoolError::AttributeReadOnly(attribute) => Self::AttributeReadOnly(attribute),
            PoolError::InvalidHandle(handle) => Self::InvalidHandle(handle),
            PoolError::Store(e) => Self::Store(e),
            PoolError::Corruption(e) => Self::PoolCorruption(e),
            PoolError::NotInitialized => Self::TokenNotPresent,
        }
    }
}

impl From<PolicyError> for SessionError {
    fn from(err: PolicyError) -> Self {
        PoolError::from(err).into()
    }
}


/// Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
