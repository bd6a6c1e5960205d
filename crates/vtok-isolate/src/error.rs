/// Errors from isolate credential handling.
#[derive(Debug, thiserror::Error)]
pub enum IsolateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The user name cannot name a credential entry.
    #[error("invalid user name {0:?}")]
    InvalidUser(String),

    #[error("isolate credential must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Result alias for isolate operations.
pub type IsolateResult<T> = Result<T, IsolateError>;
