use std::path::PathBuf;

use vtok_pool::PoolError;
use vtok_session::SessionError;
use vtok_types::{SessionId, SlotId};

/// Errors from token wiring, the slot arena, and configuration.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The slot does not exist or belongs to another isolate.
    #[error("slot not found: {0}")]
    SlotNotFound(SlotId),

    /// The location already backs a loaded token.
    #[error("token at {} is already loaded in {slot}", path.display())]
    AlreadyLoaded { path: PathBuf, slot: SlotId },

    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("object pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for token operations.
pub type TokenResult<T> = Result<T, TokenError>;
