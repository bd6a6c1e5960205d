//! Object pools for vtok.
//!
//! An [`ObjectPool`] owns the live objects of one token (persisted through
//! an object store) or of one session (memory only). Every object enters the
//! pool through its class policy and is addressed by an [`ObjectHandle`]
//! issued by a shared [`HandleGenerator`].
//!
//! [`ObjectHandle`]: vtok_types::ObjectHandle

pub mod error;
pub mod handle;
pub mod object;
pub mod pool;

pub use error::{PoolError, PoolResult};
pub use handle::HandleGenerator;
pub use object::Object;
pub use pool::ObjectPool;
