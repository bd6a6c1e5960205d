//! Sessions for vtok.
//!
//! A [`Session`] is opened against one slot, read-only or read-write, and
//! performs every object operation a client issues: it routes token objects
//! to the token's pool and session objects to its own pool, enforces the
//! read-only and private-object rules, and runs object searches.

pub mod error;
pub mod session;

pub use error::{SessionError, SessionResult};
pub use session::{AttributeLookup, Session, SessionState};
