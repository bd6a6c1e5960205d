//! Isolate credentials for vtok.
//!
//! An isolate is a namespace of tokens identified by a 16-byte secret
//! credential. The default isolate's credential is all zeroes. A credential
//! manager maps user identities to saved credentials:
//!
//! - [`FileIsolateCredentialManager`] -- one owner-only file per user
//! - [`InMemoryIsolateCredentialManager`] -- for tests and embedding
//!
//! Credentials are wiped from memory on drop and never logged.

pub mod credential;
pub mod error;
pub mod file;
pub mod manager;
pub mod memory;

pub use credential::{default_isolate_credential, IsolateCredential, CREDENTIAL_LEN};
pub use error::{IsolateError, IsolateResult};
pub use file::FileIsolateCredentialManager;
pub use manager::{current_user_name, validate_user, IsolateCredentialManager};
pub use memory::InMemoryIsolateCredentialManager;
