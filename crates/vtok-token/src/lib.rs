//! Token wiring for vtok.
//!
//! [`TokenFactory`] builds stores, pools, policies, sessions, and bare
//! objects. [`SlotArena`] owns the loaded tokens, gates access to them by
//! isolate credential, and tracks the sessions opened on each.
//! [`TokenConfig`] carries the on-disk layout and durability settings.
//!
//! # Quick Start
//!
//! ```rust
//! use vtok_isolate::default_isolate_credential;
//! use vtok_token::{SlotArena, TokenConfig};
//! use vtok_types::{AttributeType, Attributes, ObjectClass};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = TokenConfig {
//!     store_root: dir.path().to_path_buf(),
//!     ..TokenConfig::default()
//! };
//! let arena = SlotArena::default();
//! let isolate = default_isolate_credential();
//! let slot = arena.load_token(&isolate, &config.store_path("main")).unwrap();
//!
//! let (_, session) = arena.open_session(slot, &isolate, false).unwrap();
//! let template = Attributes::new()
//!     .with(AttributeType::CLASS, ObjectClass::Data)
//!     .with(AttributeType::TOKEN, true)
//!     .with(AttributeType::LABEL, "settings");
//! let handle = session.create_object(&template).unwrap();
//! assert!(session.get_object(handle).unwrap().is_token_object());
//! ```

pub mod arena;
pub mod config;
pub mod error;
pub mod factory;

pub use arena::SlotArena;
pub use config::TokenConfig;
pub use error::{TokenError, TokenResult};
pub use factory::TokenFactory;
