//! Foundation types for vtok.
//!
//! Every other vtok crate depends on `vtok-types`. It defines the attribute
//! model shared by policies, pools, stores, and sessions.
//!
//! # Key Types
//!
//! - [`AttributeType`] -- numeric attribute identifier with named constants
//! - [`AttributeValue`] -- bool, integer, byte string, or class tag
//! - [`Attributes`] -- ordered attribute set with template matching
//! - [`ObjectClass`] -- object class that selects a policy
//! - [`ObjectHandle`] / [`SlotId`] / [`SessionId`] -- process-local identifiers

pub mod attribute;
pub mod attributes;
pub mod class;
pub mod error;
pub mod handle;

pub use attribute::{AttributeType, AttributeValue, ValueKind};
pub use attributes::Attributes;
pub use class::{certificate_type, key_type, ObjectClass};
pub use error::TypeError;
pub use handle::{ObjectHandle, SessionId, SlotId};
