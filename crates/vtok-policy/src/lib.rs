//! Object policies for vtok.
//!
//! Every object create, modify, and copy passes through the policy selected
//! by the object's class. A policy decides whether an attribute set is valid,
//! which attributes are fixed, which values are withheld from readers, and
//! what defaults fill omitted attributes.
//!
//! # Quick Start
//!
//! ```rust
//! use vtok_policy::policy_for;
//! use vtok_types::{AttributeType, Attributes, ObjectClass};
//!
//! let supplied = Attributes::new()
//!     .with(AttributeType::CLASS, ObjectClass::Data)
//!     .with(AttributeType::LABEL, "settings");
//! let policy = policy_for(ObjectClass::Data);
//! let object = policy.validate_create(&supplied).unwrap();
//! assert!(object.is_modifiable());
//! ```

pub mod error;
pub mod policies;
pub mod policy;
pub mod rule;

pub use error::{PolicyError, PolicyResult};
pub use policies::certificate::CertificatePolicy;
pub use policies::common::CommonPolicy;
pub use policies::data::DataPolicy;
pub use policies::policy_for;
pub use policies::private_key::PrivateKeyPolicy;
pub use policies::public_key::PublicKeyPolicy;
pub use policies::secret_key::SecretKeyPolicy;
pub use policy::ObjectPolicy;
pub use rule::{AttributePolicy, Ratchet, ReadOnly};
