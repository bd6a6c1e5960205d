//! Object storage for vtok tokens.
//!
//! A store is a durable map from [`StoreKey`] to an attribute set, scoped to
//! one backing location. It holds token-resident objects only; session
//! objects never reach it.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`FileObjectStore`] -- append-only, CRC-framed record log in one file
//! - [`EphemeralObjectStore`] -- in-memory fallback used when the backing
//!   location cannot be opened; loses everything at exit
//!
//! # Design Rules
//!
//! 1. Mutations are all-or-nothing; a failed write never damages committed
//!    records.
//! 2. With [`SyncMode::EveryWrite`] (the default) data is on disk before a
//!    mutation returns.
//! 3. The store never interprets attribute contents or logs their values.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod ephemeral;
pub mod error;
pub mod file;
pub mod key;
pub mod traits;

pub use ephemeral::EphemeralObjectStore;
pub use error::{StoreError, StoreResult};
pub use file::{FileObjectStore, StoreConfig, SyncMode, MAGIC};
pub use key::StoreKey;
pub use traits::ObjectStore;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vtok_types::{AttributeType, Attributes, ObjectClass};

    fn sample() -> Attributes {
        Attributes::new()
            .with(AttributeType::CLASS, ObjectClass::Certificate)
            .with(AttributeType::LABEL, "root")
    }

    // Both backends behave the same through the trait object.
    fn exercise(store: Arc<dyn ObjectStore>) {
        let key = store.insert(&sample()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load_all().unwrap(), vec![(key, sample())]);
        store.delete(&key).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn backends_share_trait_semantics() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileObjectStore::open(dir.path().join("objects.log"), StoreConfig::default())
            .unwrap();
        exercise(Arc::new(file));
        exercise(Arc::new(EphemeralObjectStore::new()));
    }
}
