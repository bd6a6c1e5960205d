use std::path::Path;

use vtok_types::Attributes;

use crate::error::StoreResult;
use crate::key::StoreKey;

/// Durable map from [`StoreKey`] to a serialized attribute set.
///
/// All implementations must satisfy these invariants:
/// - Every mutation is all-or-nothing. A failed `insert`, `update`, or
///   `delete` leaves previously committed entries intact.
/// - Every written entry comes back from `load_all` with identical attributes.
/// - The store never interprets attribute contents; validation belongs to
///   the caller.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read every live entry. Each call re-reads the backing medium.
    fn load_all(&self) -> StoreResult<Vec<(StoreKey, Attributes)>>;

    /// Persist a new entry and return its key.
    fn insert(&self, attributes: &Attributes) -> StoreResult<StoreKey>;

    /// Replace the attributes of an existing entry.
    ///
    /// Returns `StoreError::NotFound` if `key` is not live.
    fn update(&self, key: &StoreKey, attributes: &Attributes) -> StoreResult<()>;

    /// Remove an entry.
    ///
    /// Returns `StoreError::NotFound` if `key` is not live.
    fn delete(&self, key: &StoreKey) -> StoreResult<()>;

    /// Number of live entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether entries survive process exit.
    fn is_durable(&self) -> bool;

    /// Backing location, if the store has one.
    fn location(&self) -> Option<&Path> {
        None
    }
}
