use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};
use vtok_policy::{policy_for, PolicyError};
use vtok_store::ObjectStore;
use vtok_types::{AttributeType, Attributes, ObjectHandle};

use crate::error::{PoolError, PoolResult};
use crate::handle::HandleGenerator;
use crate::object::Object;

#[derive(Default)]
struct PoolState {
    objects: BTreeMap<ObjectHandle, Object>,
    initialized: bool,
}

/// The set of live objects for one token, or for one session.
///
/// A token pool owns an [`ObjectStore`] and persists token objects through
/// it before any in-memory change becomes visible. A session-scoped pool has
/// no store and holds session-only objects.
///
/// Mutations take the write lock for their whole duration, including the
/// store write, so a handle is either fully created, modified, or destroyed
/// or not at all. Reads run concurrently.
pub struct ObjectPool {
    handles: Arc<HandleGenerator>,
    store: Option<Arc<dyn ObjectStore>>,
    state: RwLock<PoolState>,
    private_unlocked: AtomicBool,
}

impl ObjectPool {
    /// A token pool persisting through `store`. Call [`init`](Self::init)
    /// before use; creating objects earlier fails with
    /// [`PoolError::NotInitialized`].
    pub fn new(handles: Arc<HandleGenerator>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            handles,
            store: Some(store),
            state: RwLock::new(PoolState::default()),
            private_unlocked: AtomicBool::new(false),
        }
    }

    /// A store-less pool for session-only objects.
    pub fn session_scoped(handles: Arc<HandleGenerator>) -> Self {
        Self {
            handles,
            store: None,
            state: RwLock::new(PoolState {
                objects: BTreeMap::new(),
                initialized: true,
            }),
            private_unlocked: AtomicBool::new(false),
        }
    }

    /// Load every stored object and assign it a fresh handle.
    ///
    /// Returns the number of objects loaded. Calling it again is a no-op.
    /// A store that cannot be read fails with [`PoolError::Corruption`];
    /// individual records that no longer pass policy validation are skipped.
    pub fn init(&self) -> PoolResult<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let mut state = self.write();
        if state.initialized {
            return Ok(state.objects.len());
        }

        let entries = store.load_all().map_err(PoolError::Corruption)?;
        let mut loaded = 0;
        for (key, attributes) in entries {
            let Some(class) = attributes.class() else {
                warn!(key = %key.short_id(), "skipping stored object without a class");
                continue;
            };
            if let Err(e) = policy_for(class).check_required(&attributes) {
                warn!(key = %key.short_id(), %class, error = %e, "skipping stored object that fails validation");
                continue;
            }
            let handle = self.handles.next_handle();
            state
                .objects
                .insert(handle, Object::stored(handle, attributes, key));
            loaded += 1;
        }
        state.initialized = true;

        info!(
            objects = loaded,
            durable = store.is_durable(),
            "object pool initialized"
        );
        Ok(loaded)
    }

    /// Validate `supplied`, apply defaults, and add the object.
    ///
    /// Token objects are persisted first; if the store write fails no handle
    /// is issued.
    pub fn create_object(&self, supplied: &Attributes) -> PoolResult<ObjectHandle> {
        let class = supplied
            .class()
            .ok_or_else(|| PolicyError::invalid(AttributeType::CLASS, "required attribute missing"))?;
        let attributes = policy_for(class).validate_create(supplied)?;
        self.insert_validated(attributes)
    }

    /// Copy the object at `handle` within this pool, applying `overrides`.
    pub fn copy_object(
        &self,
        handle: ObjectHandle,
        overrides: &Attributes,
    ) -> PoolResult<ObjectHandle> {
        let source = self.get_object(handle)?;
        self.create_copy(&source, overrides)
    }

    /// Add a copy of `source` (which may live in another pool) with
    /// `overrides` applied under copy rules.
    pub fn create_copy(&self, source: &Object, overrides: &Attributes) -> PoolResult<ObjectHandle> {
        let attributes = source
            .policy()
            .validate_copy(source.attributes(), overrides)?;
        let handle = self.insert_validated(attributes)?;
        debug!(source = %source.handle(), copy = %handle, "object copied");
        Ok(handle)
    }

    /// Snapshot of the object at `handle`.
    pub fn get_object(&self, handle: ObjectHandle) -> PoolResult<Object> {
        self.read()
            .objects
            .get(&handle)
            .cloned()
            .ok_or(PoolError::InvalidHandle(handle))
    }

    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.read().objects.contains_key(&handle)
    }

    /// Apply `changes` to the object at `handle` after re-validation.
    ///
    /// The store is updated before the in-memory copy; on failure neither
    /// changes.
    pub fn set_attributes(&self, handle: ObjectHandle, changes: &Attributes) -> PoolResult<()> {
        let mut state = self.write();
        let object = state
            .objects
            .get_mut(&handle)
            .ok_or(PoolError::InvalidHandle(handle))?;
        let merged = object
            .policy()
            .validate_modify(object.attributes(), changes)?;
        if let (Some(key), Some(store)) = (object.store_key(), &self.store) {
            store.update(&key, &merged)?;
        }
        object.replace_attributes(merged);
        debug!(%handle, changed = changes.len(), "object modified");
        Ok(())
    }

    /// Remove the object at `handle`, deleting its persisted copy first.
    pub fn destroy_object(&self, handle: ObjectHandle) -> PoolResult<()> {
        let mut state = self.write();
        self.destroy_locked(&mut state, handle)?;
        debug!(%handle, "object destroyed");
        Ok(())
    }

    /// Handles of every object matching `template`, ascending.
    pub fn find_objects(&self, template: &Attributes) -> Vec<ObjectHandle> {
        self.find_objects_where(template, |_| true)
    }

    /// Like [`find_objects`](Self::find_objects) with an extra filter.
    pub fn find_objects_where(
        &self,
        template: &Attributes,
        filter: impl Fn(&Object) -> bool,
    ) -> Vec<ObjectHandle> {
        self.read()
            .objects
            .values()
            .filter(|object| object.attributes().matches(template) && filter(object))
            .map(Object::handle)
            .collect()
    }

    /// Destroy every object in the pool. Returns how many were removed.
    ///
    /// Stops at the first store failure; objects removed before it stay
    /// removed.
    pub fn destroy_all(&self) -> PoolResult<usize> {
        let mut state = self.write();
        let handles: Vec<ObjectHandle> = state.objects.keys().copied().collect();
        let mut removed = 0;
        for handle in handles {
            self.destroy_locked(&mut state, handle)?;
            removed += 1;
        }
        if removed > 0 {
            debug!(removed, "pool emptied");
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().objects.is_empty()
    }

    /// The backing store, for token pools.
    pub fn store(&self) -> Option<&Arc<dyn ObjectStore>> {
        self.store.as_ref()
    }

    pub fn handles(&self) -> &Arc<HandleGenerator> {
        &self.handles
    }

    /// Allow sessions to see and create private objects.
    pub fn unlock_private(&self) {
        self.private_unlocked.store(true, Ordering::SeqCst);
        debug!("private objects unlocked");
    }

    pub fn lock_private(&self) {
        self.private_unlocked.store(false, Ordering::SeqCst);
        debug!("private objects locked");
    }

    pub fn private_unlocked(&self) -> bool {
        self.private_unlocked.load(Ordering::SeqCst)
    }

    fn insert_validated(&self, attributes: Attributes) -> PoolResult<ObjectHandle> {
        let class = attributes.class();
        let token = attributes.is_token_object();
        let mut state = self.write();
        // Objects created now would be loaded a second time by init.
        if !state.initialized {
            return Err(PoolError::NotInitialized);
        }

        let object = if token {
            let store = self.store.as_ref().ok_or_else(|| {
                PolicyError::invalid(AttributeType::TOKEN, "token objects need a token pool")
            })?;
            let key = store.insert(&attributes)?;
            let handle = self.handles.next_handle();
            Object::stored(handle, attributes, key)
        } else {
            Object::new(self.handles.next_handle(), attributes)
        };

        let handle = object.handle();
        state.objects.insert(handle, object);
        debug!(%handle, class = ?class, token, "object created");
        Ok(handle)
    }

    fn destroy_locked(&self, state: &mut PoolState, handle: ObjectHandle) -> PoolResult<()> {
        let object = state
            .objects
            .get(&handle)
            .ok_or(PoolError::InvalidHandle(handle))?;
        if let (Some(key), Some(store)) = (object.store_key(), &self.store) {
            store.delete(&key)?;
        }
        state.objects.remove(&handle);
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, PoolState> {
        self.state.read().expect("pool lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, PoolState> {
        self.state.write().expect("pool lock poisoned")
    }
}

impl std::fmt::Debug for ObjectPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("objects", &self.len())
            .field("durable", &self.store.as_ref().map(|s| s.is_durable()))
            .field("private_unlocked", &self.private_unlocked())
            .finish()
    }
}
