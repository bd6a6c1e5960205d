use std::path::Path;
use std::sync::Arc;

use tracing::{error, warn};
use vtok_policy::{policy_for, ObjectPolicy, PolicyError};
use vtok_pool::{HandleGenerator, Object, ObjectPool, PoolError};
use vtok_session::Session;
use vtok_store::{EphemeralObjectStore, FileObjectStore, ObjectStore, StoreConfig};
use vtok_types::{AttributeType, Attributes, ObjectClass, SlotId};

use crate::error::TokenResult;

/// Builds the components of a token and wires them together.
///
/// Every pool and session built by one factory shares its handle
/// generator.
#[derive(Debug, Clone)]
pub struct TokenFactory {
    handles: Arc<HandleGenerator>,
    store_config: StoreConfig,
}

impl TokenFactory {
    pub fn new(handles: Arc<HandleGenerator>, store_config: StoreConfig) -> Self {
        Self {
            handles,
            store_config,
        }
    }

    pub fn handles(&self) -> &Arc<HandleGenerator> {
        &self.handles
    }

    /// Open a session on `slot` against `pool`.
    pub fn create_session(&self, slot: SlotId, pool: &Arc<ObjectPool>, read_only: bool) -> Session {
        Session::new(slot, pool, Arc::clone(&self.handles), read_only)
    }

    /// Build a token pool over `store` and load its objects.
    ///
    /// A pool whose store cannot be read is discarded.
    pub fn create_object_pool(&self, store: Arc<dyn ObjectStore>) -> TokenResult<Arc<ObjectPool>> {
        let pool = ObjectPool::new(Arc::clone(&self.handles), store);
        if let Err(e) = pool.init() {
            error!(error = %e, "object pool initialization failed");
            return Err(e.into());
        }
        Ok(Arc::new(pool))
    }

    /// Open the durable store at `location`.
    ///
    /// If it cannot be opened the token still comes up, backed by an
    /// in-memory store whose contents are lost at exit.
    pub fn create_object_store(&self, location: &Path) -> Arc<dyn ObjectStore> {
        match FileObjectStore::open(location, self.store_config.clone()) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!(
                    path = %location.display(),
                    error = %e,
                    "object store unavailable; token objects will not persist"
                );
                Arc::new(EphemeralObjectStore::new())
            }
        }
    }

    pub fn create_object_policy(&self, class: ObjectClass) -> &'static dyn ObjectPolicy {
        policy_for(class)
    }

    /// Validate `attributes` and build a standalone object with a fresh
    /// handle. The object belongs to no pool.
    pub fn create_object(&self, attributes: &Attributes) -> TokenResult<Object> {
        let class = attributes
            .class()
            .ok_or_else(|| PolicyError::invalid(AttributeType::CLASS, "required attribute missing"))
            .map_err(PoolError::from)?;
        let validated = policy_for(class)
            .validate_create(attributes)
            .map_err(PoolError::from)?;
        Ok(Object::new(self.handles.next_handle(), validated))
    }
}

impl Default for TokenFactory {
    fn default() -> Self {
        Self::new(HandleGenerator::global(), StoreConfig::default())
    }
}
