use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::debug;
use vtok_policy::{policy_for, PolicyError};
use vtok_pool::{HandleGenerator, Object, ObjectPool, PoolError};
use vtok_types::{AttributeType, AttributeValue, Attributes, ObjectHandle, SlotId};

use crate::error::{SessionError, SessionResult};

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// Result of reading one attribute through a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeLookup {
    Value(AttributeValue),
    /// The attribute exists but its value is withheld.
    Sensitive,
    /// The object has no such attribute.
    Missing,
}

/// Handles captured by `find_objects_init`, returned in batches.
#[derive(Debug)]
struct FindCursor {
    pending: VecDeque<ObjectHandle>,
}

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    find: Option<FindCursor>,
}

/// A logical connection to one token.
///
/// Token objects (`CKA_TOKEN = true`) live in the token's pool, which the
/// session references without owning. Session objects live in a pool owned
/// by the session and are destroyed when it closes. Every operation holds
/// the session lock for its duration, so operations on one session are
/// serialized while sessions on the same token run in parallel.
pub struct Session {
    slot: SlotId,
    read_only: bool,
    token: Weak<ObjectPool>,
    objects: ObjectPool,
    inner: Mutex<SessionInner>,
}

impl Session {
    pub fn new(
        slot: SlotId,
        token: &Arc<ObjectPool>,
        handles: Arc<HandleGenerator>,
        read_only: bool,
    ) -> Self {
        debug!(%slot, read_only, "session opened");
        Self {
            slot,
            read_only,
            token: Arc::downgrade(token),
            objects: ObjectPool::session_scoped(handles),
            inner: Mutex::new(SessionInner {
                state: SessionState::Open,
                find: None,
            }),
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Number of live session objects.
    pub fn session_object_count(&self) -> usize {
        self.objects.len()
    }

    /// Validate `template` and create the object in the pool its
    /// `CKA_TOKEN` flag selects.
    pub fn create_object(&self, template: &Attributes) -> SessionResult<ObjectHandle> {
        let _inner = self.lock_open()?;
        let token = self.token()?;
        let on_token = template.is_token_object();
        if on_token && self.read_only {
            return Err(SessionError::SessionReadOnly);
        }

        let class = template
            .class()
            .ok_or_else(|| PolicyError::invalid(AttributeType::CLASS, "required attribute missing"))?;
        let resolved = policy_for(class).validate_create(template)?;
        if resolved.is_private() && !token.private_unlocked() {
            return Err(SessionError::UserNotLoggedIn);
        }

        let pool = if on_token { token.as_ref() } else { &self.objects };
        Ok(pool.create_object(template)?)
    }

    /// Copy the object at `handle` with `overrides`. The copy lands in the
    /// pool its resulting `CKA_TOKEN` flag selects.
    pub fn copy_object(
        &self,
        handle: ObjectHandle,
        overrides: &Attributes,
    ) -> SessionResult<ObjectHandle> {
        let _inner = self.lock_open()?;
        let token = self.token()?;
        let (source, _) = self.locate(&token, handle)?;
        let resolved = source
            .policy()
            .validate_copy(source.attributes(), overrides)?;
        let on_token = resolved.is_token_object();
        if on_token && self.read_only {
            return Err(SessionError::SessionReadOnly);
        }
        if resolved.is_private() && !token.private_unlocked() {
            return Err(SessionError::UserNotLoggedIn);
        }

        let pool = if on_token { token.as_ref() } else { &self.objects };
        Ok(pool.create_copy(&source, overrides)?)
    }

    /// Snapshot of the object at `handle`.
    pub fn get_object(&self, handle: ObjectHandle) -> SessionResult<Object> {
        let _inner = self.lock_open()?;
        let token = self.token()?;
        Ok(self.locate(&token, handle)?.0)
    }

    /// Read `attributes` from the object at `handle`, withholding sensitive
    /// values.
    pub fn get_attribute_values(
        &self,
        handle: ObjectHandle,
        attributes: &[AttributeType],
    ) -> SessionResult<Vec<(AttributeType, AttributeLookup)>> {
        let _inner = self.lock_open()?;
        let token = self.token()?;
        let (object, _) = self.locate(&token, handle)?;
        Ok(attributes
            .iter()
            .map(|&attribute| {
                let lookup = match object.get(attribute) {
                    None => AttributeLookup::Missing,
                    Some(_) if object.is_sensitive(attribute) => AttributeLookup::Sensitive,
                    Some(value) => AttributeLookup::Value(value.clone()),
                };
                (attribute, lookup)
            })
            .collect())
    }

    pub fn set_attributes(&self, handle: ObjectHandle, changes: &Attributes) -> SessionResult<()> {
        let _inner = self.lock_open()?;
        let token = self.token()?;
        let (_, on_token) = self.locate(&token, handle)?;
        if on_token && self.read_only {
            return Err(SessionError::SessionReadOnly);
        }
        let pool = if on_token { token.as_ref() } else { &self.objects };
        Ok(pool.set_attributes(handle, changes)?)
    }

    pub fn destroy_object(&self, handle: ObjectHandle) -> SessionResult<()> {
        let _inner = self.lock_open()?;
        let token = self.token()?;
        let (_, on_token) = self.locate(&token, handle)?;
        if on_token && self.read_only {
            return Err(SessionError::SessionReadOnly);
        }
        let pool = if on_token { token.as_ref() } else { &self.objects };
        Ok(pool.destroy_object(handle)?)
    }

    /// Start a search for objects matching `template`.
    ///
    /// The matching set is captured now. Objects destroyed, or hidden by
    /// relocking private access, before they are returned are skipped.
    pub fn find_objects_init(&self, template: &Attributes) -> SessionResult<()> {
        let mut inner = self.lock_open()?;
        if inner.find.is_some() {
            return Err(SessionError::OperationActive);
        }
        let token = self.token()?;
        let show_private = token.private_unlocked();
        let visible = |object: &Object| show_private || !object.is_private();

        let mut handles = self.objects.find_objects_where(template, visible);
        handles.extend(token.find_objects_where(template, visible));
        handles.sort_unstable();
        debug!(slot = %self.slot, matches = handles.len(), "find started");
        inner.find = Some(FindCursor {
            pending: handles.into(),
        });
        Ok(())
    }

    /// Return up to `max` more handles from the active search.
    pub fn find_objects(&self, max: usize) -> SessionResult<Vec<ObjectHandle>> {
        let mut inner = self.lock_open()?;
        let token = self.token()?;
        let cursor = inner
            .find
            .as_mut()
            .ok_or(SessionError::OperationNotInitialized)?;

        let mut batch = Vec::with_capacity(max.min(cursor.pending.len()));
        while batch.len() < max {
            let Some(handle) = cursor.pending.pop_front() else {
                break;
            };
            // Re-checked: the object may be gone or private access relocked.
            if self.locate(&token, handle).is_ok() {
                batch.push(handle);
            }
        }
        Ok(batch)
    }

    pub fn find_objects_final(&self) -> SessionResult<()> {
        let mut inner = self.lock_open()?;
        inner
            .find
            .take()
            .map(|_| ())
            .ok_or(SessionError::OperationNotInitialized)
    }

    /// Close the session, destroying its session objects. Closing an
    /// already closed session does nothing.
    pub fn close(&self) -> SessionResult<()> {
        let mut inner = self.lock();
        if inner.state == SessionState::Closed {
            return Ok(());
        }
        inner.state = SessionState::Closed;
        inner.find = None;
        let destroyed = self.objects.destroy_all()?;
        debug!(slot = %self.slot, destroyed, "session closed");
        Ok(())
    }

    /// Find the object at `handle` in the session pool, then the token
    /// pool. Returns the object and whether it lives on the token. Private
    /// objects are invisible while private access is locked.
    fn locate(&self, token: &ObjectPool, handle: ObjectHandle) -> SessionResult<(Object, bool)> {
        let (object, on_token) = match self.objects.get_object(handle) {
            Ok(object) => (object, false),
            Err(PoolError::InvalidHandle(_)) => (token.get_object(handle)?, true),
            Err(e) => return Err(e.into()),
        };
        if object.is_private() && !token.private_unlocked() {
            return Err(SessionError::InvalidHandle(handle));
        }
        Ok((object, on_token))
    }

    fn token(&self) -> SessionResult<Arc<ObjectPool>> {
        self.token.upgrade().ok_or(SessionError::TokenNotPresent)
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().expect("session mutex poisoned")
    }

    fn lock_open(&self) -> SessionResult<MutexGuard<'_, SessionInner>> {
        let inner = self.lock();
        if inner.state == SessionState::Closed {
            return Err(SessionError::SessionClosed);
        }
        Ok(inner)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("slot", &self.slot)
            .field("read_only", &self.read_only)
            .field("session_objects", &self.objects.len())
            .finish()
    }
}
