use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};
use vtok_isolate::IsolateCredential;
use vtok_pool::ObjectPool;
use vtok_session::Session;
use vtok_types::{SessionId, SlotId};

use crate::error::{TokenError, TokenResult};
use crate::factory::TokenFactory;

/// One loaded token.
struct Slot {
    isolate: IsolateCredential,
    location: PathBuf,
    /// `location` resolved for duplicate detection.
    resolved: PathBuf,
    pool: Arc<ObjectPool>,
    sessions: BTreeMap<SessionId, Arc<Session>>,
}

#[derive(Default)]
struct ArenaState {
    slots: BTreeMap<SlotId, Slot>,
    next_slot: u64,
    next_session: u64,
}

impl ArenaState {
    /// The slot, if it exists and belongs to `isolate`.
    fn slot_for(&self, slot: SlotId, isolate: &IsolateCredential) -> TokenResult<&Slot> {
        self.slots
            .get(&slot)
            .filter(|s| s.isolate == *isolate)
            .ok_or(TokenError::SlotNotFound(slot))
    }
}

/// Owner of every loaded token and the sessions opened on it.
///
/// The arena holds the only strong reference to each token pool. Sessions
/// reference their pool weakly, so unloading a token leaves any session a
/// client still holds closed and unable to reach the pool.
pub struct SlotArena {
    factory: TokenFactory,
    state: RwLock<ArenaState>,
}

impl SlotArena {
    pub fn new(factory: TokenFactory) -> Self {
        Self {
            factory,
            state: RwLock::new(ArenaState::default()),
        }
    }

    pub fn factory(&self) -> &TokenFactory {
        &self.factory
    }

    /// Load the token stored at `location` into a new slot owned by
    /// `isolate`.
    ///
    /// A location can back at most one loaded token; loading it again fails
    /// with [`TokenError::AlreadyLoaded`] until the first slot is unloaded.
    pub fn load_token(&self, isolate: &IsolateCredential, location: &Path) -> TokenResult<SlotId> {
        let resolved = resolve_location(location);
        // Held across store open so two loads of one path cannot race.
        let mut state = self.write();
        if let Some((slot, _)) = state.slots.iter().find(|(_, s)| s.resolved == resolved) {
            return Err(TokenError::AlreadyLoaded {
                path: location.to_path_buf(),
                slot: *slot,
            });
        }

        let store = self.factory.create_object_store(location);
        let durable = store.is_durable();
        let pool = self.factory.create_object_pool(store)?;
        let objects = pool.len();

        state.next_slot += 1;
        let slot = SlotId(state.next_slot);
        state.slots.insert(
            slot,
            Slot {
                isolate: isolate.clone(),
                location: location.to_path_buf(),
                resolved,
                pool,
                sessions: BTreeMap::new(),
            },
        );
        info!(%slot, path = %location.display(), durable, objects, "token loaded");
        Ok(slot)
    }

    /// Close every session on `slot`, then drop its pool.
    pub fn unload_token(&self, slot: SlotId) -> TokenResult<()> {
        let removed = self
            .write()
            .slots
            .remove(&slot)
            .ok_or(TokenError::SlotNotFound(slot))?;

        let sessions = removed.sessions.len();
        Self::close_sessions(removed.sessions.into_values());
        drop(removed.pool);
        info!(%slot, path = %removed.location.display(), sessions, "token unloaded");
        Ok(())
    }

    /// Slots owned by `isolate`, ascending.
    pub fn slots_for(&self, isolate: &IsolateCredential) -> Vec<SlotId> {
        self.read()
            .slots
            .iter()
            .filter(|(_, s)| s.isolate == *isolate)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Backing location of `slot`.
    pub fn location(&self, slot: SlotId) -> TokenResult<PathBuf> {
        self.read()
            .slots
            .get(&slot)
            .map(|s| s.location.clone())
            .ok_or(TokenError::SlotNotFound(slot))
    }

    /// Open a session on `slot` for a caller presenting `isolate`.
    ///
    /// A slot of another isolate is reported as not found.
    pub fn open_session(
        &self,
        slot: SlotId,
        isolate: &IsolateCredential,
        read_only: bool,
    ) -> TokenResult<(SessionId, Arc<Session>)> {
        let mut state = self.write();
        let pool = Arc::clone(&state.slot_for(slot, isolate)?.pool);
        let session = Arc::new(self.factory.create_session(slot, &pool, read_only));

        state.next_session += 1;
        let id = SessionId(state.next_session);
        if let Some(entry) = state.slots.get_mut(&slot) {
            entry.sessions.insert(id, Arc::clone(&session));
        }
        Ok((id, session))
    }

    /// The open session `id`.
    pub fn session(&self, id: SessionId) -> TokenResult<Arc<Session>> {
        self.read()
            .slots
            .values()
            .find_map(|s| s.sessions.get(&id).cloned())
            .ok_or(TokenError::SessionNotFound(id))
    }

    pub fn close_session(&self, id: SessionId) -> TokenResult<()> {
        let session = {
            let mut state = self.write();
            state
                .slots
                .values_mut()
                .find_map(|s| s.sessions.remove(&id))
                .ok_or(TokenError::SessionNotFound(id))?
        };
        session.close()?;
        Ok(())
    }

    /// Close every session on `slot`. Returns how many were closed.
    pub fn close_all_sessions(&self, slot: SlotId) -> TokenResult<usize> {
        let sessions = {
            let mut state = self.write();
            let entry = state
                .slots
                .get_mut(&slot)
                .ok_or(TokenError::SlotNotFound(slot))?;
            std::mem::take(&mut entry.sessions)
        };
        let count = sessions.len();
        Self::close_sessions(sessions.into_values());
        Ok(count)
    }

    /// Number of open sessions on `slot`.
    pub fn session_count(&self, slot: SlotId) -> TokenResult<usize> {
        self.read()
            .slots
            .get(&slot)
            .map(|s| s.sessions.len())
            .ok_or(TokenError::SlotNotFound(slot))
    }

    /// Make private objects on `slot` visible to its sessions.
    pub fn unlock_private(&self, slot: SlotId, isolate: &IsolateCredential) -> TokenResult<()> {
        self.read().slot_for(slot, isolate)?.pool.unlock_private();
        info!(%slot, "private objects unlocked");
        Ok(())
    }

    pub fn lock_private(&self, slot: SlotId, isolate: &IsolateCredential) -> TokenResult<()> {
        self.read().slot_for(slot, isolate)?.pool.lock_private();
        info!(%slot, "private objects locked");
        Ok(())
    }

    fn close_sessions(sessions: impl Iterator<Item = Arc<Session>>) {
        for session in sessions {
            if let Err(e) = session.close() {
                warn!(slot = %session.slot(), error = %e, "session close failed");
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ArenaState> {
        self.state.read().expect("arena lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, ArenaState> {
        self.state.write().expect("arena lock poisoned")
    }
}

/// Canonical form of `location`. The log may not exist yet, so fall back to
/// the canonical parent, then to the absolute path.
fn resolve_location(location: &Path) -> PathBuf {
    if let Ok(path) = fs::canonicalize(location) {
        return path;
    }
    if let (Some(parent), Some(name)) = (location.parent(), location.file_name()) {
        if let Ok(parent) = fs::canonicalize(parent) {
            return parent.join(name);
        }
    }
    std::path::absolute(location).unwrap_or_else(|_| location.to_path_buf())
}

impl Default for SlotArena {
    fn default() -> Self {
        Self::new(TokenFactory::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use vtok_isolate::default_isolate_credential;
    use vtok_pool::HandleGenerator;
    use vtok_session::{SessionError, SessionState};
    use vtok_store::StoreConfig;
    use vtok_types::{AttributeType, Attributes, ObjectClass};

    fn arena() -> SlotArena {
        SlotArena::new(TokenFactory::new(
            Arc::new(HandleGenerator::new()),
            StoreConfig::default(),
        ))
    }

    fn token_data(label: &str) -> Attributes {
        Attributes::new()
            .with(AttributeType::CLASS, ObjectClass::Data)
            .with(AttributeType::TOKEN, true)
            .with(AttributeType::LABEL, label)
            .with(AttributeType::VALUE, b"contents".as_slice())
    }

    fn all_objects(session: &Session) -> Vec<vtok_types::ObjectHandle> {
        session.find_objects_init(&Attributes::new()).unwrap();
        let found = session.find_objects(usize::MAX).unwrap();
        session.find_objects_final().unwrap();
        found
    }

    // -----------------------------------------------------------------------
    // Load and persistence
    // -----------------------------------------------------------------------
    #[test]
    fn token_objects_survive_unload_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("main/objects.log");
        let isolate = default_isolate_credential();
        let arena = arena();

        let slot = arena.load_token(&isolate, &location).unwrap();
        let (_, session) = arena.open_session(slot, &isolate, false).unwrap();
        let handle = session.create_object(&token_data("persisted")).unwrap();
        let expected = session.get_object(handle).unwrap().attributes().clone();
        arena.unload_token(slot).unwrap();

        let slot = arena.load_token(&isolate, &location).unwrap();
        let (_, session) = arena.open_session(slot, &isolate, true).unwrap();
        let found = all_objects(&session);
        assert_eq!(found.len(), 1);
        assert_eq!(*session.get_object(found[0]).unwrap().attributes(), expected);
        assert_eq!(arena.location(slot).unwrap(), location);
    }

    #[test]
    fn location_backs_one_loaded_token() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("main/objects.log");
        let isolate = default_isolate_credential();
        let arena = arena();

        let slot = arena.load_token(&isolate, &location).unwrap();
        match arena.load_token(&isolate, &location) {
            Err(TokenError::AlreadyLoaded { slot: owner, .. }) => assert_eq!(owner, slot),
            other => panic!("unexpected result: {other:?}"),
        }
        // Another spelling of the same file.
        let alias = dir.path().join("main/../main/./objects.log");
        assert!(matches!(
            arena.load_token(&isolate, &alias),
            Err(TokenError::AlreadyLoaded { .. })
        ));
        assert_eq!(arena.slots_for(&isolate), vec![slot]);

        let (_, session) = arena.open_session(slot, &isolate, false).unwrap();
        session.create_object(&token_data("one")).unwrap();
        session.create_object(&token_data("two")).unwrap();
        arena.unload_token(slot).unwrap();

        let slot = arena.load_token(&isolate, &location).unwrap();
        let (_, session) = arena.open_session(slot, &isolate, true).unwrap();
        assert_eq!(all_objects(&session).len(), 2);
    }

    #[test]
    fn unusable_location_degrades_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"not a directory").unwrap();
        let location = blocker.join("objects.log");
        let isolate = default_isolate_credential();
        let arena = arena();

        let slot = arena.load_token(&isolate, &location).unwrap();
        let (_, session) = arena.open_session(slot, &isolate, false).unwrap();
        let handle = session.create_object(&token_data("volatile")).unwrap();
        assert!(session.get_object(handle).is_ok());
        arena.unload_token(slot).unwrap();

        let slot = arena.load_token(&isolate, &location).unwrap();
        let (_, session) = arena.open_session(slot, &isolate, false).unwrap();
        assert!(all_objects(&session).is_empty());
    }

    // -----------------------------------------------------------------------
    // Isolate gating
    // -----------------------------------------------------------------------
    #[test]
    fn slots_are_scoped_to_their_isolate() {
        let dir = tempfile::tempdir().unwrap();
        let ours = IsolateCredential::generate();
        let theirs = IsolateCredential::generate();
        let arena = arena();

        let a = arena.load_token(&ours, &dir.path().join("a/objects.log")).unwrap();
        let b = arena.load_token(&theirs, &dir.path().join("b/objects.log")).unwrap();
        assert_eq!(arena.slots_for(&ours), vec![a]);
        assert_eq!(arena.slots_for(&theirs), vec![b]);
        assert!(arena.slots_for(&default_isolate_credential()).is_empty());

        assert!(matches!(
            arena.open_session(b, &ours, false),
            Err(TokenError::SlotNotFound(s)) if s == b
        ));
        assert!(matches!(
            arena.unlock_private(a, &theirs),
            Err(TokenError::SlotNotFound(_))
        ));
        assert!(arena.open_session(a, &ours, false).is_ok());
    }

    // -----------------------------------------------------------------------
    // Session bookkeeping
    // -----------------------------------------------------------------------
    #[test]
    fn unload_closes_sessions_before_dropping_pool() {
        let dir = tempfile::tempdir().unwrap();
        let isolate = default_isolate_credential();
        let arena = arena();
        let slot = arena
            .load_token(&isolate, &dir.path().join("t/objects.log"))
            .unwrap();
        let (id, session) = arena.open_session(slot, &isolate, false).unwrap();
        session
            .create_object(&Attributes::new().with(AttributeType::CLASS, ObjectClass::Data))
            .unwrap();

        arena.unload_token(slot).unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.session_object_count(), 0);
        assert!(matches!(
            session.create_object(&token_data("late")),
            Err(SessionError::SessionClosed)
        ));
        assert!(matches!(arena.session(id), Err(TokenError::SessionNotFound(_))));
        assert!(matches!(arena.unload_token(slot), Err(TokenError::SlotNotFound(_))));
    }

    #[test]
    fn close_session_and_close_all() {
        let dir = tempfile::tempdir().unwrap();
        let isolate = default_isolate_credential();
        let arena = arena();
        let slot = arena
            .load_token(&isolate, &dir.path().join("t/objects.log"))
            .unwrap();
        let (first, _) = arena.open_session(slot, &isolate, false).unwrap();
        let (second, kept) = arena.open_session(slot, &isolate, true).unwrap();
        arena.open_session(slot, &isolate, true).unwrap();
        assert_ne!(first, second);
        assert_eq!(arena.session_count(slot).unwrap(), 3);

        arena.close_session(first).unwrap();
        assert!(matches!(
            arena.close_session(first),
            Err(TokenError::SessionNotFound(_))
        ));
        assert!(arena.session(second).unwrap().is_read_only());

        assert_eq!(arena.close_all_sessions(slot).unwrap(), 2);
        assert_eq!(arena.session_count(slot).unwrap(), 0);
        assert!(!kept.is_open());
    }

    #[test]
    fn private_access_through_arena() {
        let dir = tempfile::tempdir().unwrap();
        let isolate = default_isolate_credential();
        let arena = arena();
        let slot = arena
            .load_token(&isolate, &dir.path().join("t/objects.log"))
            .unwrap();
        let (_, session) = arena.open_session(slot, &isolate, false).unwrap();
        let private = token_data("secret").with(AttributeType::PRIVATE, true);

        assert!(matches!(
            session.create_object(&private),
            Err(SessionError::UserNotLoggedIn)
        ));
        arena.unlock_private(slot, &isolate).unwrap();
        let handle = session.create_object(&private).unwrap();
        arena.lock_private(slot, &isolate).unwrap();
        assert!(matches!(
            session.get_object(handle),
            Err(SessionError::InvalidHandle(_))
        ));
    }
}
