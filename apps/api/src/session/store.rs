//! In-memory session store. Sessions live only as long as the process.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;
use uuid::Uuid;

use crate::session::cancel::CancelFlag;
use crate::session::Session;

/// One session plus the cancellation handle of its in-flight turn, which
/// stays reachable while the session lock is held by that turn.
#[derive(Debug)]
pub struct SessionHandle {
    pub session: AsyncMutex<Session>,
    in_flight: Mutex<Option<Arc<CancelFlag>>>,
}

impl SessionHandle {
    fn new(session: Session) -> Self {
        Self {
            session: AsyncMutex::new(session),
            in_flight: Mutex::new(None),
        }
    }

    /// Registers a fresh cancellation flag for the turn about to run.
    /// Dropping the guard unregisters it.
    pub fn begin_turn(&self) -> InFlightTurn<'_> {
        let flag = Arc::new(CancelFlag::new());
        *self.in_flight.lock() = Some(flag.clone());
        InFlightTurn { handle: self, flag }
    }

    /// Cancels the running turn. Returns false when nothing is in flight.
    pub fn cancel_in_flight(&self) -> bool {
        match self.in_flight.lock().as_ref() {
            Some(flag) => {
                flag.cancel();
                true
            }
            None => false,
        }
    }
}

pub struct InFlightTurn<'a> {
    handle: &'a SessionHandle,
    flag: Arc<CancelFlag>,
}

impl InFlightTurn<'_> {
    pub fn flag(&self) -> &CancelFlag {
        &self.flag
    }
}

impl Drop for InFlightTurn<'_> {
    fn drop(&mut self) {
        *self.handle.in_flight.lock() = None;
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionHandle>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> Arc<SessionHandle> {
        let id = Uuid::new_v4();
        let handle = Arc::new(SessionHandle::new(Session::new(id)));
        self.sessions.write().insert(id, handle.clone());
        info!("created session (session_id={id})");
        handle
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<SessionHandle>> {
        self.sessions.read().get(&id).cloned()
    }

    /// Drops the session. A turn still running keeps its own handle alive
    /// until it finishes.
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().remove(&id);
        if let Some(handle) = &removed {
            handle.cancel_in_flight();
            info!("deleted session (session_id={id})");
        }
        removed.is_some()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_get_remove() {
        let store = SessionStore::new();
        let handle = store.create();
        let id = handle.session.lock().await.id;
        assert!(store.get(id).is_some());
        assert_eq!(store.len(), 1);
        assert!(store.remove(id));
        assert!(store.get(id).is_none());
        assert!(!store.remove(id));
    }

    #[test]
    fn test_cancel_reaches_registered_turn_only() {
        let store = SessionStore::new();
        let handle = store.create();
        assert!(!handle.cancel_in_flight());
        {
            let turn = handle.begin_turn();
            assert!(handle.cancel_in_flight());
            assert!(turn.flag().is_cancelled());
        }
        assert!(!handle.cancel_in_flight());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.create();
        let b = store.create();
        let _turn = a.begin_turn();
        assert!(!b.cancel_in_flight());
        assert!(a.cancel_in_flight());
    }
}
