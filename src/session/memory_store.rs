//! In-memory session storage.
//!
//! Suitable for development, testing, and single-instance deployments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::store::SessionStore;
use super::SessionPayload;
use crate::clock::{Clock, SystemClock};
use crate::SessionError;

/// In-memory session storage.
///
/// Stores payloads in a `HashMap` protected by a `RwLock`, keyed by session
/// id. An entry whose `exp` has passed is evicted the next time it is read.
///
/// # Note
///
/// Sessions are lost when the process restarts.
/// For persistent storage, use [`FileSessionStore`](super::FileSessionStore).
#[derive(Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionPayload>>>,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Uses `clock` to decide when entries have expired.
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock: Arc::new(clock),
        }
    }

    /// Returns the number of sessions currently stored, expired ones included.
    pub fn len(&self) -> usize {
        self.sessions.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes expired sessions.
    ///
    /// Returns the number of sessions pruned.
    #[allow(clippy::significant_drop_tightening)]
    pub fn prune_expired(&self) -> Result<u64, SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::Store("Lock poisoned".to_owned()))?;

        let now = self.clock.now();
        let before_count = sessions.len();

        sessions.retain(|_, payload| !payload.is_expired(now));

        let pruned = before_count.saturating_sub(sessions.len());
        Ok(u64::try_from(pruned).unwrap_or(u64::MAX))
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionPayload>, SessionError> {
        let now = self.clock.now();
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::Store("Lock poisoned".to_owned()))?;

        let Some(payload) = sessions.get(session_id).cloned() else {
            return Ok(None);
        };

        if payload.is_expired(now) {
            sessions.remove(session_id);
            return Ok(None);
        }

        Ok(Some(payload))
    }

    async fn set(&self, session_id: &str, payload: &SessionPayload) -> Result<bool, SessionError> {
        self.sessions
            .write()
            .map_err(|_| SessionError::Store("Lock poisoned".to_owned()))?
            .insert(session_id.to_owned(), payload.clone());

        Ok(true)
    }

    async fn delete(&self, session_id: &str) -> Result<bool, SessionError> {
        self.sessions
            .write()
            .map_err(|_| SessionError::Store("Lock poisoned".to_owned()))?
            .remove(session_id);

        Ok(true)
    }
}
