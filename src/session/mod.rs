mod config;
pub mod cookie;
pub mod fingerprint;
mod file_store;
mod manager;
mod memory_store;
mod payload;
#[cfg(feature = "redis")]
mod redis_store;
mod store;
#[cfg(any(test, feature = "mocks"))]
mod store_mock;

pub use config::{SameSite, SessionConfig};
pub use file_store::FileSessionStore;
pub use fingerprint::RequestOrigin;
pub use manager::SessionManager;
pub use memory_store::InMemorySessionStore;
pub use payload::{EXPIRES_KEY, HASH_KEY, SessionPayload, SessionValue};
#[cfg(feature = "redis")]
pub use redis_store::RedisSessionStore;
pub use store::SessionStore;
#[cfg(any(test, feature = "mocks"))]
pub use store_mock::{MockSessionStore, StoreCall};

use crate::SessionError;

pub(crate) const LOG_TARGET: &str = "rpc_session::session";

/// Where a [`Session`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing created or restored yet.
    Uninitialized,
    /// Payload loaded; reads, writes and saves are allowed.
    Active,
    /// Has an id but no payload, e.g. after `destroy`. Every payload
    /// operation fails with `SessionDataInvalid`.
    Invalid,
}

/// The session of a single request.
///
/// Produced by [`SessionManager`] and handed back to it for `save` and
/// `destroy`. Not shared between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: Option<String>,
    payload: Option<SessionPayload>,
    origin: RequestOrigin,
    is_new: bool,
}

impl Session {
    /// A session with neither id nor payload.
    pub fn uninitialized() -> Self {
        Self {
            id: None,
            payload: None,
            origin: RequestOrigin::default(),
            is_new: false,
        }
    }

    pub(crate) fn fresh(id: String, payload: SessionPayload, origin: RequestOrigin) -> Self {
        Self {
            id: Some(id),
            payload: Some(payload),
            origin,
            is_new: true,
        }
    }

    pub(crate) fn restored(id: String, payload: SessionPayload, origin: RequestOrigin) -> Self {
        Self {
            id: Some(id),
            payload: Some(payload),
            origin,
            is_new: false,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.id, &self.payload) {
            (_, Some(_)) => SessionState::Active,
            (Some(_), None) => SessionState::Invalid,
            (None, None) => SessionState::Uninitialized,
        }
    }

    /// # Errors
    ///
    /// `SessionIdMissing` if no id has been assigned yet.
    pub fn id(&self) -> Result<&str, SessionError> {
        self.id.as_deref().ok_or(SessionError::SessionIdMissing)
    }

    /// True when this request created the session rather than restoring it.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// User agent and origin of the request this session belongs to.
    pub fn origin(&self) -> &RequestOrigin {
        &self.origin
    }

    /// Returns the value at `key`, `None` if it isn't set.
    ///
    /// # Errors
    ///
    /// `SessionDataInvalid` if no payload is loaded.
    pub fn get(&self, key: &str) -> Result<Option<&SessionValue>, SessionError> {
        Ok(self.payload()?.get(key))
    }

    /// Returns a copy of the whole payload.
    ///
    /// # Errors
    ///
    /// `SessionDataInvalid` if no payload is loaded.
    pub fn get_all(&self) -> Result<SessionPayload, SessionError> {
        self.payload().cloned()
    }

    /// Sets `key` to `value`. The last write wins and nested maps are
    /// replaced whole.
    ///
    /// # Errors
    ///
    /// `SessionDataInvalid` if no payload is loaded; nothing is changed.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<SessionValue>,
    ) -> Result<&mut Self, SessionError> {
        self.payload_mut()?.insert(key, value);
        Ok(self)
    }

    /// Removes `key` if present.
    ///
    /// # Errors
    ///
    /// `SessionDataInvalid` if no payload is loaded.
    pub fn remove(&mut self, key: &str) -> Result<&mut Self, SessionError> {
        self.payload_mut()?.remove(key);
        Ok(self)
    }

    fn payload(&self) -> Result<&SessionPayload, SessionError> {
        self.payload.as_ref().ok_or(SessionError::SessionDataInvalid)
    }

    fn payload_mut(&mut self) -> Result<&mut SessionPayload, SessionError> {
        self.payload.as_mut().ok_or(SessionError::SessionDataInvalid)
    }

    /// Id, payload and origin together, for persisting. `None` unless active.
    pub(crate) fn parts_mut(&mut self) -> Option<(&str, &mut SessionPayload, &RequestOrigin)> {
        match (self.id.as_deref(), self.payload.as_mut()) {
            (Some(id), Some(payload)) => Some((id, payload, &self.origin)),
            _ => None,
        }
    }

    pub(crate) fn take_payload(&mut self) -> Option<SessionPayload> {
        self.payload.take()
    }

    pub(crate) fn assign_id(&mut self, id: String) {
        self.id = Some(id);
        self.is_new = true;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::uninitialized()
    }
}
