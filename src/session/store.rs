//! Session store trait.

use async_trait::async_trait;

use super::SessionPayload;
use crate::SessionError;

/// Key/value persistence for session payloads, keyed by session id.
///
/// Implementations provide different storage backends:
/// - [`InMemorySessionStore`](super::InMemorySessionStore): in-process map for tests and single instances
/// - [`FileSessionStore`](super::FileSessionStore): one JSON file per session
/// - `RedisSessionStore` (feature `redis`): shared Redis-compatible backend
///
/// Expiry enforcement belongs to the session engine. A store may evict an
/// entry once the payload's `exp` has passed, or it may keep returning it;
/// both are correct.
///
/// Backend failures are reported as [`SessionError::Store`] and never as a
/// missing session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the payload stored under `session_id`, `Ok(None)` if there is none.
    async fn get(&self, session_id: &str) -> Result<Option<SessionPayload>, SessionError>;

    /// Inserts or replaces the payload under `session_id`.
    ///
    /// When the payload carries a numeric `exp`, backends with native expiry
    /// should evict the entry no later than that instant.
    async fn set(&self, session_id: &str, payload: &SessionPayload) -> Result<bool, SessionError>;

    /// Removes `session_id`. Removing a missing id succeeds.
    async fn delete(&self, session_id: &str) -> Result<bool, SessionError>;
}

#[async_trait]
impl<S: SessionStore + ?Sized> SessionStore for std::sync::Arc<S> {
    async fn get(&self, session_id: &str) -> Result<Option<SessionPayload>, SessionError> {
        (**self).get(session_id).await
    }

    async fn set(&self, session_id: &str, payload: &SessionPayload) -> Result<bool, SessionError> {
        (**self).set(session_id, payload).await
    }

    async fn delete(&self, session_id: &str) -> Result<bool, SessionError> {
        (**self).delete(session_id).await
    }
}
