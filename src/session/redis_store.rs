//! Redis-backed session storage.
//!
//! Payloads are stored as JSON text. When a payload carries a numeric
//! `exp`, the key is written with `SET ... EXAT <exp>` so Redis evicts it on
//! its own; the session engine still checks `exp` on every restore.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::store::SessionStore;
use super::{LOG_TARGET, SessionPayload};
use crate::SessionError;

/// Session store over a Redis-compatible server.
///
/// Cloning is cheap; clones share the underlying connection manager, which
/// reconnects on its own after a dropped connection.
///
/// # Example
///
/// ```rust,ignore
/// use rpc_session::session::RedisSessionStore;
///
/// let store = RedisSessionStore::connect("redis://127.0.0.1:6379")
///     .await?
///     .with_prefix("myapp:session:");
/// ```
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    /// Opens a managed connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Store` if the URL is invalid or the server
    /// can't be reached.
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        let client = redis::Client::open(url).map_err(|e| backend_error("connect", &e))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| backend_error("connect", &e))?;
        Ok(Self::new(connection))
    }

    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            prefix: String::new(),
        }
    }

    /// Namespaces every key, so several applications can share a database.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}{}", self.prefix, session_id)
    }
}

fn backend_error(operation: &str, e: &redis::RedisError) -> SessionError {
    log::error!(target: LOG_TARGET, "msg=\"redis error\" operation=\"{operation}\" error=\"{e}\"");
    SessionError::Store(e.to_string())
}

/// Decodes a stored value. Anything that isn't a JSON payload map, including
/// bytes that aren't UTF-8, reads as missing.
fn decode(raw: &[u8]) -> Option<SessionPayload> {
    match serde_json::from_slice(raw) {
        Ok(payload) => Some(payload),
        Err(e) => {
            log::warn!(target: LOG_TARGET, "msg=\"undecodable session payload\" error=\"{e}\"");
            None
        }
    }
}

/// `SET key value`, with `EXAT <exp>` when the payload carries a positive
/// `exp`. Redis rejects non-positive `EXAT` timestamps.
fn set_command(key: &str, value: &[u8], payload: &SessionPayload) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);
    if let Some(exp) = payload.expires_at().filter(|exp| *exp > 0) {
        cmd.arg("EXAT").arg(exp);
    }
    cmd
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionPayload>, SessionError> {
        let mut conn = self.connection.clone();
        let raw: Option<Vec<u8>> = conn
            .get(self.key(session_id))
            .await
            .map_err(|e| backend_error("get", &e))?;

        Ok(raw.as_deref().and_then(decode))
    }

    async fn set(&self, session_id: &str, payload: &SessionPayload) -> Result<bool, SessionError> {
        let value = serde_json::to_vec(payload)
            .map_err(|e| SessionError::Store(format!("Failed to serialize session: {e}")))?;

        let mut conn = self.connection.clone();
        let reply: Option<String> = set_command(&self.key(session_id), &value, payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| backend_error("set", &e))?;

        Ok(reply.as_deref() == Some("OK"))
    }

    async fn delete(&self, session_id: &str) -> Result<bool, SessionError> {
        let mut conn = self.connection.clone();
        let _removed: i64 = conn
            .del(self.key(session_id))
            .await
            .map_err(|e| backend_error("delete", &e))?;

        Ok(true)
    }
}
