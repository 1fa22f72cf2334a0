//! File-based session storage.
//!
//! Stores sessions as JSON files in a directory.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::store::SessionStore;
use super::SessionPayload;
use crate::clock::{Clock, SystemClock};
use crate::SessionError;

/// File-based session storage.
///
/// Each session is stored as a JSON file named `{session_id}.json`
/// in the configured directory. Only alphanumeric ids are accepted, any
/// other id reads as missing and is never written.
///
/// # Example
///
/// ```rust,ignore
/// use rpc_session::session::FileSessionStore;
///
/// let store = FileSessionStore::new("/var/lib/myapp/sessions")?;
/// ```
pub struct FileSessionStore {
    directory: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileSessionStore {
    /// Creates a new file session store.
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let dir = directory.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            SessionError::Store(format!("Failed to create session directory: {e}"))
        })?;
        Ok(Self {
            directory: dir,
            clock: Arc::new(SystemClock),
        })
    }

    /// Uses `clock` to decide when entries have expired.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.directory.join(format!("{session_id}.json"))
    }

    /// Rejects ids that could escape the directory.
    fn is_safe_id(session_id: &str) -> bool {
        !session_id.is_empty() && session_id.chars().all(|c| c.is_ascii_alphanumeric())
    }

    /// Reads a payload from disk. Undecodable files read as missing.
    fn read_session(&self, session_id: &str) -> Result<Option<SessionPayload>, SessionError> {
        let path = self.session_path(session_id);

        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| SessionError::Store(format!("Failed to read session file: {e}")))?;

        match serde_json::from_str(&content) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) => {
                log::warn!(target: "rpc_session::session", "msg=\"undecodable session file\" error=\"{e}\"");
                Ok(None)
            }
        }
    }

    fn write_session(&self, session_id: &str, payload: &SessionPayload) -> Result<(), SessionError> {
        let path = self.session_path(session_id);

        let content = serde_json::to_string_pretty(payload)
            .map_err(|e| SessionError::Store(format!("Failed to serialize session: {e}")))?;

        std::fs::write(&path, content)
            .map_err(|e| SessionError::Store(format!("Failed to write session file: {e}")))?;

        Ok(())
    }

    fn remove_session(&self, session_id: &str) -> Result<(), SessionError> {
        let path = self.session_path(session_id);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| {
                SessionError::Store(format!("Failed to delete session file: {e}"))
            })?;
        }
        Ok(())
    }

    /// Removes expired sessions.
    ///
    /// Returns the number of sessions pruned.
    pub fn prune_expired(&self) -> Result<u64, SessionError> {
        let entries = std::fs::read_dir(&self.directory).map_err(|e| {
            SessionError::Store(format!("Failed to read session directory: {e}"))
        })?;

        let now = self.clock.now();
        let mut pruned = 0u64;

        for entry in entries.flatten() {
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "json") {
                if let Ok(content) = std::fs::read_to_string(&path) {
                    if let Ok(payload) = serde_json::from_str::<SessionPayload>(&content) {
                        if payload.is_expired(now) && std::fs::remove_file(&path).is_ok() {
                            pruned += 1;
                        }
                    }
                }
            }
        }

        Ok(pruned)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionPayload>, SessionError> {
        if !Self::is_safe_id(session_id) {
            return Ok(None);
        }

        match self.read_session(session_id)? {
            Some(payload) if payload.is_expired(self.clock.now()) => {
                self.remove_session(session_id)?;
                Ok(None)
            }
            found => Ok(found),
        }
    }

    async fn set(&self, session_id: &str, payload: &SessionPayload) -> Result<bool, SessionError> {
        if !Self::is_safe_id(session_id) {
            return Err(SessionError::Store(
                "Refusing to store session with non-alphanumeric id".to_owned(),
            ));
        }

        self.write_session(session_id, payload)?;
        Ok(true)
    }

    async fn delete(&self, session_id: &str) -> Result<bool, SessionError> {
        if Self::is_safe_id(session_id) {
            self.remove_session(session_id)?;
        }
        Ok(true)
    }
}
