//! Cookie-carried server-side sessions for RPC handlers.
//!
//! A [`SessionManager`](session::SessionManager) restores a session from the
//! request metadata (a `cookie` header holding the session id), hands the
//! handler a [`Session`](session::Session) record to read and mutate, writes
//! the id back as a `Set-Cookie` response header and persists the payload in
//! a pluggable [`SessionStore`](session::SessionStore).
//!
//! # Example
//!
//! ```rust,no_run
//! use http::HeaderMap;
//! use rpc_session::session::{InMemorySessionStore, SessionConfig, SessionManager};
//!
//! # async fn handle(request: HeaderMap) -> Result<(), rpc_session::SessionError> {
//! let config = SessionConfig::strict("replace-with-a-secret-of-32-bytes-or-more");
//! let manager = SessionManager::new(InMemorySessionStore::new(), config)?;
//!
//! let mut response = HeaderMap::new();
//! let mut session = manager.restore_or_create(&request, &mut response).await?;
//! session.set("user", "alice")?;
//! manager.save(&mut session).await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod crypto;
pub mod session;

pub use clock::{Clock, SystemClock};
pub use crypto::SecretString;
pub use session::{
    Session, SessionConfig, SessionManager, SessionPayload, SessionState, SessionStore,
    SessionValue,
};

#[cfg(any(test, feature = "mocks"))]
pub use clock::MockClock;
#[cfg(any(test, feature = "mocks"))]
pub use session::{MockSessionStore, StoreCall};

use std::fmt;

/// Message shown to clients for every session rejection.
///
/// The specific kind stays in the logs so callers can't probe why a
/// session was refused.
pub const PUBLIC_SESSION_ERROR: &str = "Invalid session.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session id where one is required.
    SessionIdMissing,
    /// Payload accessed or persisted while none is loaded.
    SessionDataInvalid,
    /// The stored session's `exp` has passed.
    SessionExpired,
    /// Backend I/O, connectivity or serialization failure.
    Store(String),
    /// The session configuration can't be used as given.
    Configuration(String),
}

impl SessionError {
    /// Returns the message that is safe to send back to a client.
    ///
    /// Store and configuration failures are server faults and read as such;
    /// every rejection of the session itself collapses into one message.
    pub fn public_message(&self) -> &'static str {
        match self {
            SessionError::Store(_) | SessionError::Configuration(_) => "Internal server error.",
            _ => PUBLIC_SESSION_ERROR,
        }
    }

    /// True for errors caused by the backend rather than the session.
    pub fn is_store_error(&self) -> bool {
        matches!(self, SessionError::Store(_))
    }
}

impl std::error::Error for SessionError {}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::SessionIdMissing => write!(f, "Invalid session id"),
            SessionError::SessionDataInvalid => write!(f, "Invalid session data"),
            SessionError::SessionExpired => write!(f, "Session has expired"),
            SessionError::Store(msg) => write!(f, "Session store error: {}", msg),
            SessionError::Configuration(msg) => write!(f, "Invalid session configuration: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_message_hides_reason() {
        assert_eq!(SessionError::SessionIdMissing.public_message(), PUBLIC_SESSION_ERROR);
        assert_eq!(SessionError::SessionDataInvalid.public_message(), PUBLIC_SESSION_ERROR);
        assert_eq!(SessionError::SessionExpired.public_message(), PUBLIC_SESSION_ERROR);
        assert_ne!(
            SessionError::Store("connection refused".to_owned()).public_message(),
            PUBLIC_SESSION_ERROR
        );
    }

    #[test]
    fn test_store_error_keeps_message() {
        let err = SessionError::Store("connection refused".to_owned());
        assert!(err.is_store_error());
        assert_eq!(err.to_string(), "Session store error: connection refused");
    }
}
