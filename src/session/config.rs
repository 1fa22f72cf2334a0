use chrono::Duration;

use crate::SecretString;
use crate::SessionError;
use crate::crypto::DEFAULT_TOKEN_LENGTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    None,
    Lax,
    Strict,
}

impl From<SameSite> for cookie::SameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::None => cookie::SameSite::None,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::Strict => cookie::SameSite::Strict,
        }
    }
}

/// Settings for a [`SessionManager`](super::SessionManager).
///
/// Fixed once the manager is built.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cookie name carrying the session id.
    pub session_name: String,
    /// Sliding lifetime, measured from the last save. `None` or zero writes
    /// no `exp` and emits `Max-Age=0`.
    pub expires: Option<Duration>,
    /// Bind sessions to the user agent and origin that created them.
    pub check_origin: bool,
    pub cookie_path: String,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub cookie_http_only: bool,
    pub cookie_same_site: Option<SameSite>,
    /// Request metadata key holding the cookies.
    pub request_header: String,
    /// Response metadata key the session cookie is written to.
    pub response_header: String,
    /// HMAC key for the origin fingerprint.
    pub secret_key: SecretString,
    /// Length of generated session ids.
    pub id_length: usize,
    /// Log every lifecycle decision at debug level.
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_name: "_SID".to_owned(),
            expires: Some(Duration::hours(20)),
            check_origin: true,
            cookie_path: "/".to_owned(),
            cookie_domain: None,
            cookie_secure: false,
            cookie_http_only: true,
            cookie_same_site: None,
            request_header: "cookie".to_owned(),
            response_header: "set-cookie".to_owned(),
            secret_key: SecretString::default(),
            id_length: DEFAULT_TOKEN_LENGTH,
            debug: false,
        }
    }
}

impl SessionConfig {
    /// Local development: no origin binding, a day-long lifetime and
    /// verbose logging.
    pub fn development() -> Self {
        Self {
            expires: Some(Duration::hours(24)),
            check_origin: false,
            cookie_same_site: Some(SameSite::Lax),
            debug: true,
            ..Self::default()
        }
    }

    /// Short-lived, secure-only sessions bound to their origin.
    pub fn strict(secret_key: impl Into<SecretString>) -> Self {
        Self {
            expires: Some(Duration::hours(2)),
            check_origin: true,
            cookie_secure: true,
            cookie_same_site: Some(SameSite::Strict),
            secret_key: secret_key.into(),
            ..Self::default()
        }
    }

    /// The configured lifetime, `None` unless it is at least one second.
    pub fn ttl(&self) -> Option<Duration> {
        self.expires.filter(|ttl| ttl.num_seconds() > 0)
    }

    /// Lifetime in whole seconds, 0 when no expiry is configured.
    pub fn expires_secs(&self) -> i64 {
        self.ttl().map_or(0, |ttl| ttl.num_seconds())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Configuration` naming the first bad setting.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.session_name.is_empty() {
            return Err(SessionError::Configuration(
                "session_name must not be empty".to_owned(),
            ));
        }
        if self.id_length < 16 {
            return Err(SessionError::Configuration(
                "id_length should be at least 16 characters".to_owned(),
            ));
        }
        if self.expires.is_some_and(|ttl| ttl.num_seconds() < 0) {
            return Err(SessionError::Configuration(
                "expires must not be negative, use None to disable expiry".to_owned(),
            ));
        }
        if self.check_origin && self.secret_key.len() < 32 {
            return Err(SessionError::Configuration(
                "secret_key should be at least 32 bytes when check_origin is enabled".to_owned(),
            ));
        }
        Ok(())
    }
}
