//! Origin fingerprint binding a session id to the client that created it.
//!
//! The fingerprint is `HMAC-SHA256(secret, "{id}:{user_agent}:{origin}")`,
//! hex encoded and stored in the payload under `hash`. A restored session
//! whose stored fingerprint doesn't match the current request is treated as
//! unknown, which defeats replaying a stolen id from another client.

use http::HeaderMap;
use http::header::{HeaderName, ORIGIN, USER_AGENT};

use crate::SecretString;
use crate::crypto::{constant_time_eq, hmac_sha256_hex};

/// Transport identity of a request. Missing headers are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    pub user_agent: String,
    pub origin: String,
}

impl RequestOrigin {
    pub fn new(user_agent: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            origin: origin.into(),
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned()
        };

        Self {
            user_agent: read(USER_AGENT),
            origin: read(ORIGIN),
        }
    }
}

/// Computes the fingerprint for `session_id` seen from `origin`.
pub fn origin_hash(session_id: &str, origin: &RequestOrigin, secret: &SecretString) -> String {
    let message = format!("{}:{}:{}", session_id, origin.user_agent, origin.origin);
    hmac_sha256_hex(secret.expose_secret().as_bytes(), message.as_bytes())
}

/// Checks a stored fingerprint against the current request.
pub fn verify_origin_hash(
    stored: &str,
    session_id: &str,
    origin: &RequestOrigin,
    secret: &SecretString,
) -> bool {
    let expected = origin_hash(session_id, origin, secret);
    constant_time_eq(expected.as_bytes(), stored.as_bytes())
}
