use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Default session id length in characters.
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Key material that must never end up in logs.
///
/// `Debug` and `Display` print `[REDACTED]`; use [`expose_secret`](Self::expose_secret)
/// at the point where the raw bytes are needed.
///
/// ```rust
/// use rpc_session::SecretString;
///
/// let key = SecretString::new("origin-binding-key");
/// assert_eq!(format!("{key:?}"), "SecretString([REDACTED])");
/// assert_eq!(key.expose_secret(), "origin-binding-key");
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Generates a random alphanumeric token (a-z, A-Z, 0-9).
///
/// Tokens are URL and cookie safe as-is, about 5.95 bits of entropy per
/// character.
///
/// ```rust
/// use rpc_session::crypto::generate_token;
///
/// let id = generate_token(32);
/// assert_eq!(id.len(), 32);
/// ```
pub fn generate_token(length: usize) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
        .collect()
}

/// HMAC-SHA256 of `message` under `key`, hex encoded.
pub fn hmac_sha256_hex(key: &[u8], message: &[u8]) -> String {
    // HMAC accepts keys of any length, new_from_slice can't fail here.
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison to prevent timing attacks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_length() {
        assert_eq!(generate_token(16).len(), 16);
        assert_eq!(generate_token(DEFAULT_TOKEN_LENGTH).len(), DEFAULT_TOKEN_LENGTH);
    }

    #[test]
    fn test_generate_token_unique() {
        assert_ne!(generate_token(32), generate_token(32));
    }

    #[test]
    fn test_generate_token_alphanumeric() {
        let token = generate_token(100);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_hmac_deterministic_and_keyed() {
        let a = hmac_sha256_hex(b"key-one", b"message");
        let b = hmac_sha256_hex(b"key-one", b"message");
        let c = hmac_sha256_hex(b"key-two", b"message");

        assert_eq!(a, b);
        assert_ne!(a, c);
        // 32 bytes hex encoded
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hmac_accepts_empty_key() {
        assert_eq!(hmac_sha256_hex(b"", b"message").len(), 64);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hello!"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_secret_string_redacted() {
        let secret = SecretString::new("hunter2");
        assert_eq!(format!("{secret:?}"), "SecretString([REDACTED])");
        assert_eq!(format!("{secret}"), "[REDACTED]");
        assert_eq!(secret.len(), 7);
    }
}
