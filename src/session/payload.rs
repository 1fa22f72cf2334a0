//! Session payload: a string-keyed map of JSON-like scalars and nested maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Reserved key holding the absolute expiry in epoch seconds.
pub const EXPIRES_KEY: &str = "exp";

/// Reserved key holding the origin fingerprint.
pub const HASH_KEY: &str = "hash";

/// A value stored in a session.
///
/// Arrays are deliberately not representable; a stored payload that contains
/// one fails to decode and is treated as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Map(BTreeMap<String, SessionValue>),
}

impl SessionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SessionValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SessionValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SessionValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SessionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, SessionValue>> {
        match self {
            SessionValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SessionValue::Null)
    }
}

impl From<&str> for SessionValue {
    fn from(s: &str) -> Self {
        SessionValue::String(s.to_owned())
    }
}

impl From<String> for SessionValue {
    fn from(s: String) -> Self {
        SessionValue::String(s)
    }
}

impl From<bool> for SessionValue {
    fn from(b: bool) -> Self {
        SessionValue::Bool(b)
    }
}

impl From<i32> for SessionValue {
    fn from(n: i32) -> Self {
        SessionValue::Number(n.into())
    }
}

impl From<i64> for SessionValue {
    fn from(n: i64) -> Self {
        SessionValue::Number(n.into())
    }
}

impl From<u64> for SessionValue {
    fn from(n: u64) -> Self {
        SessionValue::Number(n.into())
    }
}

/// Non-finite floats have no JSON form and become `Null`.
impl From<f64> for SessionValue {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(SessionValue::Null, SessionValue::Number)
    }
}

impl<T: Into<SessionValue>> From<Option<T>> for SessionValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SessionValue::Null, Into::into)
    }
}

impl From<BTreeMap<String, SessionValue>> for SessionValue {
    fn from(map: BTreeMap<String, SessionValue>) -> Self {
        SessionValue::Map(map)
    }
}

/// The keyed data held by a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionPayload(BTreeMap<String, SessionValue>);

impl SessionPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&SessionValue> {
        self.0.get(key)
    }

    /// Inserts `value` at `key`, replacing whatever was there. Nested maps
    /// are replaced whole, never merged.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SessionValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<SessionValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SessionValue)> {
        self.0.iter()
    }

    /// Absolute expiry in epoch seconds, if a numeric `exp` is present.
    pub fn expires_at(&self) -> Option<i64> {
        match self.0.get(EXPIRES_KEY)? {
            SessionValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            _ => None,
        }
    }

    pub fn set_expires_at(&mut self, at: i64) {
        self.insert(EXPIRES_KEY, at);
    }

    /// True when `exp` is present and not after `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }

    pub fn origin_hash(&self) -> Option<&str> {
        self.0.get(HASH_KEY).and_then(SessionValue::as_str)
    }

    pub fn set_origin_hash(&mut self, hash: String) {
        self.insert(HASH_KEY, hash);
    }
}

impl<K: Into<String>, V: Into<SessionValue>> FromIterator<(K, V)> for SessionPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<BTreeMap<String, SessionValue>> for SessionPayload {
    fn from(map: BTreeMap<String, SessionValue>) -> Self {
        Self(map)
    }
}

impl From<SessionPayload> for BTreeMap<String, SessionValue> {
    fn from(payload: SessionPayload) -> Self {
        payload.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let mut profile = BTreeMap::new();
        profile.insert("name".to_owned(), SessionValue::from("Ada"));

        let mut payload = SessionPayload::new();
        payload.insert("user_id", 42);
        payload.insert("admin", false);
        payload.insert("note", SessionValue::Null);
        payload.insert("profile", profile);

        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            json,
            r#"{"admin":false,"note":null,"profile":{"name":"Ada"},"user_id":42}"#
        );

        let decoded: SessionPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_arrays_rejected() {
        let result = serde_json::from_str::<SessionPayload>(r#"{"roles":["a","b"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(serde_json::from_str::<SessionPayload>("42").is_err());
        assert!(serde_json::from_str::<SessionPayload>("null").is_err());
    }

    #[test]
    fn test_insert_replaces_nested_map() {
        let mut first = BTreeMap::new();
        first.insert("a".to_owned(), SessionValue::from(1));
        first.insert("b".to_owned(), SessionValue::from(2));
        let mut second = BTreeMap::new();
        second.insert("c".to_owned(), SessionValue::from(3));

        let mut payload = SessionPayload::new();
        payload.insert("nested", first);
        payload.insert("nested", second.clone());

        assert_eq!(payload.get("nested"), Some(&SessionValue::Map(second)));
    }

    #[test]
    fn test_expiry_helpers() {
        let mut payload = SessionPayload::new();
        assert_eq!(payload.expires_at(), None);
        assert!(!payload.is_expired(i64::MAX));

        payload.set_expires_at(1_000);
        assert_eq!(payload.expires_at(), Some(1_000));
        assert!(!payload.is_expired(999));
        assert!(payload.is_expired(1_000));
        assert!(payload.is_expired(1_001));
    }

    #[test]
    fn test_float_expiry_truncated() {
        let payload: SessionPayload = serde_json::from_str(r#"{"exp":1000.7}"#).unwrap();
        assert_eq!(payload.expires_at(), Some(1_000));
    }

    #[test]
    fn test_string_expiry_ignored() {
        let payload: SessionPayload = serde_json::from_str(r#"{"exp":"1000"}"#).unwrap();
        assert_eq!(payload.expires_at(), None);
    }

    #[test]
    fn test_from_iter() {
        let payload: SessionPayload = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get("b").and_then(SessionValue::as_i64), Some(2));
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert!(SessionValue::from(f64::NAN).is_null());
        assert_eq!(SessionValue::from(1.5).as_f64(), Some(1.5));
    }
}
