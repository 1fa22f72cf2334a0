#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::store::SessionStore;
use super::SessionPayload;
use crate::SessionError;

/// A call received by [`MockSessionStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Get(String),
    Set(String, SessionPayload),
    Delete(String),
}

/// Store that records every call and never evicts.
///
/// `fail_with` makes every following call return `SessionError::Store`;
/// `reject_writes` makes `set` report `Ok(false)` without storing.
#[derive(Clone, Default)]
pub struct MockSessionStore {
    pub entries: Arc<Mutex<HashMap<String, SessionPayload>>>,
    pub calls: Arc<Mutex<Vec<StoreCall>>>,
    failure: Arc<Mutex<Option<String>>>,
    rejecting: Arc<Mutex<bool>>,
}

impl MockSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an entry without recording a call.
    pub fn insert(&self, session_id: &str, payload: SessionPayload) {
        self.entries
            .lock()
            .unwrap()
            .insert(session_id.to_owned(), payload);
    }

    pub fn entry(&self, session_id: &str) -> Option<SessionPayload> {
        self.entries.lock().unwrap().get(session_id).cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn get_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Get(_)))
    }

    pub fn set_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Set(..)))
    }

    pub fn delete_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Delete(_)))
    }

    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(message.into());
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
        *self.rejecting.lock().unwrap() = false;
    }

    pub fn reject_writes(&self) {
        *self.rejecting.lock().unwrap() = true;
    }

    fn count(&self, pred: impl Fn(&StoreCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: StoreCall) -> Result<(), SessionError> {
        self.calls.lock().unwrap().push(call);
        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(SessionError::Store(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionPayload>, SessionError> {
        self.record(StoreCall::Get(session_id.to_owned()))?;
        Ok(self.entry(session_id))
    }

    async fn set(&self, session_id: &str, payload: &SessionPayload) -> Result<bool, SessionError> {
        self.record(StoreCall::Set(session_id.to_owned(), payload.clone()))?;
        if *self.rejecting.lock().unwrap() {
            return Ok(false);
        }
        self.insert(session_id, payload.clone());
        Ok(true)
    }

    async fn delete(&self, session_id: &str) -> Result<bool, SessionError> {
        self.record(StoreCall::Delete(session_id.to_owned()))?;
        self.entries.lock().unwrap().remove(session_id);
        Ok(true)
    }
}
