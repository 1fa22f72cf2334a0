//! Session lifecycle: restore, validate, persist and destroy.

use http::HeaderMap;

use super::cookie::{build_removal_cookie, build_session_cookie, extract_session_id, write_cookie};
use super::fingerprint::{origin_hash, verify_origin_hash};
use super::{LOG_TARGET, RequestOrigin, Session, SessionConfig, SessionPayload, SessionStore};
use crate::SessionError;
use crate::clock::{Clock, SystemClock};
use crate::crypto::generate_token;

/// What a store lookup turned up for a client-supplied id.
#[derive(Debug)]
enum Restored {
    Found(SessionPayload),
    NotFound,
    Expired,
    OriginMismatch,
}

impl Restored {
    fn reason(&self) -> &'static str {
        match self {
            Restored::Found(_) => "found",
            Restored::NotFound => "not found",
            Restored::Expired => "expired",
            Restored::OriginMismatch => "origin mismatch",
        }
    }
}

/// Drives the lifecycle of per-request [`Session`] records against a store.
///
/// The manager holds only immutable configuration and the store handle, so
/// one instance can serve every request concurrently. Each request gets its
/// own `Session`, which is passed back explicitly to [`save`](Self::save)
/// and [`destroy`](Self::destroy).
///
/// Concurrent requests carrying the same session id aren't coordinated; the
/// last `save` wins.
pub struct SessionManager<S, C = SystemClock> {
    store: S,
    config: SessionConfig,
    clock: C,
}

impl<S: SessionStore> SessionManager<S> {
    /// # Errors
    ///
    /// `SessionError::Configuration` if `config` fails
    /// [`SessionConfig::validate`].
    pub fn new(store: S, config: SessionConfig) -> Result<Self, SessionError> {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: SessionStore, C: Clock> SessionManager<S, C> {
    /// Like [`new`](SessionManager::new) with an explicit time source.
    ///
    /// # Errors
    ///
    /// `SessionError::Configuration` if `config` fails
    /// [`SessionConfig::validate`].
    pub fn with_clock(store: S, config: SessionConfig, clock: C) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            clock,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Starts a brand-new session with a fresh id and `payload` (empty if
    /// `None`). Nothing is written until [`save`](Self::save).
    pub fn create(&self, payload: Option<SessionPayload>) -> Session {
        self.create_for(RequestOrigin::default(), payload)
    }

    /// Like [`create`](Self::create), bound to the client that sent `request`.
    pub fn create_from(&self, request: &HeaderMap, payload: Option<SessionPayload>) -> Session {
        self.create_for(RequestOrigin::from_headers(request), payload)
    }

    fn create_for(&self, origin: RequestOrigin, payload: Option<SessionPayload>) -> Session {
        let id = generate_token(self.config.id_length);
        self.debug(&format!("msg=\"session created\" id_prefix=\"{}\"", prefix(&id)));
        Session::fresh(id, payload.unwrap_or_default(), origin)
    }

    /// Restores the session named by the request cookie, failing instead of
    /// creating a new one.
    ///
    /// On success the session's `exp` (and `hash`) are refreshed and saved.
    ///
    /// # Errors
    ///
    /// - `SessionIdMissing` - no session cookie in the request
    /// - `SessionDataInvalid` - unknown id, or bound to another origin
    /// - `SessionExpired` - `exp` has passed; the entry is deleted
    /// - `Store` - backend failure
    ///
    /// Map all but `Store` to one client-facing rejection, see
    /// [`SessionError::public_message`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_validate", skip_all, err)
    )]
    pub async fn validate(&self, request: &HeaderMap) -> Result<Session, SessionError> {
        let id = extract_session_id(request, &self.config).ok_or_else(|| {
            self.debug("msg=\"session cookie missing\"");
            SessionError::SessionIdMissing
        })?;
        let origin = RequestOrigin::from_headers(request);

        let mut session = match self.restore(&id, &origin).await? {
            Restored::Found(payload) => Session::restored(id, payload, origin),
            Restored::Expired => return Err(SessionError::SessionExpired),
            Restored::NotFound | Restored::OriginMismatch => {
                return Err(SessionError::SessionDataInvalid);
            }
        };

        self.save(&mut session).await?;
        Ok(session)
    }

    /// Restores the session named by the request cookie, or starts a new one.
    ///
    /// A missing cookie, an unknown id, an expired session (which is deleted)
    /// or an origin mismatch all yield a fresh session with an empty
    /// payload. Either way the session cookie is written into `response` and
    /// the session is saved.
    ///
    /// # Errors
    ///
    /// Only store failures (`SessionError::Store`) and an unusable cookie
    /// configuration (`SessionError::Configuration`).
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_restore", skip_all, err)
    )]
    pub async fn restore_or_create(
        &self,
        request: &HeaderMap,
        response: &mut HeaderMap,
    ) -> Result<Session, SessionError> {
        let origin = RequestOrigin::from_headers(request);
        let token = extract_session_id(request, &self.config);

        let restored = match token.as_deref() {
            Some(id) => self.restore(id, &origin).await?,
            None => Restored::NotFound,
        };

        let mut session = match (token, restored) {
            (Some(id), Restored::Found(payload)) => Session::restored(id, payload, origin),
            (token, outcome) => {
                if token.is_some() {
                    log::info!(
                        target: LOG_TARGET,
                        "msg=\"session replaced\" reason=\"{}\"",
                        outcome.reason()
                    );
                }
                self.create_for(origin, None)
            }
        };

        self.emit_cookie(&session, response)?;
        self.save(&mut session).await?;

        Ok(session)
    }

    /// Looks `id` up and classifies the result. Expired entries are deleted.
    async fn restore(&self, id: &str, origin: &RequestOrigin) -> Result<Restored, SessionError> {
        let Some(payload) = self.store.get(id).await? else {
            self.debug(&format!("msg=\"session not in store\" id_prefix=\"{}\"", prefix(id)));
            return Ok(Restored::NotFound);
        };

        if payload.is_expired(self.clock.now()) {
            self.store.delete(id).await?;
            log::warn!(target: LOG_TARGET, "msg=\"session expired\" id_prefix=\"{}\"", prefix(id));
            return Ok(Restored::Expired);
        }

        if self.config.check_origin {
            if let Some(stored) = payload.origin_hash() {
                if !verify_origin_hash(stored, id, origin, &self.config.secret_key) {
                    log::warn!(
                        target: LOG_TARGET,
                        "msg=\"session origin mismatch\" id_prefix=\"{}\"",
                        prefix(id)
                    );
                    return Ok(Restored::OriginMismatch);
                }
            }
        }

        Ok(Restored::Found(payload))
    }

    /// Persists the session, stamping `exp = now + expires` and, with origin
    /// checking on, the current origin fingerprint.
    ///
    /// Returns the store's verdict; `false` means the write was refused and
    /// the client's cookie points at nothing.
    ///
    /// Every save pushes `exp` forward: the lifetime slides from the last
    /// save.
    ///
    /// # Errors
    ///
    /// - `SessionDataInvalid` - no payload loaded
    /// - `Store` - backend failure
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_save", skip_all, err)
    )]
    pub async fn save(&self, session: &mut Session) -> Result<bool, SessionError> {
        let now = self.clock.now();
        let (id, payload, origin) = session.parts_mut().ok_or(SessionError::SessionDataInvalid)?;

        if let Some(ttl) = self.config.ttl() {
            payload.set_expires_at(now + ttl.num_seconds());
        }
        if self.config.check_origin {
            payload.set_origin_hash(origin_hash(id, origin, &self.config.secret_key));
        }

        let saved = self.store.set(id, payload).await?;
        if !saved {
            log::warn!(target: LOG_TARGET, "msg=\"session not persisted\" id_prefix=\"{}\"", prefix(id));
        }
        self.debug(&format!(
            "msg=\"session saved\" id_prefix=\"{}\" exp={:?} saved={saved}",
            prefix(id),
            payload.expires_at()
        ));

        Ok(saved)
    }

    /// Deletes the session from the store and drops its payload.
    ///
    /// Works on sessions in any state and can be repeated; a session that
    /// never got an id has nothing to delete.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure, in which case the payload is kept.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_destroy", skip_all, err)
    )]
    pub async fn destroy(&self, session: &mut Session) -> Result<bool, SessionError> {
        let Ok(id) = session.id() else {
            return Ok(true);
        };

        let deleted = self.store.delete(id).await?;
        log::info!(target: LOG_TARGET, "msg=\"session destroyed\" id_prefix=\"{}\"", prefix(id));

        session.take_payload();
        Ok(deleted)
    }

    /// Moves the session's payload to a fresh id and hands the new id to the
    /// client. The old id is deleted from the store.
    ///
    /// Call after a privilege change (e.g. login) to rule out session
    /// fixation, then [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// - `SessionDataInvalid` - no payload loaded
    /// - `Store` - backend failure deleting the old id
    pub async fn regenerate(
        &self,
        session: &mut Session,
        response: &mut HeaderMap,
    ) -> Result<(), SessionError> {
        if session.parts_mut().is_none() {
            return Err(SessionError::SessionDataInvalid);
        }

        let old_id = session.id()?.to_owned();
        self.store.delete(&old_id).await?;

        let new_id = generate_token(self.config.id_length);
        log::info!(
            target: LOG_TARGET,
            "msg=\"session regenerated\" old_id_prefix=\"{}\" new_id_prefix=\"{}\"",
            prefix(&old_id),
            prefix(&new_id)
        );
        session.assign_id(new_id);

        self.emit_cookie(session, response)
    }

    /// Writes the session cookie for `session` into `response`.
    ///
    /// # Errors
    ///
    /// `SessionIdMissing` if the session has no id, `Configuration` if the
    /// cookie can't be expressed as a header.
    pub fn emit_cookie(&self, session: &Session, response: &mut HeaderMap) -> Result<(), SessionError> {
        let cookie = build_session_cookie(session.id()?, &self.config);
        write_cookie(response, &cookie, &self.config)
    }

    /// Writes a cookie that makes the client forget its session id.
    ///
    /// # Errors
    ///
    /// `Configuration` if the cookie can't be expressed as a header.
    pub fn emit_removal_cookie(&self, response: &mut HeaderMap) -> Result<(), SessionError> {
        write_cookie(response, &build_removal_cookie(&self.config), &self.config)
    }

    fn debug(&self, message: &str) {
        if self.config.debug {
            log::debug!(target: LOG_TARGET, "{message}");
        }
    }
}

impl<S: Clone, C: Clone> Clone for SessionManager<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            clock: self.clock.clone(),
        }
    }
}

/// First characters of an id, enough to correlate log lines.
fn prefix(id: &str) -> String {
    id.chars().take(8).collect()
}
