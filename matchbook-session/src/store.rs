use crate::models::{GuestSession, LocationContext};
use crate::SessionError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Default cookie/session lifetime. Browsers may clamp the effective cookie
/// expiry; the requested value is a request, not a guarantee.
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 3650;

/// In-memory guest session store. Possession of the session token is the
/// only capability check on mutation; no authenticated identity is involved.
pub struct GuestSessionStore {
    sessions: HashMap<Uuid, GuestSession>,
    ttl_days: i64,
}

impl GuestSessionStore {
    pub fn new() -> Self {
        Self::with_ttl_days(DEFAULT_SESSION_TTL_DAYS)
    }

    pub fn with_ttl_days(ttl_days: i64) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl_days,
        }
    }

    /// Issue a new opaque session token seeded with the visitor's context.
    pub fn create_session(&mut self, context: LocationContext) -> GuestSession {
        let session = GuestSession::new(context, self.ttl_days);
        tracing::debug!(session_id = %session.id, "Guest session created");
        self.sessions.insert(session.id, session.clone());
        session
    }

    pub fn get(&self, session_id: &Uuid) -> Option<&GuestSession> {
        self.sessions.get(session_id)
    }

    /// Fetch a session that is still usable for guest mutations.
    pub fn get_active(&self, session_id: &Uuid) -> Result<&GuestSession, SessionError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;
        if session.is_expired(Utc::now()) {
            return Err(SessionError::SessionExpired(session_id.to_string()));
        }
        Ok(session)
    }

    pub fn is_converted(&self, session_id: &Uuid) -> bool {
        self.sessions
            .get(session_id)
            .map(|s| s.is_converted())
            .unwrap_or(false)
    }

    /// Stamp a session as converted. Callers must re-parent the session's
    /// ledger rows in the same unit of work; the migration processor is the
    /// only intended caller.
    pub(crate) fn mark_converted(
        &mut self,
        session_id: &Uuid,
        trip_id: Uuid,
        converted_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;
        if session.is_converted() {
            return Err(SessionError::AlreadyConverted(session_id.to_string()));
        }
        session.converted_at = Some(converted_at);
        session.trip_id = Some(trip_id);
        Ok(())
    }

    /// Test cleanup only; the application never deletes sessions.
    pub fn remove(&mut self, session_id: &Uuid) -> Option<GuestSession> {
        self.sessions.remove(session_id)
    }
}

impl Default for GuestSessionStore {
    fn default() -> Self {
        Self::new()
    }
}
