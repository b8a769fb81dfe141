//! In-memory session store.
//!
//! Entries live for the lifetime of the process. Used by default and in tests.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{PredictionResult, SessionId};
use crate::ports::{SessionError, SessionStore};

#[derive(Debug, Clone, Copy)]
struct Entry {
    result: PredictionResult,
    updated_at: DateTime<Utc>,
}

/// Session store backed by a `HashMap` behind an `RwLock`.
pub struct MemorySessionStore {
    entries: RwLock<HashMap<SessionId, Entry>>,
    ttl: Duration,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_live(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.updated_at) < self.ttl
    }

    fn poisoned() -> SessionError {
        SessionError::Backend("session map lock poisoned".into())
    }
}

impl SessionStore for MemorySessionStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn save_prediction(
        &self,
        session: &SessionId,
        result: &PredictionResult,
    ) -> Result<(), SessionError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert(
            *session,
            Entry {
                result: *result,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn load_prediction(
        &self,
        session: &SessionId,
    ) -> Result<Option<PredictionResult>, SessionError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        let now = Utc::now();
        Ok(entries
            .get(session)
            .filter(|e| self.is_live(e, now))
            .map(|e| e.result))
    }

    fn remove(&self, session: &SessionId) -> Result<(), SessionError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.remove(session);
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, SessionError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, e| now.signed_duration_since(e.updated_at) < self.ttl);
        Ok(before - entries.len())
    }

    fn count(&self) -> Result<usize, SessionError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.len())
    }
}
