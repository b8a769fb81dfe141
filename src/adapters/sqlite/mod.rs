//! SQLite adapter: Implementation of SessionStore.
//!
//! Keeps each session's latest prediction in a local SQLite file so results
//! survive a restart of the web process.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned mutex is reported as
//! a backend error rather than a panic.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{PredictionResult, SessionId};
use crate::ports::{SessionError, SessionStore};

impl From<rusqlite::Error> for SessionError {
    fn from(e: rusqlite::Error) -> Self {
        SessionError::Backend(e.to_string())
    }
}

/// SQLite session store.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
    ttl: Duration,
}

impl SqliteSessionStore {
    /// Open (or create) the session database at `path`.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P, ttl: Duration) -> Result<Self, SessionError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, ttl)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory(ttl: Duration) -> Result<Self, SessionError> {
        Self::with_connection(Connection::open_in_memory()?, ttl)
    }

    fn with_connection(conn: Connection, ttl: Duration) -> Result<Self, SessionError> {
        let store = Self {
            conn: Mutex::new(conn),
            ttl,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SessionError> {
        self.conn
            .lock()
            .map_err(|_| SessionError::Backend("session database lock poisoned".into()))
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), SessionError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS session_predictions (
                session_id TEXT PRIMARY KEY,
                prediction INTEGER NOT NULL,
                p_negative REAL NOT NULL,
                p_positive REAL NOT NULL,
                created_at TEXT NOT NULL,
                updated_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_session_predictions_updated
                ON session_predictions(updated_at_ms);
            ",
        )?;

        Ok(())
    }

    /// Rows last written at or before this instant have expired. A TTL
    /// reaching past the earliest representable time never expires anything.
    fn cutoff_ms(&self) -> i64 {
        Utc::now()
            .checked_sub_signed(self.ttl)
            .map_or(i64::MIN, |t| t.timestamp_millis())
    }
}

impl SessionStore for SqliteSessionStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn save_prediction(
        &self,
        session: &SessionId,
        result: &PredictionResult,
    ) -> Result<(), SessionError> {
        let conn = self.lock()?;

        conn.execute(
            r"
            INSERT OR REPLACE INTO session_predictions (
                session_id, prediction, p_negative, p_positive, created_at, updated_at_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                session.to_string(),
                i64::from(result.prediction),
                result.probabilities[0],
                result.probabilities[1],
                result.created_at.to_rfc3339(),
                Utc::now().timestamp_millis(),
            ],
        )?;

        Ok(())
    }

    fn load_prediction(
        &self,
        session: &SessionId,
    ) -> Result<Option<PredictionResult>, SessionError> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                r"
                SELECT prediction, p_negative, p_positive, created_at
                FROM session_predictions
                WHERE session_id = ?1 AND updated_at_ms > ?2
                ",
                params![session.to_string(), self.cutoff_ms()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((prediction, p_negative, p_positive, created_at)) = row else {
            return Ok(None);
        };

        let prediction = u8::try_from(prediction)
            .ok()
            .filter(|p| *p <= 1)
            .ok_or_else(|| SessionError::Corrupt(format!("prediction {prediction}")))?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| SessionError::Corrupt(format!("created_at: {e}")))?
            .with_timezone(&Utc);

        Ok(Some(PredictionResult {
            prediction,
            probabilities: [p_negative, p_positive],
            created_at,
        }))
    }

    fn remove(&self, session: &SessionId) -> Result<(), SessionError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM session_predictions WHERE session_id = ?1",
            params![session.to_string()],
        )?;
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, SessionError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM session_predictions WHERE updated_at_ms <= ?1",
            params![self.cutoff_ms()],
        )?;
        if removed > 0 {
            tracing::debug!("Purged {removed} expired session(s)");
        }
        Ok(removed)
    }

    fn count(&self) -> Result<usize, SessionError> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM session_predictions", [], |row| {
                row.get(0)
            })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
