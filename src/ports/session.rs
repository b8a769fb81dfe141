//! Session port: Trait for per-caller result storage.
//!
//! Holds the most recent prediction for each session. A later successful
//! submission overwrites the earlier one; entries older than the store's
//! time-to-live are treated as absent.

use crate::domain::{PredictionResult, SessionId};

/// Error type for session storage operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session backend error: {0}")]
    Backend(String),

    #[error("Corrupt session entry: {0}")]
    Corrupt(String),
}

/// Trait for per-caller prediction storage.
pub trait SessionStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Store `result` as the latest prediction for `session`.
    ///
    /// # Errors
    /// Returns error if the backend write fails.
    fn save_prediction(
        &self,
        session: &SessionId,
        result: &PredictionResult,
    ) -> Result<(), SessionError>;

    /// Latest live prediction for `session`.
    ///
    /// # Returns
    /// `None` if nothing was stored or the entry has expired.
    ///
    /// # Errors
    /// Returns error if the backend read fails.
    fn load_prediction(
        &self,
        session: &SessionId,
    ) -> Result<Option<PredictionResult>, SessionError>;

    /// Forget `session`.
    ///
    /// # Errors
    /// Returns error if the backend write fails.
    fn remove(&self, session: &SessionId) -> Result<(), SessionError>;

    /// Drop expired entries, returning how many were removed.
    ///
    /// # Errors
    /// Returns error if the backend write fails.
    fn purge_expired(&self) -> Result<usize, SessionError>;

    /// Number of stored (possibly expired) entries.
    ///
    /// # Errors
    /// Returns error if the backend read fails.
    fn count(&self) -> Result<usize, SessionError>;
}
