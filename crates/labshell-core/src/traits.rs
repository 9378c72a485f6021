//! Storage trait and error taxonomy.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::{
    CommandHistory, CommandResult, Session, SessionFilter, SessionId, SessionPage, SessionStatus,
    Statistics,
};

/// Session store error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Invalid input: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("A session with machine name {machine_name} already exists")]
    Conflict { machine_name: String },
    #[error("Session is {status}; it must be active to run commands")]
    InvalidState { status: SessionStatus },
    #[error("Storage error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Shorthand for a not-found error on a typed id.
    #[must_use]
    pub fn not_found(id: SessionId) -> Self {
        Self::NotFound(id.to_string())
    }
}

/// Trait for session storage backends.
///
/// Every operation is atomic with respect to the others: checks and the
/// mutation that follows them are never interleaved with another call.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// List sessions matching `filter`, newest first, one page at a time.
    async fn list(&self, filter: &SessionFilter) -> Result<SessionPage, SessionError>;

    /// Get a session by ID.
    async fn get(&self, id: SessionId) -> Result<Session, SessionError>;

    /// Validate `payload` and insert a new session.
    async fn create(&self, payload: &Value) -> Result<Session, SessionError>;

    /// Validate `payload` and replace the session's fields with it.
    async fn update(&self, id: SessionId, payload: &Value) -> Result<Session, SessionError>;

    /// Remove a session and return it.
    async fn delete(&self, id: SessionId) -> Result<Session, SessionError>;

    /// Record a simulated command on an active session.
    async fn append_command(
        &self,
        id: SessionId,
        command: &str,
    ) -> Result<(Session, CommandResult), SessionError>;

    /// Move every active session to inactive, returning how many changed.
    async fn terminate_all(&self) -> Result<usize, SessionError>;

    /// Get the command log of a session.
    async fn history(&self, id: SessionId) -> Result<CommandHistory, SessionError>;

    /// Aggregate counts over all sessions.
    async fn statistics(&self) -> Result<Statistics, SessionError>;
}
