//! Session data model.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session identifier.
pub type SessionId = Uuid;

/// Connection status of a tracked machine.
///
/// Any status can be set through an update; only command execution
/// requires [`SessionStatus::Active`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Connection is live and accepts commands.
    Active,
    /// Connection is idle or was terminated.
    #[default]
    Inactive,
    /// Handshake in progress.
    Connecting,
    /// Connection failed.
    Error,
}

impl SessionStatus {
    /// Every status, in the order they are reported.
    pub const ALL: [Self; 4] = [Self::Active, Self::Inactive, Self::Connecting, Self::Error];

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Connecting => "connecting",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown session status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for SessionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A tracked remote-machine connection and its command log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Alphanumeric machine name, unique across the store.
    pub machine_name: String,
    /// IPv4 address of the machine.
    pub ip_address: String,
    /// Current connection status.
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Most recently executed command.
    pub last_command: Option<String>,
    /// Every executed command, oldest first.
    #[serde(default)]
    pub command_history: Vec<String>,
    /// Last modification instant.
    pub timestamp: DateTime<Utc>,
}

impl Session {
    /// Build a fresh session from a validated draft.
    #[must_use]
    pub fn from_draft(id: SessionId, draft: SessionDraft, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            machine_name: draft.machine_name,
            ip_address: draft.ip_address,
            status: draft.status,
            port: draft.port,
            operating_system: draft.operating_system,
            notes: draft.notes,
            last_command: None,
            command_history: Vec::new(),
            timestamp,
        }
    }

    /// Replace every payload field with the draft's values.
    ///
    /// The id and the command log are kept.
    pub fn apply(&mut self, draft: SessionDraft, timestamp: DateTime<Utc>) {
        self.machine_name = draft.machine_name;
        self.ip_address = draft.ip_address;
        self.status = draft.status;
        self.port = draft.port;
        self.operating_system = draft.operating_system;
        self.notes = draft.notes;
        self.timestamp = timestamp;
    }

    /// Record an executed command.
    pub fn record_command(&mut self, command: &str, timestamp: DateTime<Utc>) {
        self.command_history.push(command.to_string());
        self.last_command = Some(command.to_string());
        self.timestamp = timestamp;
    }

    /// Whether the session accepts commands.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Read-only projection of the command log.
    #[must_use]
    pub fn history(&self) -> CommandHistory {
        CommandHistory {
            session_id: self.id,
            machine_name: self.machine_name.clone(),
            history: self.command_history.clone(),
            total_commands: self.command_history.len(),
            last_command: self.last_command.clone(),
        }
    }
}

/// Validated create/update payload.
///
/// Produced by [`crate::validation::validate_session_payload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub machine_name: String,
    pub ip_address: String,
    pub status: SessionStatus,
    pub port: Option<u16>,
    pub operating_system: Option<String>,
    pub notes: Option<String>,
}

/// Outcome of a simulated command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub command: String,
    pub output: String,
    pub timestamp: DateTime<Utc>,
    /// Always 0; nothing is actually executed.
    pub exit_code: i32,
}

impl CommandResult {
    /// Build the canned result for a command run on `machine_name`.
    #[must_use]
    pub fn simulated(command: &str, machine_name: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            command: command.to_string(),
            output: format!("Simulated: command '{command}' executed on {machine_name}"),
            timestamp,
            exit_code: 0,
        }
    }
}

/// Command log of a single session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandHistory {
    pub session_id: SessionId,
    pub machine_name: String,
    pub history: Vec<String>,
    pub total_commands: usize,
    pub last_command: Option<String>,
}

/// Operating mode reported by the statistics endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Online,
}

/// Aggregate counts over the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub inactive_sessions: usize,
    pub connecting_sessions: usize,
    pub error_sessions: usize,
    pub total_commands: usize,
    pub last_update: DateTime<Utc>,
    pub mode: Mode,
}

impl Statistics {
    /// Compute statistics with a full scan of `sessions`.
    pub fn collect<'a, I>(sessions: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Session>,
    {
        let mut stats = Self {
            total_sessions: 0,
            active_sessions: 0,
            inactive_sessions: 0,
            connecting_sessions: 0,
            error_sessions: 0,
            total_commands: 0,
            last_update: now,
            mode: Mode::Online,
        };

        for session in sessions {
            stats.total_sessions += 1;
            stats.total_commands += session.command_history.len();
            match session.status {
                SessionStatus::Active => stats.active_sessions += 1,
                SessionStatus::Inactive => stats.inactive_sessions += 1,
                SessionStatus::Connecting => stats.connecting_sessions += 1,
                SessionStatus::Error => stats.error_sessions += 1,
            }
        }

        stats
    }
}
