//! Demo sessions preloaded on startup.

use chrono::{DateTime, TimeDelta, Utc};
use labshell_core::{Session, SessionStatus};
use uuid::Uuid;

/// The three lab machines a fresh server starts with.
#[must_use]
pub fn demo_sessions(now: DateTime<Utc>) -> Vec<Session> {
    vec![
        demo(
            "LABPC001",
            "192.168.1.100",
            SessionStatus::Active,
            &["whoami", "pwd", "ls -la"],
            Some("whoami"),
            now - TimeDelta::minutes(5),
            4444,
            "Windows 10",
            "Primary lab test machine",
        ),
        demo(
            "LABLINUX001",
            "192.168.1.101",
            SessionStatus::Inactive,
            &["uname -a", "ps aux", "netstat -an"],
            Some("ps aux"),
            now - TimeDelta::minutes(15),
            4445,
            "Ubuntu 20.04",
            "Linux server for penetration testing",
        ),
        demo(
            "LABMAC001",
            "192.168.1.102",
            SessionStatus::Connecting,
            &[],
            None,
            now - TimeDelta::minutes(2),
            4446,
            "macOS Monterey",
            "MacBook for cross-platform compatibility testing",
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn demo(
    machine_name: &str,
    ip_address: &str,
    status: SessionStatus,
    history: &[&str],
    last_command: Option<&str>,
    timestamp: DateTime<Utc>,
    port: u16,
    operating_system: &str,
    notes: &str,
) -> Session {
    let command_history: Vec<String> = history.iter().map(|c| (*c).to_string()).collect();

    Session {
        id: Uuid::new_v4(),
        machine_name: machine_name.to_string(),
        ip_address: ip_address.to_string(),
        status,
        port: Some(port),
        operating_system: Some(operating_system.to_string()),
        notes: Some(notes.to_string()),
        last_command: last_command.map(str::to_string),
        command_history,
        timestamp,
    }
}
