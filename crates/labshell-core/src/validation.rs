//! Payload validation.
//!
//! Each validator walks the whole payload and reports every violated
//! constraint at once, so clients can fix a form in a single round trip.

use std::net::Ipv4Addr;

use serde_json::{Map, Value};

use crate::{SessionDraft, SessionError, SessionStatus};

pub const MACHINE_NAME_MIN: usize = 3;
pub const MACHINE_NAME_MAX: usize = 50;
pub const OPERATING_SYSTEM_MAX: usize = 100;
pub const NOTES_MAX: usize = 500;
pub const COMMAND_MIN: usize = 1;
pub const COMMAND_MAX: usize = 1000;

const SESSION_FIELDS: [&str; 6] = [
    "machineName",
    "ipAddress",
    "status",
    "port",
    "operatingSystem",
    "notes",
];

/// Validate a create/update payload.
///
/// # Errors
/// Returns [`SessionError::Validation`] listing every violation.
pub fn validate_session_payload(payload: &Value) -> Result<SessionDraft, SessionError> {
    let object = as_object(payload)?;
    let mut violations = Vec::new();

    for key in object.keys() {
        if !SESSION_FIELDS.contains(&key.as_str()) {
            violations.push(format!("\"{key}\" is not allowed"));
        }
    }

    let machine_name = required_string(object, "machineName", &mut violations).filter(|name| {
        let before = violations.len();
        if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            violations.push(
                "\"machineName\" must only contain alpha-numeric characters".to_string(),
            );
        }
        check_length(
            "machineName",
            name,
            MACHINE_NAME_MIN,
            MACHINE_NAME_MAX,
            &mut violations,
        );
        violations.len() == before
    });

    let ip_address = required_string(object, "ipAddress", &mut violations).filter(|ip| {
        let valid = ip.parse::<Ipv4Addr>().is_ok();
        if !valid {
            violations.push("\"ipAddress\" must be a valid IPv4 address".to_string());
        }
        valid
    });

    let status = match object.get("status") {
        None => Some(SessionStatus::default()),
        Some(value) => {
            let parsed = value.as_str().and_then(|s| s.parse().ok());
            if parsed.is_none() {
                violations.push(
                    "\"status\" must be one of [active, inactive, connecting, error]".to_string(),
                );
            }
            parsed
        }
    };

    let port = object
        .get("port")
        .map(|value| parse_port(value, &mut violations));

    let operating_system =
        optional_string(object, "operatingSystem", OPERATING_SYSTEM_MAX, &mut violations);
    let notes = optional_string(object, "notes", NOTES_MAX, &mut violations);

    match (machine_name, ip_address, status) {
        (Some(machine_name), Some(ip_address), Some(status)) if violations.is_empty() => {
            Ok(SessionDraft {
                machine_name,
                ip_address,
                status,
                port: port.flatten(),
                operating_system: operating_system.flatten(),
                notes: notes.flatten(),
            })
        }
        _ => Err(SessionError::Validation(violations)),
    }
}

/// Validate a command payload and extract the command.
///
/// # Errors
/// Returns [`SessionError::Validation`] listing every violation.
pub fn validate_command_payload(payload: &Value) -> Result<String, SessionError> {
    let object = as_object(payload)?;
    let mut violations = Vec::new();

    for key in object.keys().filter(|k| *k != "command") {
        violations.push(format!("\"{key}\" is not allowed"));
    }

    let command = required_string(object, "command", &mut violations);
    if let Some(ref command) = command {
        check_length("command", command, COMMAND_MIN, COMMAND_MAX, &mut violations);
    }

    match command {
        Some(command) if violations.is_empty() => Ok(command),
        _ => Err(SessionError::Validation(violations)),
    }
}

/// Validate the length of a bare command string.
///
/// # Errors
/// Returns [`SessionError::Validation`] when the command is empty or too long.
pub fn validate_command(command: &str) -> Result<(), SessionError> {
    let mut violations = Vec::new();
    if command.is_empty() {
        violations.push("\"command\" is not allowed to be empty".to_string());
    } else {
        check_length("command", command, COMMAND_MIN, COMMAND_MAX, &mut violations);
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(SessionError::Validation(violations))
    }
}

fn as_object(payload: &Value) -> Result<&Map<String, Value>, SessionError> {
    payload.as_object().ok_or_else(|| {
        SessionError::Validation(vec!["\"value\" must be of type object".to_string()])
    })
}

fn required_string(
    object: &Map<String, Value>,
    field: &str,
    violations: &mut Vec<String>,
) -> Option<String> {
    match object.get(field) {
        None => {
            violations.push(format!("\"{field}\" is required"));
            None
        }
        Some(value) => string_value(field, value, violations),
    }
}

/// `None` when absent, `Some(None)` when present but invalid.
fn optional_string(
    object: &Map<String, Value>,
    field: &str,
    max: usize,
    violations: &mut Vec<String>,
) -> Option<Option<String>> {
    let value = object.get(field)?;
    let parsed = string_value(field, value, violations).filter(|s| {
        let before = violations.len();
        check_length(field, s, 0, max, violations);
        violations.len() == before
    });
    Some(parsed)
}

fn string_value(field: &str, value: &Value, violations: &mut Vec<String>) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => {
            violations.push(format!("\"{field}\" is not allowed to be empty"));
            None
        }
        Value::String(s) => Some(s.clone()),
        _ => {
            violations.push(format!("\"{field}\" must be a string"));
            None
        }
    }
}

fn check_length(field: &str, value: &str, min: usize, max: usize, violations: &mut Vec<String>) {
    let len = value.chars().count();
    if len < min {
        violations.push(format!(
            "\"{field}\" length must be at least {min} characters long"
        ));
    }
    if len > max {
        violations.push(format!(
            "\"{field}\" length must be less than or equal to {max} characters long"
        ));
    }
}

/// Numeric strings are converted, matching how form posts arrive.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_port(value: &Value, violations: &mut Vec<String>) -> Option<u16> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    };

    let Some(number) = number else {
        violations.push("\"port\" must be a number".to_string());
        return None;
    };

    if number.fract() != 0.0 {
        violations.push("\"port\" must be an integer".to_string());
        return None;
    }
    if number < 1.0 {
        violations.push("\"port\" must be greater than or equal to 1".to_string());
        return None;
    }
    if number > f64::from(u16::MAX) {
        violations.push("\"port\" must be less than or equal to 65535".to_string());
        return None;
    }

    Some(number as u16)
}
