//! Wire types for the REST API.

use chrono::{DateTime, Utc};
use labshell_core::{CommandResult, Session, SessionFilter};
use serde::{Deserialize, Serialize};

/// Raw list query string.
///
/// Everything is kept as text so malformed numbers fall back to defaults
/// instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
}

impl From<ListQuery> for SessionFilter {
    fn from(query: ListQuery) -> Self {
        Self::from_raw(
            query.page.as_deref(),
            query.limit.as_deref(),
            query.search.as_deref(),
            query.status.as_deref(),
        )
    }
}

/// Liveness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the server started.
    pub uptime: f64,
    pub version: String,
    pub message: String,
}

/// Response to a delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub message: String,
    pub deleted_session: Session,
}

/// Response to a simulated command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub session: Session,
    pub command_response: CommandResult,
}

/// Response to a bulk termination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateResponse {
    pub message: String,
    pub terminated_count: usize,
}

/// Error body shared by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_into_filter() {
        let query = ListQuery {
            page: Some("2".to_string()),
            limit: Some("abc".to_string()),
            search: Some(String::new()),
            status: Some("active".to_string()),
        };
        let filter = SessionFilter::from(query);

        assert_eq!(filter.page, 2);
        assert_eq!(filter.limit, 20);
        assert_eq!(filter.search, None);
        assert_eq!(filter.status.as_deref(), Some("active"));
    }

    #[test]
    fn test_error_body_omits_empty_details() {
        let body = ErrorBody {
            error: "Session not found".to_string(),
            message: "gone".to_string(),
            details: Vec::new(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_terminate_response_serialization() {
        let json = serde_json::to_string(&TerminateResponse {
            message: "2 sessions terminated successfully".to_string(),
            terminated_count: 2,
        })
        .unwrap();
        assert!(json.contains("\"terminatedCount\":2"));
    }
}
