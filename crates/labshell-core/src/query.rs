//! Listing filters and pagination.

use serde::{Deserialize, Serialize};

use crate::Session;

/// Page used when the request does not carry a usable one.
pub const DEFAULT_PAGE: usize = 1;
/// Page size used when the request does not carry a usable one.
pub const DEFAULT_LIMIT: usize = 20;

/// Session filter for list queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFilter {
    /// Substring matched against machine name, IP address and OS.
    pub search: Option<String>,
    /// Exact status name.
    pub status: Option<String>,
    /// 1-based page number.
    pub page: usize,
    /// Page size, always > 0.
    pub limit: usize,
}

impl Default for SessionFilter {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SessionFilter {
    /// Build a filter from raw query-string values.
    ///
    /// Unparseable or non-positive numbers fall back to the defaults and
    /// empty strings disable the corresponding filter.
    #[must_use]
    pub fn from_raw(
        page: Option<&str>,
        limit: Option<&str>,
        search: Option<&str>,
        status: Option<&str>,
    ) -> Self {
        Self {
            search: non_empty(search),
            status: non_empty(status),
            page: positive_or(page, DEFAULT_PAGE),
            limit: positive_or(limit, DEFAULT_LIMIT),
        }
    }

    /// Whether `session` passes the search and status filters.
    #[must_use]
    pub fn matches(&self, session: &Session) -> bool {
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            let hit = session.machine_name.to_lowercase().contains(&needle)
                || session.ip_address.contains(search.as_str())
                || session
                    .operating_system
                    .as_ref()
                    .is_some_and(|os| os.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(ref status) = self.status {
            if session.status.as_str() != status {
                return false;
            }
        }
        true
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.filter(|s| !s.is_empty()).map(str::to_string)
}

fn positive_or(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

/// Pagination metadata for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// One page of sessions plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPage {
    pub sessions: Vec<Session>,
    pub pagination: Pagination,
}

impl SessionPage {
    /// Cut page `page` of size `limit` out of an already filtered and sorted
    /// sequence.
    #[must_use]
    pub fn slice(sorted: Vec<Session>, page: usize, limit: usize) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        let total_items = sorted.len();
        let start = (page - 1).saturating_mul(limit);
        let end = start.saturating_add(limit);

        let sessions = sorted
            .into_iter()
            .skip(start)
            .take(limit)
            .collect();

        Self {
            sessions,
            pagination: Pagination {
                current_page: page,
                total_pages: total_items.div_ceil(limit),
                total_items,
                items_per_page: limit,
                has_next_page: end < total_items,
                has_previous_page: page > 1,
            },
        }
    }
}
