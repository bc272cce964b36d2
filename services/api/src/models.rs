//! API models for request and response payloads

pub mod fixture;
pub mod gallery;
pub mod leaderboard;
pub mod trophy;
pub mod user;

use serde::Deserialize;

/// Parse a query value leniently; anything unparsable counts as absent
pub fn lenient<T: std::str::FromStr>(raw: &Option<String>) -> Option<T> {
    raw.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

/// Skip/take window derived from a 1-based page and a clamped size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub size: i64,
}

impl PageWindow {
    pub fn new(page: Option<i64>, size: Option<i64>, default_size: i64, min: i64, max: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            size: size.unwrap_or(default_size).clamp(min, max),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.size
    }

    /// Number of pages needed for `total` rows, never less than one
    pub fn page_count(&self, total: i64) -> i64 {
        ((total + self.size - 1) / self.size).max(1)
    }
}

/// `?page&pageSize` as sent by the PWA
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}
