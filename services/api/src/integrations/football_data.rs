//! Football-Data.org v4 client

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::fixture::{Fixture, FixtureGoals, FixtureLeague, FixtureStatus, FixtureTeam};

pub const FD_BASE: &str = "https://api.football-data.org/v4";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum FixturesError {
    #[error("Missing FOOTBALL_DATA_TOKEN")]
    NotConfigured,
    #[error("Football-Data error {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Failed to fetch fixtures: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Parameters forwarded to `/matches`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchesRequest {
    pub competitions: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<String>,
}

impl MatchesRequest {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(c) = &self.competitions {
            pairs.push(("competitions", c.clone()));
        }
        if let Some(s) = &self.status {
            pairs.push(("status", s.clone()));
        }
        if let Some(d) = self.date_from {
            pairs.push(("dateFrom", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(d) = self.date_to {
            pairs.push(("dateTo", d.format("%Y-%m-%d").to_string()));
        }
        pairs
    }

    /// Stable cache key for this upstream query
    pub fn cache_key(&self) -> String {
        let pairs: Vec<String> = self
            .query_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("fixtures:{}", pairs.join("&"))
    }
}

#[derive(Clone)]
pub struct FootballDataClient {
    http: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

impl FootballDataClient {
    pub fn new(http: reqwest::Client, token: Option<String>) -> Self {
        Self {
            http,
            token,
            base_url: FD_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch and flatten the matches of `request`
    pub async fn matches(&self, request: &MatchesRequest) -> Result<Vec<Fixture>, FixturesError> {
        let token = self.token.as_deref().ok_or(FixturesError::NotConfigured)?;
        let url = format!("{}/matches", self.base_url);
        debug!(%url, query = ?request, "Fetching fixtures");

        let res = self
            .http
            .get(&url)
            .header("X-Auth-Token", token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&request.query_pairs())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let body = if body.is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                body
            };
            warn!(status = status.as_u16(), "Football-Data request failed");
            return Err(FixturesError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = res.json().await?;
        Ok(extract_matches(&json).iter().map(map_match).collect())
    }
}

fn extract_matches(json: &Value) -> Vec<Value> {
    ["matches", "resultSet", "response"]
        .iter()
        .find_map(|key| json.get(*key).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

/// Football-Data status to the short codes the PWA renders
pub fn map_status(status: &str) -> &'static str {
    match status.to_ascii_uppercase().as_str() {
        "SCHEDULED" | "TIMED" => "NS",
        "IN_PLAY" => "LIVE",
        "PAUSED" => "HT",
        "FINISHED" => "FT",
        "POSTPONED" => "PST",
        "SUSPENDED" => "SUSP",
        "CANCELED" => "CANC",
        "AWARDED" => "AWD",
        _ => "NS",
    }
}

fn opt_str(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Flatten one upstream match
pub fn map_match(m: &Value) -> Fixture {
    let ts = m["utcDate"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.timestamp_millis())
        .unwrap_or_else(|| Utc::now().timestamp_millis());

    let full_time = &m["score"]["fullTime"];
    let half_time = &m["score"]["halfTime"];
    let winner = m["score"]["winner"].as_str();
    let raw_status = m["status"].as_str().unwrap_or_default();

    Fixture {
        id: m["id"].as_i64(),
        ts,
        status: FixtureStatus {
            short: map_status(raw_status).to_string(),
            long: raw_status.to_string(),
        },
        league: FixtureLeague {
            id: m["competition"]["id"].as_i64(),
            name: opt_str(&m["competition"]["name"]),
            code: opt_str(&m["competition"]["code"]),
            round: opt_str(&m["stage"]),
            logo: opt_str(&m["competition"]["emblem"]),
        },
        home: FixtureTeam {
            id: m["homeTeam"]["id"].as_i64(),
            name: opt_str(&m["homeTeam"]["name"]),
            logo: opt_str(&m["homeTeam"]["crest"]),
            winner: winner == Some("HOME_TEAM"),
        },
        away: FixtureTeam {
            id: m["awayTeam"]["id"].as_i64(),
            name: opt_str(&m["awayTeam"]["name"]),
            logo: opt_str(&m["awayTeam"]["crest"]),
            winner: winner == Some("AWAY_TEAM"),
        },
        goals: FixtureGoals {
            home: full_time["home"].as_i64().or_else(|| half_time["home"].as_i64()),
            away: full_time["away"].as_i64().or_else(|| half_time["away"].as_i64()),
        },
        venue: opt_str(&m["area"]["name"]),
    }
}
