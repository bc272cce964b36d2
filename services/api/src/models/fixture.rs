//! Fixture payloads returned by `/api/fixtures`

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureStatus {
    pub short: String,
    pub long: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureLeague {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub code: Option<String>,
    pub round: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureTeam {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub logo: Option<String>,
    pub winner: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureGoals {
    pub home: Option<i64>,
    pub away: Option<i64>,
}

/// One match, flattened for the PWA
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: Option<i64>,
    /// Kickoff as epoch milliseconds (UTC)
    pub ts: i64,
    pub status: FixtureStatus,
    pub league: FixtureLeague,
    pub home: FixtureTeam,
    pub away: FixtureTeam,
    pub goals: FixtureGoals,
    pub venue: Option<String>,
}

/// Raw query string of `/api/fixtures`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureQuery {
    pub competitions: Option<String>,
    pub date_from: Option<String>,
    pub from: Option<String>,
    pub date_to: Option<String>,
    pub to: Option<String>,
    pub status: Option<String>,
    pub next: Option<String>,
    pub timezone: Option<String>,
    pub league: Option<String>,
    pub leagues: Option<String>,
    pub token: Option<String>,
}
