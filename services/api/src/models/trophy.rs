//! Trophy award payloads

use chrono::{DateTime, Utc};
use common::models::Competition;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Trophy award row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrophyAward {
    pub id: Uuid,
    pub user_id: Uuid,
    pub competition: Competition,
    /// Free-form label such as `2025/26`
    pub season: Option<String>,
    pub approved: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Award joined with its owner
#[derive(Debug, Clone, Serialize)]
pub struct TrophyWithOwner {
    #[serde(flatten)]
    pub award: TrophyAward,
    pub user_name: String,
    pub user_email: String,
}

/// Parse a competition code from a request body, as a 400 on failure
pub fn parse_competition(raw: &str) -> Result<Competition, ApiError> {
    raw.trim()
        .parse::<Competition>()
        .map_err(|_| ApiError::BadRequest("Invalid competition".to_string()))
}

pub const MIN_SEASON_LEN: usize = 3;

/// Trimmed season label; blank means none, anything shorter than
/// `MIN_SEASON_LEN` is a 400
pub fn parse_season(raw: Option<&str>) -> Result<Option<String>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(season) if season.chars().count() < MIN_SEASON_LEN => Err(ApiError::BadRequest(
            format!("Season must be at least {MIN_SEASON_LEN} characters"),
        )),
        Some(season) => Ok(Some(season.to_string())),
    }
}

/// `POST /api/trophies`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTrophyRequest {
    pub competition: String,
    pub user_id: Option<Uuid>,
    pub season: Option<String>,
}

/// `POST /api/admin/trophies`
#[derive(Debug, Clone, Deserialize)]
pub struct GrantTrophyRequest {
    pub user_id: Uuid,
    pub competition: String,
    pub season: Option<String>,
    pub approved: Option<bool>,
}

/// `PUT /api/admin/trophies/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTrophyRequest {
    pub competition: Option<String>,
    pub season: Option<String>,
    pub approved: Option<bool>,
}

/// `POST /api/admin/trophies/adjust`
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustTrophiesRequest {
    pub user_id: Uuid,
    pub competition: String,
    pub delta: i64,
    /// Season stamped on inserted awards
    pub season: Option<String>,
}

/// Filters for the admin trophy listing; invalid values are ignored
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminTrophyQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub user_id: Option<String>,
    pub competition: Option<String>,
    pub approved: Option<String>,
}

/// Parsed admin filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrophyFilter {
    pub user_id: Option<Uuid>,
    pub competition: Option<Competition>,
    pub approved: Option<bool>,
}

impl From<&AdminTrophyQuery> for TrophyFilter {
    fn from(query: &AdminTrophyQuery) -> Self {
        Self {
            user_id: super::lenient(&query.user_id),
            competition: super::lenient(&query.competition),
            approved: super::lenient(&query.approved),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminTrophyPage {
    pub items: Vec<TrophyWithOwner>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Approved counts per competition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrophyCounts {
    pub ucl: i64,
    pub europa: i64,
    pub total: i64,
}

impl TrophyCounts {
    pub fn add(&mut self, competition: Competition, count: i64) {
        match competition {
            Competition::Ucl => self.ucl += count,
            Competition::Europa => self.europa += count,
        }
        self.total += count;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrophyHistoryPage {
    pub items: Vec<TrophyAward>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub max_page: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityPage {
    pub items: Vec<TrophyWithOwner>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub page_count: i64,
}

/// `?page&limit` for the admin activity feed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardTotals {
    pub users: i64,
    pub trophies: i64,
    pub ucl: i64,
    pub europa: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub pending_trophies: i64,
    pub pending_users: i64,
    pub totals: DashboardTotals,
    pub recent: Vec<TrophyWithOwner>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filters_are_dropped() {
        let query = AdminTrophyQuery {
            user_id: Some("not-a-uuid".into()),
            competition: Some("UCL".into()),
            approved: Some("maybe".into()),
            ..Default::default()
        };
        let filter = TrophyFilter::from(&query);
        assert_eq!(filter.user_id, None);
        assert_eq!(filter.competition, Some(Competition::Ucl));
        assert_eq!(filter.approved, None);
    }

    #[test]
    fn counts_accumulate_per_competition() {
        let mut counts = TrophyCounts::default();
        counts.add(Competition::Ucl, 2);
        counts.add(Competition::Europa, 3);
        assert_eq!(counts, TrophyCounts { ucl: 2, europa: 3, total: 5 });
    }

    #[test]
    fn competition_parse_errors_are_bad_requests() {
        assert!(parse_competition(" EUROPA ").is_ok());
        assert!(matches!(parse_competition("UEFA"), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn seasons_are_trimmed_and_checked() {
        assert_eq!(parse_season(None).unwrap(), None);
        assert_eq!(parse_season(Some("   ")).unwrap(), None);
        assert_eq!(parse_season(Some(" 2025/26 ")).unwrap().as_deref(), Some("2025/26"));
        assert!(matches!(parse_season(Some("25")), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn owner_fields_flatten_into_award() {
        let row = TrophyWithOwner {
            award: TrophyAward {
                id: Uuid::nil(),
                user_id: Uuid::nil(),
                competition: Competition::Ucl,
                season: Some("2025/26".into()),
                approved: false,
                created_by: None,
                created_at: Utc::now(),
            },
            user_name: "Dimas".into(),
            user_email: "dimas@example.com".into(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["competition"], "UCL");
        assert_eq!(json["user_name"], "Dimas");
        assert_eq!(json["season"], "2025/26");
    }
}
