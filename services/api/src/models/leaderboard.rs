//! Leaderboard rows and their ordering

use common::models::Competition;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::HashMap};
use uuid::Uuid;

/// Shown when an award's owner has no name
pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub user_id: Uuid,
    pub name: String,
    pub ucl: i64,
    pub europa: i64,
    pub total: i64,
}

/// One `GROUP BY user, competition` bucket of approved awards
#[derive(Debug, Clone)]
pub struct AwardCount {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub competition: Competition,
    pub count: i64,
}

/// `?competition=&season=` filters; unrecognised competitions mean no filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub competition: Option<String>,
    pub season: Option<String>,
}

/// Which awards a leaderboard counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardScope {
    pub competition: Option<Competition>,
    pub season: Option<String>,
}

impl From<&LeaderboardQuery> for LeaderboardScope {
    fn from(query: &LeaderboardQuery) -> Self {
        Self {
            competition: super::lenient(&query.competition),
            season: super::lenient(&query.season),
        }
    }
}

/// Fold grouped counts into one row per user, sorted for display
pub fn build_rows(counts: impl IntoIterator<Item = AwardCount>) -> Vec<LeaderboardRow> {
    let mut by_user: HashMap<Uuid, LeaderboardRow> = HashMap::new();

    for bucket in counts {
        let row = by_user
            .entry(bucket.user_id)
            .or_insert_with(|| LeaderboardRow {
                user_id: bucket.user_id,
                name: bucket
                    .name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                ucl: 0,
                europa: 0,
                total: 0,
            });
        match bucket.competition {
            Competition::Ucl => row.ucl += bucket.count,
            Competition::Europa => row.europa += bucket.count,
        }
        row.total += bucket.count;
    }

    let mut rows: Vec<_> = by_user.into_values().collect();
    rows.sort_by(display_order);
    rows
}

fn display_order(a: &LeaderboardRow, b: &LeaderboardRow) -> Ordering {
    b.total
        .cmp(&a.total)
        .then_with(|| b.ucl.cmp(&a.ucl))
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(user_id: Uuid, name: Option<&str>, competition: Competition, count: i64) -> AwardCount {
        AwardCount {
            user_id,
            name: name.map(str::to_string),
            competition,
            count,
        }
    }

    #[test]
    fn rows_sort_by_total_then_ucl_then_name() {
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rows = build_rows(vec![
            bucket(a, Some("Andi"), Competition::Europa, 3),
            bucket(b, Some("Bayu"), Competition::Ucl, 1),
            bucket(b, Some("Bayu"), Competition::Europa, 2),
            bucket(c, Some("Citra"), Competition::Ucl, 3),
            bucket(d, Some("Ari"), Competition::Ucl, 3),
        ]);

        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Ari", "Citra", "Bayu", "Andi"]);

        let bayu = &rows[2];
        assert_eq!((bayu.ucl, bayu.europa, bayu.total), (1, 2, 3));
    }

    #[test]
    fn rows_serialize_with_client_field_names() {
        let rows = build_rows(vec![bucket(Uuid::nil(), Some("Andi"), Competition::Ucl, 2)]);
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["userId"], Uuid::nil().to_string());
        assert_eq!(json["total"], 2);
        assert_eq!(json["ucl"], 2);
    }

    #[test]
    fn missing_names_render_as_unknown() {
        let rows = build_rows(vec![bucket(Uuid::new_v4(), None, Competition::Ucl, 1)]);
        assert_eq!(rows[0].name, UNKNOWN_NAME);
    }

    #[test]
    fn scope_from_query() {
        let scope = LeaderboardScope::from(&LeaderboardQuery {
            competition: Some("EUROPA".into()),
            season: Some(" 2025/26 ".into()),
        });
        assert_eq!(scope.competition, Some(Competition::Europa));
        assert_eq!(scope.season.as_deref(), Some("2025/26"));

        let scope = LeaderboardScope::from(&LeaderboardQuery {
            competition: Some("WORLD_CUP".into()),
            season: Some("".into()),
        });
        assert_eq!(scope, LeaderboardScope::default());
    }

    #[test]
    fn empty_input_gives_empty_board() {
        assert!(build_rows(Vec::new()).is_empty());
    }
}
