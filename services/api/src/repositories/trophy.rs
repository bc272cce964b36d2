//! Trophy award repository

use anyhow::Result;
use common::models::Competition;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    PageWindow,
    leaderboard::{AwardCount, LeaderboardScope},
    trophy::{DashboardTotals, TrophyAward, TrophyCounts, TrophyFilter, TrophyWithOwner},
};

const AWARD_COLUMNS: &str =
    "t.id, t.user_id, t.competition, t.season, t.approved, t.created_by, t.created_at";

/// Trophy repository for database operations
#[derive(Clone)]
pub struct TrophyRepository {
    pool: PgPool,
}

impl TrophyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        competition: Competition,
        season: Option<&str>,
        approved: bool,
        created_by: Uuid,
    ) -> Result<TrophyAward> {
        info!(%user_id, %competition, ?season, approved, "Creating trophy award");

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO trophy_awards AS t (user_id, competition, season, approved, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {AWARD_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(competition.as_str())
        .bind(season)
        .bind(approved)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        map_award(&row)
    }

    pub async fn find_with_owner(&self, id: Uuid) -> Result<Option<TrophyWithOwner>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {AWARD_COLUMNS}, u.name AS user_name, u.email AS user_email
            FROM trophy_awards t
            JOIN users u ON u.id = t.user_id
            WHERE t.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_with_owner).transpose()
    }

    /// Filtered admin listing, newest first, with the total row count
    pub async fn list(
        &self,
        filter: &TrophyFilter,
        window: PageWindow,
    ) -> Result<(Vec<TrophyWithOwner>, i64)> {
        const FILTER: &str = r#"
            ($1::uuid IS NULL OR t.user_id = $1)
            AND ($2::text IS NULL OR t.competition = $2)
            AND ($3::bool IS NULL OR t.approved = $3)
        "#;
        let competition = filter.competition.map(|c| c.as_str());

        let rows = sqlx::query(&format!(
            r#"
            SELECT {AWARD_COLUMNS}, u.name AS user_name, u.email AS user_email
            FROM trophy_awards t
            JOIN users u ON u.id = t.user_id
            WHERE {FILTER}
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.user_id)
        .bind(competition)
        .bind(filter.approved)
        .bind(window.size)
        .bind(window.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM trophy_awards t WHERE {FILTER}"))
                .bind(filter.user_id)
                .bind(competition)
                .bind(filter.approved)
                .fetch_one(&self.pool)
                .await?;

        let items = rows.iter().map(map_with_owner).collect::<Result<_>>()?;
        Ok((items, total))
    }

    /// Claims waiting for review, oldest first
    pub async fn pending_requests(&self) -> Result<Vec<TrophyWithOwner>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {AWARD_COLUMNS}, u.name AS user_name, u.email AS user_email
            FROM trophy_awards t
            JOIN users u ON u.id = t.user_id
            WHERE t.approved = FALSE
            ORDER BY t.created_at ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_with_owner).collect()
    }

    pub async fn approve(&self, id: Uuid) -> Result<Option<TrophyAward>> {
        info!("Approving trophy award: {}", id);

        let row = sqlx::query(&format!(
            "UPDATE trophy_awards AS t SET approved = TRUE WHERE t.id = $1 RETURNING {AWARD_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_award).transpose()
    }

    /// Apply the given changes; `None` fields keep their value
    pub async fn update(
        &self,
        id: Uuid,
        competition: Option<Competition>,
        season: Option<&str>,
        approved: Option<bool>,
    ) -> Result<Option<TrophyAward>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE trophy_awards AS t
            SET competition = COALESCE($2, t.competition),
                season = COALESCE($3, t.season),
                approved = COALESCE($4, t.approved)
            WHERE t.id = $1
            RETURNING {AWARD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(competition.map(|c| c.as_str()))
        .bind(season)
        .bind(approved)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_award).transpose()
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        info!("Deleting trophy award: {}", id);

        let result = sqlx::query("DELETE FROM trophy_awards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Add `delta` approved awards stamped with `season`, or remove the
    /// `|delta|` newest approved ones of any season.
    ///
    /// Returns the number of rows inserted or deleted.
    pub async fn adjust(
        &self,
        user_id: Uuid,
        competition: Competition,
        season: Option<&str>,
        delta: i64,
        created_by: Uuid,
    ) -> Result<u64> {
        info!(%user_id, %competition, delta, "Adjusting trophy count");

        let result = if delta > 0 {
            sqlx::query(
                r#"
                INSERT INTO trophy_awards (user_id, competition, season, approved, created_by)
                SELECT $1, $2, $3, TRUE, $4 FROM generate_series(1, $5)
                "#,
            )
            .bind(user_id)
            .bind(competition.as_str())
            .bind(season)
            .bind(created_by)
            .bind(delta)
            .execute(&self.pool)
            .await?
        } else if delta < 0 {
            sqlx::query(
                r#"
                DELETE FROM trophy_awards
                WHERE id IN (
                    SELECT id FROM trophy_awards
                    WHERE user_id = $1 AND competition = $2 AND approved = TRUE
                    ORDER BY created_at DESC
                    LIMIT $3
                )
                "#,
            )
            .bind(user_id)
            .bind(competition.as_str())
            .bind(-delta)
            .execute(&self.pool)
            .await?
        } else {
            return Ok(0);
        };

        Ok(result.rows_affected())
    }

    /// Approved counts of one user
    pub async fn approved_counts(&self, user_id: Uuid) -> Result<TrophyCounts> {
        let rows = sqlx::query(
            r#"
            SELECT competition, COUNT(*) AS count
            FROM trophy_awards
            WHERE user_id = $1 AND approved = TRUE
            GROUP BY competition
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = TrophyCounts::default();
        for row in rows {
            let competition: String = row.get("competition");
            counts.add(competition.parse()?, row.get("count"));
        }
        Ok(counts)
    }

    /// One user's awards, newest first
    pub async fn history(
        &self,
        user_id: Uuid,
        window: PageWindow,
    ) -> Result<(Vec<TrophyAward>, i64)> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {AWARD_COLUMNS}
            FROM trophy_awards t
            WHERE t.user_id = $1
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(window.size)
        .bind(window.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trophy_awards WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let items = rows.iter().map(map_award).collect::<Result<_>>()?;
        Ok((items, total))
    }

    /// Every award, newest first
    pub async fn activity(&self, window: PageWindow) -> Result<(Vec<TrophyWithOwner>, i64)> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {AWARD_COLUMNS}, u.name AS user_name, u.email AS user_email
            FROM trophy_awards t
            JOIN users u ON u.id = t.user_id
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(window.size)
        .bind(window.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trophy_awards")
            .fetch_one(&self.pool)
            .await?;

        let items = rows.iter().map(map_with_owner).collect::<Result<_>>()?;
        Ok((items, total))
    }

    /// (pending claims, totals without the user count)
    pub async fn dashboard_counts(&self) -> Result<(i64, DashboardTotals)> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) FILTER (WHERE approved = FALSE) AS pending,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE approved = TRUE AND competition = 'UCL') AS ucl,
                   COUNT(*) FILTER (WHERE approved = TRUE AND competition = 'EUROPA') AS europa
            FROM trophy_awards
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok((
            row.get("pending"),
            DashboardTotals {
                users: 0,
                trophies: row.get("total"),
                ucl: row.get("ucl"),
                europa: row.get("europa"),
            },
        ))
    }

    /// Approved awards in `scope`, grouped by owner and competition
    pub async fn leaderboard_counts(&self, scope: &LeaderboardScope) -> Result<Vec<AwardCount>> {
        let rows = sqlx::query(
            r#"
            SELECT t.user_id, u.name, t.competition, COUNT(*) AS count
            FROM trophy_awards t
            LEFT JOIN users u ON u.id = t.user_id
            WHERE t.approved = TRUE
              AND ($1::text IS NULL OR t.competition = $1)
              AND ($2::text IS NULL OR t.season = $2)
            GROUP BY t.user_id, u.name, t.competition
            "#,
        )
        .bind(scope.competition.map(|c| c.as_str()))
        .bind(scope.season.as_deref())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_award_count).collect()
    }
}

fn map_award_count(row: &PgRow) -> Result<AwardCount> {
    let competition: String = row.get("competition");
    Ok(AwardCount {
        user_id: row.get("user_id"),
        name: row.get("name"),
        competition: competition.parse()?,
        count: row.get("count"),
    })
}

fn map_award(row: &PgRow) -> Result<TrophyAward> {
    let competition: String = row.get("competition");
    Ok(TrophyAward {
        id: row.get("id"),
        user_id: row.get("user_id"),
        competition: competition.parse()?,
        season: row.get("season"),
        approved: row.get("approved"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    })
}

fn map_with_owner(row: &PgRow) -> Result<TrophyWithOwner> {
    Ok(TrophyWithOwner {
        award: map_award(row)?,
        user_name: row.get("user_name"),
        user_email: row.get("user_email"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::database::{DatabaseConfig, init_pool, run_migrations};

    async fn insert_user(pool: &PgPool, name: &str) -> Uuid {
        sqlx::query_scalar(
            r#"
            INSERT INTO users (name, email, password_hash, role, approved)
            VALUES ($1, $2, 'x', 'USER', TRUE)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(format!("{}@example.com", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    async fn claim_approve_and_adjust() {
        let pool = init_pool(&DatabaseConfig::from_env().unwrap()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let repo = TrophyRepository::new(pool.clone());

        let admin = insert_user(&pool, "Admin").await;
        let player = insert_user(&pool, "Player").await;

        let claim = repo
            .create(player, Competition::Ucl, Some("2025/26"), false, player)
            .await
            .unwrap();
        assert_eq!(claim.season.as_deref(), Some("2025/26"));
        assert_eq!(repo.approved_counts(player).await.unwrap().total, 0);

        repo.approve(claim.id).await.unwrap().unwrap();
        let counts = repo.approved_counts(player).await.unwrap();
        assert_eq!((counts.ucl, counts.europa, counts.total), (1, 0, 1));

        assert_eq!(
            repo.adjust(player, Competition::Europa, Some("2024/25"), 3, admin).await.unwrap(),
            3
        );
        assert_eq!(repo.adjust(player, Competition::Europa, None, -2, admin).await.unwrap(), 2);
        let counts = repo.approved_counts(player).await.unwrap();
        assert_eq!((counts.ucl, counts.europa, counts.total), (1, 1, 2));

        let europa = LeaderboardScope {
            competition: Some(Competition::Europa),
            season: None,
        };
        let buckets = repo.leaderboard_counts(&europa).await.unwrap();
        assert!(
            buckets
                .iter()
                .any(|b| b.user_id == player && b.count == 1 && b.competition == Competition::Europa)
        );

        let season = LeaderboardScope {
            competition: None,
            season: Some("2025/26".to_string()),
        };
        let buckets: Vec<_> = repo
            .leaderboard_counts(&season)
            .await
            .unwrap()
            .into_iter()
            .filter(|b| b.user_id == player)
            .collect();
        assert_eq!(buckets.len(), 1);
        assert_eq!((buckets[0].competition, buckets[0].count), (Competition::Ucl, 1));

        let edited = repo
            .update(claim.id, None, Some("2026/27"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited.season.as_deref(), Some("2026/27"));
        assert!(edited.approved);

        assert!(repo.delete(claim.id).await.unwrap());
        assert!(!repo.delete(claim.id).await.unwrap());

        sqlx::query("DELETE FROM trophy_awards WHERE user_id = $1")
            .bind(player)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(vec![admin, player])
            .execute(&pool)
            .await
            .unwrap();
    }
}
