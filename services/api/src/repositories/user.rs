//! User repository for database operations

use anyhow::Result;
use common::models::Role;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::user::{UserSummary, UserUpdate};

const USER_COLUMNS: &str = "id, name, email, role, approved, created_at";

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserSummary>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_user).transpose()
    }

    /// Users waiting for approval, oldest first
    pub async fn list_pending(&self) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE approved = FALSE ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_user).collect()
    }

    /// Every `USER` account except `exclude`, by name
    pub async fn list_manageable(&self, exclude: Uuid) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE role = 'USER' AND id <> $1
            ORDER BY name ASC
            "#
        ))
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_user).collect()
    }

    pub async fn approve(&self, id: Uuid) -> Result<Option<UserSummary>> {
        info!("Approving user: {}", id);

        let row = sqlx::query(&format!(
            "UPDATE users SET approved = TRUE WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }

    /// Edit name, email and approval; `email` must already be normalized
    pub async fn update(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        approved: bool,
    ) -> Result<UserUpdate> {
        let taken: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE email = $1 AND id <> $2")
                .bind(email)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        if taken.is_some() {
            return Ok(UserUpdate::EmailTaken);
        }

        let result = sqlx::query(&format!(
            r#"
            UPDATE users SET name = $2, email = $3, approved = $4
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(approved)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(row)) => Ok(UserUpdate::Updated(map_user(&row)?)),
            Ok(None) => Ok(UserUpdate::NotFound),
            Err(e) if super::is_unique_violation(&e) => Ok(UserUpdate::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a user and their awards in one transaction
    pub async fn delete_with_trophies(&self, id: Uuid) -> Result<bool> {
        info!("Deleting user and their trophies: {}", id);

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM trophy_awards WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        Ok(deleted > 0)
    }

    /// (all users, users awaiting approval)
    pub async fn counts(&self) -> Result<(i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE approved = FALSE) AS pending
            FROM users
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok((row.get("total"), row.get("pending")))
    }
}

fn map_user(row: &PgRow) -> Result<UserSummary> {
    let role: String = row.get("role");
    Ok(UserSummary {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: role.parse::<Role>()?,
        approved: row.get("approved"),
        created_at: row.get("created_at"),
    })
}
