//! Gallery image repository

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::gallery::{GalleryImage, GalleryItem, NewGalleryImage, Uploader};

const IMAGE_COLUMNS: &str = "g.id, g.uploader_id, g.url, g.display_url, g.thumb_url, g.delete_url, \
     g.caption, g.width, g.height, g.size, g.created_at, g.expires_at, g.deleted_at";

#[derive(Clone)]
pub struct GalleryRepository {
    pool: PgPool,
}

impl GalleryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Drop captions of expired images
    pub async fn scrub_expired_captions(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE gallery_images SET caption = NULL WHERE expires_at <= NOW() AND caption IS NOT NULL",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Active images, newest first, starting at `cursor` (inclusive)
    pub async fn list_active(&self, cursor: Option<Uuid>, limit: i64) -> Result<Vec<GalleryItem>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {IMAGE_COLUMNS}, u.name AS uploader_name
            FROM gallery_images g
            JOIN users u ON u.id = g.uploader_id
            WHERE g.deleted_at IS NULL
              AND g.expires_at > NOW()
              AND ($1::uuid IS NULL OR (g.created_at, g.id) <= (
                    SELECT c.created_at, c.id FROM gallery_images c WHERE c.id = $1))
            ORDER BY g.created_at DESC, g.id DESC
            LIMIT $2
            "#
        ))
        .bind(cursor)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let image = map_image(row);
                GalleryItem {
                    id: image.id,
                    url: image.url,
                    display_url: image.display_url,
                    thumb_url: image.thumb_url,
                    caption: image.caption,
                    width: image.width,
                    height: image.height,
                    size: image.size,
                    created_at: image.created_at,
                    expires_at: image.expires_at,
                    uploader: Uploader {
                        id: image.uploader_id,
                        name: row.get("uploader_name"),
                    },
                }
            })
            .collect())
    }

    pub async fn insert(&self, image: &NewGalleryImage) -> Result<GalleryImage> {
        info!(uploader_id = %image.uploader_id, "Storing gallery image");

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO gallery_images AS g
                (uploader_id, url, display_url, thumb_url, delete_url, caption,
                 width, height, size, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {IMAGE_COLUMNS}
            "#
        ))
        .bind(image.uploader_id)
        .bind(&image.url)
        .bind(&image.display_url)
        .bind(&image.thumb_url)
        .bind(&image.delete_url)
        .bind(&image.caption)
        .bind(image.width)
        .bind(image.height)
        .bind(image.size)
        .bind(image.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_image(&row))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<GalleryImage>> {
        let row = sqlx::query(&format!(
            "SELECT {IMAGE_COLUMNS} FROM gallery_images g WHERE g.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_image))
    }

    /// Soft delete: stamp `deleted_at` and clear the caption
    pub async fn mark_deleted(&self, id: Uuid) -> Result<bool> {
        info!("Marking gallery image deleted: {}", id);

        let result = sqlx::query(
            "UPDATE gallery_images SET deleted_at = NOW(), caption = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Hard-delete soft-deleted and expired rows
    pub async fn purge_dead(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM gallery_images WHERE deleted_at IS NOT NULL OR expires_at <= NOW()",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Random sample of active rows for CDN probing
    pub async fn sample_active(&self, limit: i64) -> Result<Vec<GalleryImage>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {IMAGE_COLUMNS}
            FROM gallery_images g
            WHERE g.deleted_at IS NULL AND g.expires_at > NOW()
            ORDER BY random()
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_image).collect())
    }
}

fn map_image(row: &PgRow) -> GalleryImage {
    GalleryImage {
        id: row.get("id"),
        uploader_id: row.get("uploader_id"),
        url: row.get("url"),
        display_url: row.get("display_url"),
        thumb_url: row.get("thumb_url"),
        delete_url: row.get("delete_url"),
        caption: row.get("caption"),
        width: row.get("width"),
        height: row.get("height"),
        size: row.get("size"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
        deleted_at: row.get("deleted_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gallery::split_page;
    use chrono::{Duration, Utc};
    use common::database::{DatabaseConfig, init_pool, run_migrations};

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    async fn cursor_pages_cover_every_row() {
        let pool = init_pool(&DatabaseConfig::from_env().unwrap()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let repo = GalleryRepository::new(pool.clone());

        let uploader: Uuid = sqlx::query_scalar(
            "INSERT INTO users (name, email, password_hash, approved) VALUES ('Uploader', $1, 'x', TRUE) RETURNING id",
        )
        .bind(format!("{}@example.com", Uuid::new_v4()))
        .fetch_one(&pool)
        .await
        .unwrap();

        let mut ours = Vec::new();
        for n in 0..3 {
            let image = repo
                .insert(&NewGalleryImage {
                    uploader_id: uploader,
                    url: format!("https://i.ibb.co/{n}.png"),
                    display_url: format!("https://i.ibb.co/{n}-d.png"),
                    thumb_url: None,
                    delete_url: None,
                    caption: None,
                    width: None,
                    height: None,
                    size: None,
                    expires_at: Utc::now() + Duration::days(1),
                })
                .await
                .unwrap();
            ours.push(image.id);
        }

        // One row per page: each page must start on the row the previous one held back
        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let rows = repo.list_active(cursor, 2).await.unwrap();
            let (items, next) = split_page(rows, 1, |item| item.id);
            seen.extend(items.iter().map(|item| item.id).filter(|id| ours.contains(id)));
            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen.len(), ours.len());
        seen.sort();
        ours.sort();
        assert_eq!(seen, ours);

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(uploader)
            .execute(&pool)
            .await
            .unwrap();
    }
}
