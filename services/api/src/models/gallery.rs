//! Gallery payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest caption kept, in characters
pub const MAX_CAPTION_CHARS: usize = 280;

/// Stored gallery row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub id: Uuid,
    pub uploader_id: Uuid,
    pub url: String,
    pub display_url: String,
    pub thumb_url: Option<String>,
    #[serde(skip_serializing)]
    pub delete_url: Option<String>,
    pub caption: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub size: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Row about to be inserted after a successful upload
#[derive(Debug, Clone)]
pub struct NewGalleryImage {
    pub uploader_id: Uuid,
    pub url: String,
    pub display_url: String,
    pub thumb_url: Option<String>,
    pub delete_url: Option<String>,
    pub caption: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub size: Option<i64>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Uploader {
    pub id: Uuid,
    pub name: String,
}

/// Listing entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: Uuid,
    pub url: String,
    pub display_url: String,
    pub thumb_url: Option<String>,
    pub caption: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub size: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub uploader: Uploader,
}

/// `{data, nextCursor}`, the shape the PWA's infinite scroll reads
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPage {
    #[serde(rename = "data")]
    pub items: Vec<GalleryItem>,
    pub next_cursor: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GalleryQuery {
    pub cursor: Option<String>,
    pub take: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevalidateRequest {
    pub id: Uuid,
}

/// Answer of the revalidate endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevalidateResponse {
    pub ok: bool,
    pub deleted: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub purged: u64,
    pub revalidated: usize,
    pub marked_deleted: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CleanupQuery {
    pub token: Option<String>,
}

/// Trim, cut to [`MAX_CAPTION_CHARS`] and drop empty captions
pub fn normalize_caption(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_CAPTION_CHARS).collect())
}

/// Split an over-fetched page (`take + 1` rows) into items and the next cursor
pub fn split_page<T>(mut rows: Vec<T>, take: usize, id_of: impl Fn(&T) -> Uuid) -> (Vec<T>, Option<Uuid>) {
    if rows.len() > take {
        let next = rows.pop().map(|row| id_of(&row));
        rows.truncate(take);
        (rows, next)
    } else {
        (rows, None)
    }
}
