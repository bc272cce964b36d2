//! Photo gallery backed by ImgBB

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    integrations::{RevalidateVerdict, UploadError, imgbb::EXPIRATION_SECS},
    middleware::AuthUser,
    models::{
        gallery::{
            CleanupQuery, CleanupSummary, GalleryPage, GalleryQuery, NewGalleryImage,
            RevalidateRequest, RevalidateResponse, normalize_caption, split_page,
        },
        lenient,
    },
};

/// Largest image accepted for upload (32 MiB)
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;
/// Request body cap; leaves room for multipart framing and the caption
pub const BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

const DEFAULT_TAKE: usize = 8;
const CLEANUP_SAMPLE: i64 = 25;

fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

/// Active images, newest first, `take` at a time
pub async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> ApiResult<impl IntoResponse> {
    let scrubbed = state.gallery_repository.scrub_expired_captions().await?;
    if scrubbed > 0 {
        info!(scrubbed, "Cleared captions of expired images");
    }

    let take = lenient::<usize>(&query.take)
        .unwrap_or(DEFAULT_TAKE)
        .clamp(1, DEFAULT_TAKE);
    let cursor: Option<Uuid> = lenient(&query.cursor);

    let rows = state
        .gallery_repository
        .list_active(cursor, take as i64 + 1)
        .await?;
    let (items, next_cursor) = split_page(rows, take, |item| item.id);

    Ok(Json(GalleryPage { items, next_cursor }))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("File too large (max 32MB)".to_string())
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

struct UploadFile {
    name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

pub async fn upload_image(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut file: Option<UploadFile> = None;
    let mut caption: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or("upload.jpg").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some(UploadFile {
                    name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("caption") => {
                caption = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    let content_type = file
        .content_type
        .filter(|ct| ct.starts_with("image/"))
        .ok_or_else(|| ApiError::BadRequest("Invalid file type".to_string()))?;
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::PayloadTooLarge("File too large (max 32MB)".to_string()));
    }
    let caption = normalize_caption(caption.as_deref());

    let uploaded = state
        .imgbb
        .upload(file.bytes, file.name, &content_type)
        .await
        .map_err(|e| match e {
            UploadError::NotConfigured => {
                warn!("IMGBB_API_KEY is not set");
                ApiError::NotConfigured
            }
            UploadError::Timeout => ApiError::GatewayTimeout("Upload timeout".to_string()),
            other => {
                warn!("ImgBB upload failed: {}", other);
                ApiError::BadGateway("ImgBB upload failed".to_string())
            }
        })?;

    let image = state
        .gallery_repository
        .insert(&NewGalleryImage {
            uploader_id: caller.id,
            url: uploaded.url,
            display_url: uploaded.display_url,
            thumb_url: uploaded.thumb_url,
            delete_url: uploaded.delete_url,
            caption,
            width: uploaded.width,
            height: uploaded.height,
            size: uploaded.size,
            expires_at: Utc::now() + Duration::seconds(EXPIRATION_SECS),
        })
        .await?;

    info!(image = %image.id, uploader = %caller.name, "Gallery image uploaded");
    Ok((StatusCode::CREATED, Json(json!({ "data": image }))))
}

/// Soft delete by the uploader, plus a best-effort removal on the host
pub async fn delete_image(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let image = state
        .gallery_repository
        .find_by_id(id)
        .await?
        .ok_or_else(not_found)?;

    if image.uploader_id != caller.id {
        return Err(ApiError::Forbidden("Forbidden".to_string()));
    }

    state.gallery_repository.mark_deleted(id).await?;

    if let Some(delete_url) = image.delete_url.as_deref() {
        state.prober.request_remote_delete(delete_url).await;
    }

    Ok(Json(json!({ "ok": true })))
}

/// Check whether the CDN still serves an image; gone images are soft deleted
pub async fn revalidate_image(
    State(state): State<AppState>,
    Json(payload): Json<RevalidateRequest>,
) -> ApiResult<impl IntoResponse> {
    let image = state
        .gallery_repository
        .find_by_id(payload.id)
        .await?
        .ok_or_else(not_found)?;

    let verdict = state
        .prober
        .revalidate(&image.display_url, image.thumb_url.as_deref())
        .await;

    let response = match verdict {
        RevalidateVerdict::Alive => RevalidateResponse {
            ok: true,
            deleted: false,
            retry: false,
            status: None,
        },
        RevalidateVerdict::Gone => {
            state.gallery_repository.mark_deleted(image.id).await?;
            info!(image = %image.id, "Image gone from CDN, marked deleted");
            RevalidateResponse {
                ok: true,
                deleted: true,
                retry: false,
                status: None,
            }
        }
        RevalidateVerdict::Retry { status } => RevalidateResponse {
            ok: true,
            deleted: false,
            retry: true,
            status,
        },
    };

    Ok(Json(response))
}

/// Whether a presented token matches the configured cleanup token
pub fn cleanup_authorized(expected: Option<&str>, presented: Option<&str>) -> bool {
    matches!((expected, presented), (Some(e), Some(p)) if !e.is_empty() && e == p)
}

async fn run_cleanup(state: &AppState) -> ApiResult<CleanupSummary> {
    let purged = state.gallery_repository.purge_dead().await?;

    let sample = state.gallery_repository.sample_active(CLEANUP_SAMPLE).await?;
    let mut summary = CleanupSummary {
        purged,
        revalidated: sample.len(),
        marked_deleted: 0,
    };

    for image in &sample {
        if state.prober.probe_gone(&image.display_url).await {
            state.gallery_repository.mark_deleted(image.id).await?;
            summary.marked_deleted += 1;
        }
    }

    info!(
        purged = summary.purged,
        revalidated = summary.revalidated,
        marked_deleted = summary.marked_deleted,
        "Gallery cleanup finished"
    );
    Ok(summary)
}

/// Scheduler entry point taking `?token=`
pub async fn cleanup_by_query(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> ApiResult<impl IntoResponse> {
    if !cleanup_authorized(
        state.config.gallery_cleanup_token.as_deref(),
        query.token.as_deref(),
    ) {
        return Err(ApiError::Unauthorized);
    }
    Ok(Json(run_cleanup(&state).await?))
}

/// Scheduler entry point taking `Authorization: Bearer`
pub async fn cleanup_by_bearer(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> ApiResult<impl IntoResponse> {
    let presented = bearer.as_ref().map(|TypedHeader(auth)| auth.token());
    if !cleanup_authorized(state.config.gallery_cleanup_token.as_deref(), presented) {
        return Err(ApiError::Unauthorized);
    }
    Ok(Json(run_cleanup(&state).await?))
}
