//! Admin workflow: approvals, user management and trophy bookkeeping

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use common::validation::{normalize_email, validate_profile};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{
        PageWindow, lenient,
        trophy::{
            ActivityPage, ActivityQuery, AdjustTrophiesRequest, AdminTrophyPage, AdminTrophyQuery,
            Dashboard, GrantTrophyRequest, TrophyFilter, UpdateTrophyRequest, parse_competition,
            parse_season,
        },
        user::{UpdateUserRequest, UserUpdate},
    },
};

const RECENT_AWARDS: i64 = 5;
/// Largest `|delta|` one adjust request may apply
pub const MAX_ADJUST_DELTA: i64 = 100;

/// Reject a zero delta and anything beyond `MAX_ADJUST_DELTA` either way
fn check_delta(delta: i64) -> ApiResult<()> {
    if delta == 0 {
        return Err(ApiError::BadRequest("delta must not be zero".to_string()));
    }
    if delta.unsigned_abs() > MAX_ADJUST_DELTA as u64 {
        return Err(ApiError::BadRequest(format!(
            "delta must be between -{MAX_ADJUST_DELTA} and {MAX_ADJUST_DELTA}"
        )));
    }
    Ok(())
}

fn not_self(caller: &AuthUser, target: Uuid, message: &str) -> ApiResult<()> {
    if caller.id == target {
        return Err(ApiError::Forbidden(message.to_string()));
    }
    Ok(())
}

fn trophy_not_found() -> ApiError {
    ApiError::NotFound("Trophy not found".to_string())
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let (users, pending_users) = state.user_repository.counts().await?;
    let (pending_trophies, mut totals) = state.trophy_repository.dashboard_counts().await?;
    totals.users = users;

    let (recent, _) = state
        .trophy_repository
        .activity(PageWindow::new(Some(1), Some(RECENT_AWARDS), RECENT_AWARDS, 1, RECENT_AWARDS))
        .await?;

    Ok(Json(Dashboard {
        pending_trophies,
        pending_users,
        totals,
        recent,
    }))
}

pub async fn activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<impl IntoResponse> {
    let window = PageWindow::new(lenient(&query.page), lenient(&query.limit), 10, 5, 50);
    let (items, total) = state.trophy_repository.activity(window).await?;

    Ok(Json(ActivityPage {
        items,
        page: window.page,
        limit: window.size,
        total,
        page_count: window.page_count(total),
    }))
}

/// Accounts waiting for approval, oldest first
pub async fn pending_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.user_repository.list_pending().await?))
}

pub async fn approve_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .approve(id)
        .await?
        .ok_or_else(user_not_found)?;

    info!("User approved: {}", user.id);
    Ok(Json(user))
}

pub async fn manageable_users(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.user_repository.list_manageable(caller.id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    not_self(&caller, id, "You cannot edit your own account here")?;

    let issues = validate_profile(&payload.name, &payload.email);
    if !issues.is_empty() {
        return Err(ApiError::Validation(issues));
    }

    let email = normalize_email(&payload.email);
    match state
        .user_repository
        .update(id, payload.name.trim(), &email, payload.approved)
        .await?
    {
        UserUpdate::Updated(user) => Ok(Json(user)),
        UserUpdate::NotFound => Err(user_not_found()),
        UserUpdate::EmailTaken => Err(ApiError::Conflict("Email already in use".to_string())),
    }
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    not_self(&caller, id, "You cannot delete your own account")?;

    if !state.user_repository.delete_with_trophies(id).await? {
        return Err(user_not_found());
    }
    state.leaderboard.invalidate().await;

    info!(admin = %caller.email, "User {} deleted", id);
    Ok(Json(json!({ "ok": true })))
}

pub async fn list_trophies(
    State(state): State<AppState>,
    Query(query): Query<AdminTrophyQuery>,
) -> ApiResult<impl IntoResponse> {
    let window = PageWindow::new(lenient(&query.page), lenient(&query.page_size), 20, 1, 100);
    let filter = TrophyFilter::from(&query);
    let (items, total) = state.trophy_repository.list(&filter, window).await?;

    Ok(Json(AdminTrophyPage {
        items,
        total,
        page: window.page,
        page_size: window.size,
    }))
}

pub async fn grant_trophy(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<GrantTrophyRequest>,
) -> ApiResult<impl IntoResponse> {
    let competition = parse_competition(&payload.competition)?;
    let season = parse_season(payload.season.as_deref())?;
    not_self(&caller, payload.user_id, "Admins cannot award themselves")?;

    state
        .user_repository
        .find_by_id(payload.user_id)
        .await?
        .ok_or_else(user_not_found)?;

    let award = state
        .trophy_repository
        .create(
            payload.user_id,
            competition,
            season.as_deref(),
            payload.approved.unwrap_or(true),
            caller.id,
        )
        .await?;
    state.leaderboard.invalidate().await;

    Ok((StatusCode::CREATED, Json(award)))
}

pub async fn get_trophy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let award = state
        .trophy_repository
        .find_with_owner(id)
        .await?
        .ok_or_else(trophy_not_found)?;
    Ok(Json(award))
}

pub async fn update_trophy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTrophyRequest>,
) -> ApiResult<impl IntoResponse> {
    let competition = payload
        .competition
        .as_deref()
        .map(parse_competition)
        .transpose()?;
    let season = parse_season(payload.season.as_deref())?;

    let award = state
        .trophy_repository
        .update(id, competition, season.as_deref(), payload.approved)
        .await?
        .ok_or_else(trophy_not_found)?;
    state.leaderboard.invalidate().await;

    Ok(Json(award))
}

pub async fn delete_trophy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.trophy_repository.delete(id).await? {
        return Err(trophy_not_found());
    }
    state.leaderboard.invalidate().await;

    Ok(Json(json!({ "ok": true })))
}

/// Claims waiting for approval, oldest first
pub async fn trophy_requests(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.trophy_repository.pending_requests().await?))
}

pub async fn approve_trophy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let award = state
        .trophy_repository
        .approve(id)
        .await?
        .ok_or_else(trophy_not_found)?;
    state.leaderboard.invalidate().await;

    info!("Trophy approved: {}", award.id);
    Ok(Json(award))
}

/// Rejection removes the claim outright
pub async fn reject_trophy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.trophy_repository.delete(id).await? {
        return Err(trophy_not_found());
    }
    state.leaderboard.invalidate().await;

    info!("Trophy rejected: {}", id);
    Ok(Json(json!({ "ok": true })))
}

#[derive(Serialize)]
pub struct AdjustResponse {
    pub changed: u64,
}

pub async fn adjust_trophies(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<AdjustTrophiesRequest>,
) -> ApiResult<impl IntoResponse> {
    let competition = parse_competition(&payload.competition)?;
    let season = parse_season(payload.season.as_deref())?;
    not_self(&caller, payload.user_id, "Admins cannot adjust their own trophies")?;
    check_delta(payload.delta)?;

    state
        .user_repository
        .find_by_id(payload.user_id)
        .await?
        .ok_or_else(user_not_found)?;

    let changed = state
        .trophy_repository
        .adjust(
            payload.user_id,
            competition,
            season.as_deref(),
            payload.delta,
            caller.id,
        )
        .await?;
    state.leaderboard.invalidate().await;

    Ok(Json(AdjustResponse { changed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::Role;

    #[test]
    fn self_targeting_is_forbidden() {
        let admin = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Admin,
            approved: true,
            name: "Admin".to_string(),
            email: "admin@example.com".to_string(),
        };
        assert!(matches!(
            not_self(&admin, admin.id, "no"),
            Err(ApiError::Forbidden(_))
        ));
        assert!(not_self(&admin, Uuid::new_v4(), "no").is_ok());
    }

    #[test]
    fn adjust_delta_is_bounded() {
        assert!(check_delta(1).is_ok());
        assert!(check_delta(-MAX_ADJUST_DELTA).is_ok());
        assert!(check_delta(MAX_ADJUST_DELTA).is_ok());

        for delta in [0, MAX_ADJUST_DELTA + 1, -MAX_ADJUST_DELTA - 1, i64::MAX, i64::MIN] {
            let err = check_delta(delta).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{delta}");
        }
    }
}
