//! The signed-in user's profile and award history

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{
        PageQuery, PageWindow, lenient,
        trophy::{TrophyCounts, TrophyHistoryPage},
        user::UserSummary,
    },
};

#[derive(Serialize)]
pub struct ProfileResponse {
    pub user: UserSummary,
    pub trophies: TrophyCounts,
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_id(caller.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let trophies = state.trophy_repository.approved_counts(caller.id).await?;

    Ok(Json(ProfileResponse { user, trophies }))
}

/// Newest first, 10 per page by default
pub async fn history(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let window = PageWindow::new(lenient(&query.page), lenient(&query.page_size), 10, 1, 50);
    let (items, total) = state.trophy_repository.history(caller.id, window).await?;

    Ok(Json(TrophyHistoryPage {
        items,
        page: window.page,
        page_size: window.size,
        total,
        max_page: window.page_count(total),
    }))
}
