use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use serde_json::json;

use crate::{
    AppState,
    error::ApiResult,
    models::leaderboard::{LeaderboardQuery, LeaderboardScope},
};

/// Ranking of approved awards, optionally narrowed to a competition or season
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<impl IntoResponse> {
    let rows = state.leaderboard.rows(&LeaderboardScope::from(&query)).await?;
    Ok(Json(json!({ "data": rows })))
}
