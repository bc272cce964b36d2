use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    AppState,
    fixtures::FixturePlan,
    integrations::FixturesError,
    models::fixture::{Fixture, FixtureQuery},
};

const CACHE_TTL_SECS: u64 = 1800;
const SUCCESS_CACHE_CONTROL: &str = "s-maxage=1800, stale-while-revalidate=60";
const FAILURE_CACHE_CONTROL: &str = "s-maxage=120, stale-while-revalidate=60";
const TIMEZONE_HEADER: HeaderName = HeaderName::from_static("x-timezone-display");

async fn upstream_fixtures(state: &AppState, plan: &FixturePlan) -> Result<Vec<Fixture>, FixturesError> {
    let key = plan.request.cache_key();

    match state.redis_pool.get_json::<Vec<Fixture>>(&key).await {
        Ok(Some(cached)) => {
            debug!(key, "fixtures cache hit");
            return Ok(cached);
        }
        Ok(None) => {}
        Err(e) => warn!(key, "fixtures cache read failed: {:#}", e),
    }

    let fixtures = state.football_data.matches(&plan.request).await?;

    if let Err(e) = state
        .redis_pool
        .set_json(&key, &fixtures, Some(CACHE_TTL_SECS))
        .await
    {
        warn!(key, "fixtures cache write failed: {:#}", e);
    }

    Ok(fixtures)
}

/// Upcoming or windowed matches from Football-Data
pub async fn list_fixtures(
    State(state): State<AppState>,
    Query(query): Query<FixtureQuery>,
) -> Response {
    let now = Utc::now();
    let plan = FixturePlan::from_query(&query, now.date_naive());

    match upstream_fixtures(&state, &plan).await {
        Ok(fixtures) => {
            let fixtures = plan.apply(fixtures, now.timestamp_millis());
            let mut res = Json(json!({ "fixtures": fixtures })).into_response();
            let headers = res.headers_mut();
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static(SUCCESS_CACHE_CONTROL),
            );
            headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
            if let Ok(tz) = HeaderValue::from_str(&plan.timezone) {
                headers.insert(TIMEZONE_HEADER, tz);
            }
            res
        }
        Err(e) => {
            warn!("Fixtures request failed: {}", e);
            let mut res = (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "fixtures": [], "error": e.to_string() })),
            )
                .into_response();
            res.headers_mut().insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static(FAILURE_CACHE_CONTROL),
            );
            res
        }
    }
}
