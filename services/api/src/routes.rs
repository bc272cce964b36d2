//! API service routes

mod admin;
mod fixtures;
mod gallery;
mod leaderboard;
mod me;
mod trophies;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::json;
use tower_http::services::{ServeDir, ServeFile};
use tracing::error;

use crate::{
    AppState,
    guard::navigation_guard,
    middleware::{admin_middleware, auth_middleware, session_or_cron_middleware},
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/activity", get(admin::activity))
        .route("/api/admin/users", get(admin::pending_users))
        .route("/api/admin/users/manage", get(admin::manageable_users))
        .route("/api/admin/users/:id/approve", post(admin::approve_user))
        .route(
            "/api/admin/users/:id",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route(
            "/api/admin/trophies",
            get(admin::list_trophies).post(admin::grant_trophy),
        )
        .route("/api/admin/trophies/requests", get(admin::trophy_requests))
        .route("/api/admin/trophies/adjust", post(admin::adjust_trophies))
        .route(
            "/api/admin/trophies/:id",
            get(admin::get_trophy)
                .put(admin::update_trophy)
                .delete(admin::delete_trophy),
        )
        .route("/api/admin/trophies/:id/approve", post(admin::approve_trophy))
        .route("/api/admin/trophies/:id/reject", post(admin::reject_trophy))
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let session_routes = Router::new()
        .route("/api/trophies", post(trophies::create_trophy))
        .route("/api/leaderboard", get(leaderboard::leaderboard))
        .route("/api/me", get(me::profile))
        .route("/api/me/trophies", get(me::history))
        .route("/api/gallery", get(gallery::list_images))
        .route(
            "/api/gallery/upload",
            post(gallery::upload_image).layer(DefaultBodyLimit::max(gallery::BODY_LIMIT)),
        )
        .route("/api/gallery/revalidate", post(gallery::revalidate_image))
        .route("/api/gallery/:id", delete(gallery::delete_image))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let fixture_routes = Router::new()
        .route("/api/fixtures", get(fixtures::list_fixtures))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_or_cron_middleware,
        ));

    let static_dir = state.config.static_dir.clone();
    let index = format!("{}/index.html", static_dir.trim_end_matches('/'));
    let pages = Router::new()
        .fallback_service(ServeDir::new(&static_dir).fallback(ServeFile::new(index)))
        .layer(middleware::from_fn_with_state(state.clone(), navigation_guard));

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/admin/gallery/cleanup",
            get(gallery::cleanup_by_query).post(gallery::cleanup_by_bearer),
        )
        .merge(admin_routes)
        .merge(session_routes)
        .merge(fixture_routes)
        .merge(pages)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or_else(|e| {
            error!("Database health check failed: {}", e);
            false
        });
    let redis = state.redis_pool.health_check().await.unwrap_or_else(|e| {
        error!("Redis health check failed: {}", e);
        false
    });

    let status = if database && redis {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "service": "api-service",
            "database": database,
            "redis": redis,
        })),
    )
}
