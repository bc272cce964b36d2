use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    http::{Request, Response},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Span, info};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod fixtures;
mod guard;
mod integrations;
mod leaderboard;
mod middleware;
mod models;
mod repositories;
mod routes;
mod state;

use common::{
    cache::{RedisConfig, RedisPool},
    database::{self, DatabaseConfig, init_pool},
    jwt::{JwtConfig, JwtService},
};

use crate::{
    config::ApiConfig,
    integrations::{CdnProber, FootballDataClient, ImgbbClient},
    leaderboard::LeaderboardService,
    repositories::{GalleryRepository, TrophyRepository, UserRepository},
};

pub use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    let config = ApiConfig::from_env()?;

    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }
    database::run_migrations(&pool).await?;

    let redis_pool = RedisPool::new(&RedisConfig::from_env()?).await?;
    let jwt_service = JwtService::new(JwtConfig::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent(concat!("pes-trophy-api/", env!("CARGO_PKG_VERSION")))
        .build()?;

    if config.football_data_token.is_none() {
        info!("FOOTBALL_DATA_TOKEN not set, fixtures will report an upstream error");
    }

    let imgbb = ImgbbClient::new(http.clone(), config.imgbb_api_key.clone());
    if !imgbb.is_configured() {
        info!("IMGBB_API_KEY not set, gallery uploads are disabled");
    }

    let user_repository = UserRepository::new(pool.clone());
    let trophy_repository = TrophyRepository::new(pool.clone());
    let gallery_repository = GalleryRepository::new(pool.clone());

    let app_state = AppState {
        db_pool: pool,
        leaderboard: LeaderboardService::new(redis_pool.clone(), trophy_repository.clone()),
        redis_pool,
        jwt_service,
        imgbb,
        football_data: FootballDataClient::new(http.clone(), config.football_data_token.clone()),
        prober: CdnProber::new(http),
        user_repository,
        trophy_repository,
        gallery_repository,
        config: Arc::new(config),
    };

    let bind_addr = app_state.config.api_bind_addr.clone();
    let app = with_http_layers(routes::create_router(app_state));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("API service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn with_http_layers(router: Router) -> Router {
    router.layer(CorsLayer::permissive()).layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri(),
                    status = tracing::field::Empty,
                )
            })
            .on_response(|res: &Response<_>, latency: std::time::Duration, span: &Span| {
                let status = res.status();
                span.record("status", tracing::field::display(status));
                if status.is_server_error() {
                    tracing::error!(%status, ?latency, "response");
                } else {
                    tracing::info!(%status, ?latency, "response");
                }
            }),
    )
}
