use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod middleware;
mod models;
mod rate_limiter;
mod repositories;
mod routes;
mod session;

use common::{
    cache::{RedisConfig, RedisPool},
    database,
    jwt::{JwtConfig, JwtService},
    validation::{normalize_email, validate_email, validate_password},
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::{
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::UserRepository,
    session::SessionManager,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_pool: RedisPool,
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub rate_limiter: RateLimiter,
    pub sessions: SessionManager,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting authentication service");

    let db_config = database::DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let jwt_service = JwtService::new(JwtConfig::from_env()?);

    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    let user_repository = UserRepository::new(pool.clone());
    bootstrap_admin(&user_repository).await?;

    let rate_limiter = RateLimiter::new(RateLimiterConfig::default());
    info!(
        max_attempts = rate_limiter.config().max_attempts,
        window_seconds = rate_limiter.config().window_seconds,
        "Login rate limiter configured"
    );

    let sessions = SessionManager::new(redis_pool.clone(), jwt_service.refresh_token_expiry());

    let app_state = AppState {
        db_pool: pool,
        redis_pool,
        jwt_service,
        user_repository,
        rate_limiter,
        sessions,
    };

    let app = routes::create_router(app_state).layer(TraceLayer::new_for_http());

    let bind_addr =
        std::env::var("AUTH_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Authentication service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Upsert an approved administrator when `ADMIN_EMAIL` and `ADMIN_PASSWORD` are set
async fn bootstrap_admin(users: &UserRepository) -> Result<()> {
    let (Ok(email), Ok(password)) = (
        std::env::var("ADMIN_EMAIL"),
        std::env::var("ADMIN_PASSWORD"),
    ) else {
        info!("ADMIN_EMAIL/ADMIN_PASSWORD not set, skipping admin bootstrap");
        return Ok(());
    };

    let email = normalize_email(&email);
    if let Err(msg) = validate_email(&email).and_then(|_| validate_password(&password)) {
        warn!("Skipping admin bootstrap: {}", msg);
        return Ok(());
    }

    let name = std::env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string());
    let admin = users.ensure_admin(&name, &email, &password).await?;
    info!("Administrator {} is ready", admin.id);
    Ok(())
}
