//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use common::{
    jwt::{Claims, TokenType},
    validation::{FieldIssue, normalize_email, validate_email, validate_name, validate_password},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    AppState,
    middleware::{auth_middleware, bearer_token},
    models::{NewUser, SessionUser, User},
};

/// Request for user registration
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Response for user registration
#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: RegisteredUser,
}

#[derive(Serialize)]
pub struct RegisteredUser {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub approved: bool,
}

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for token generation
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: SessionUser,
}

/// Request carrying a refresh token (refresh and logout)
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/session", get(session))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh_token))
        .route("/api/auth/logout", post(logout))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);
    let redis = state.sessions.health_check().await.unwrap_or(false);
    let status = if database && redis {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "service": "auth-service",
            "database": database,
            "redis": redis,
        })),
    )
}

/// Collect every field problem of a registration payload
pub fn validate_registration(payload: &RegisterRequest) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    if let Err(msg) = validate_name(&payload.name) {
        issues.push(FieldIssue::new("name", msg));
    }
    if let Err(msg) = validate_email(&normalize_email(&payload.email)) {
        issues.push(FieldIssue::new("email", msg));
    }
    if let Err(msg) = validate_password(&payload.password) {
        issues.push(FieldIssue::new("password", msg));
    }
    issues
}

/// User registration endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let issues = validate_registration(&payload);
    if !issues.is_empty() {
        return Err(AuthError::Validation(issues));
    }

    let new_user = NewUser {
        name: payload.name.trim().to_string(),
        email: normalize_email(&payload.email),
        password: payload.password,
    };

    let user = state
        .user_repository
        .create(&new_user)
        .await
        .map_err(|e| {
            error!("Failed to create user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::EmailTaken)?;

    info!("Registered user {} awaiting approval", user.id);

    let response = RegisterResponse {
        message: "Registration received, awaiting admin approval".to_string(),
        user: RegisteredUser {
            id: user.id,
            name: user.name,
            email: user.email,
            approved: user.approved,
        },
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let email = normalize_email(&payload.email);
    info!("Login attempt for user: {}", email);

    if !state.rate_limiter.is_allowed(&email).await {
        return Err(AuthError::TooManyRequests);
    }

    let user = state
        .user_repository
        .find_by_email(&email)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::InvalidCredentials)?;

    let valid = state
        .user_repository
        .verify_password(&user, &payload.password)
        .map_err(|e| {
            error!("Failed to verify password: {}", e);
            AuthError::InternalServerError
        })?;

    if !valid {
        warn!("Invalid password for user: {}", user.id);
        return Err(AuthError::InvalidCredentials);
    }

    if !user.approved {
        return Err(AuthError::AwaitingApproval);
    }

    state.rate_limiter.reset(&email).await;

    let response = issue_tokens(&state, &user).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Refresh token endpoint
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Token refresh request");

    let claims = validate_refresh(&state, &payload.refresh_token).await?;

    let current = state
        .sessions
        .is_current(claims.sub, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to read session: {}", e);
            AuthError::InternalServerError
        })?;
    if !current {
        return Err(AuthError::Unauthorized);
    }

    // role or approval may have changed since the token was issued
    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::Unauthorized)?;

    if !user.approved {
        return Err(AuthError::AwaitingApproval);
    }

    revoke(&state, &payload.refresh_token, &claims).await?;
    let response = issue_tokens(&state, &user).await?;

    Ok((StatusCode::OK, Json(response)))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Logout request");

    let claims = validate_refresh(&state, &payload.refresh_token).await?;
    revoke(&state, &payload.refresh_token, &claims).await?;

    if let Some(access_token) = bearer_token(&headers) {
        if let Ok(access_claims) = state.jwt_service.validate_token(access_token) {
            revoke(&state, access_token, &access_claims).await?;
        }
    }

    state.sessions.delete(claims.sub).await.map_err(|e| {
        error!("Failed to remove session from Redis: {}", e);
        AuthError::InternalServerError
    })?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"message": "Logged out successfully"})),
    ))
}

/// Current session endpoint
pub async fn session(Extension(claims): Extension<Claims>) -> impl IntoResponse {
    Json(SessionUser {
        id: claims.sub,
        name: claims.name,
        email: claims.email,
        role: claims.role,
        approved: claims.approved,
    })
}

async fn validate_refresh(state: &AppState, token: &str) -> Result<Claims, AuthError> {
    let claims = state
        .jwt_service
        .validate_token(token)
        .map_err(|_| AuthError::Unauthorized)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::Unauthorized);
    }

    let is_blacklisted = state
        .jwt_service
        .is_token_blacklisted(&state.redis_pool, token)
        .await
        .map_err(|e| {
            error!("Failed to check if token is blacklisted: {}", e);
            AuthError::InternalServerError
        })?;

    if is_blacklisted {
        return Err(AuthError::Unauthorized);
    }

    Ok(claims)
}

async fn revoke(state: &AppState, token: &str, claims: &Claims) -> Result<(), AuthError> {
    let remaining = state.jwt_service.remaining_lifetime(claims).map_err(|e| {
        error!("Failed to compute token lifetime: {}", e);
        AuthError::InternalServerError
    })?;

    state
        .jwt_service
        .blacklist_token(&state.redis_pool, token, remaining)
        .await
        .map_err(|e| {
            error!("Failed to blacklist token: {}", e);
            AuthError::InternalServerError
        })
}

async fn issue_tokens(state: &AppState, user: &User) -> Result<TokenResponse, AuthError> {
    let subject = user.token_subject();

    let access_token = state
        .jwt_service
        .generate_access_token(&subject)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            AuthError::InternalServerError
        })?;

    let refresh_token = state
        .jwt_service
        .generate_refresh_token(&subject)
        .map_err(|e| {
            error!("Failed to generate refresh token: {}", e);
            AuthError::InternalServerError
        })?;

    state
        .sessions
        .store(user.id, &refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to store session in Redis: {}", e);
            AuthError::InternalServerError
        })?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
        user: SessionUser::from(user),
    })
}

/// Custom error type for authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid input")]
    Validation(Vec<FieldIssue>),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Account is awaiting admin approval")]
    AwaitingApproval,
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Too many login attempts, try again later")]
    TooManyRequests,
    #[error("Internal server error")]
    InternalServerError,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::AwaitingApproval => StatusCode::FORBIDDEN,
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AuthError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AuthError::Validation(issues) => serde_json::json!({
                "error": self.to_string(),
                "issues": issues,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn registration_issues_name_each_bad_field() {
        let issues = validate_registration(&request("A", "bad", "123"));
        let fields: Vec<_> = issues.iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["name", "email", "password"]);

        assert!(validate_registration(&request("Rina", " Rina@Example.com ", "secret1")).is_empty());
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(AuthError::Validation(vec![]).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::AwaitingApproval.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::EmailTaken.status(), StatusCode::CONFLICT);
        assert_eq!(AuthError::TooManyRequests.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn error_response_keeps_status() {
        let res = AuthError::AwaitingApproval.into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = AuthError::Validation(vec![FieldIssue::new("email", "Invalid email format")])
            .into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
