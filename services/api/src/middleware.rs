//! Authentication middleware for JWT token validation

use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use common::{jwt::TokenType, models::Role};
use serde::Deserialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// Cookie the PWA stores its access token in
pub const SESSION_COOKIE: &str = "session";
const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub approved: bool,
    pub name: String,
    pub email: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Token carried in an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Bearer token, or the session cookie when no header is present
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = bearer_token(headers) {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Resolve an access token to its user; `None` for anything unusable
pub async fn resolve_user(state: &AppState, token: &str) -> Result<Option<AuthUser>, ApiError> {
    let claims = match state.jwt_service.validate_token(token) {
        Ok(claims) if claims.token_type == TokenType::Access => claims,
        Ok(_) => return Ok(None),
        Err(e) => {
            debug!("Rejected access token: {}", e);
            return Ok(None);
        }
    };

    let is_blacklisted = state
        .jwt_service
        .is_token_blacklisted(&state.redis_pool, token)
        .await
        .map_err(|e| {
            error!("Failed to check if token is blacklisted: {}", e);
            ApiError::InternalServerError
        })?;

    if is_blacklisted {
        return Ok(None);
    }

    Ok(Some(AuthUser {
        id: claims.sub,
        role: claims.role,
        approved: claims.approved,
        name: claims.name,
        email: claims.email,
    }))
}

async fn require_session(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = session_token(headers).ok_or(ApiError::Unauthorized)?;
    let user = resolve_user(state, &token)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    admit(user)
}

/// Signed-in users still waiting for approval get a 403
pub fn admit(user: AuthUser) -> Result<AuthUser, ApiError> {
    if !user.approved {
        return Err(ApiError::Forbidden("Account awaiting admin approval".to_string()));
    }
    Ok(user)
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = require_session(&state, req.headers()).await?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Reject anyone who is not an admin; runs after `auth_middleware`
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let is_admin = req
        .extensions()
        .get::<AuthUser>()
        .map(AuthUser::is_admin)
        .ok_or(ApiError::Unauthorized)?;

    if !is_admin {
        return Err(ApiError::Forbidden("Admin only".to_string()));
    }

    Ok(next.run(req).await)
}

#[derive(Debug, Default, Deserialize)]
pub struct CronTokenQuery {
    pub token: Option<String>,
}

/// Whether the request presents the scheduler secret
pub fn cron_authorized(secret: Option<&str>, query_token: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return false;
    };

    let presented = query_token
        .filter(|t| !t.is_empty())
        .or_else(|| {
            headers
                .get(CRON_SECRET_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|t| !t.is_empty())
        })
        .or_else(|| bearer_token(headers));

    presented == Some(secret)
}

/// A session, or the cron secret in place of one
pub async fn session_or_cron_middleware(
    State(state): State<AppState>,
    Query(query): Query<CronTokenQuery>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if cron_authorized(
        state.config.cron_secret.as_deref(),
        query.token.as_deref(),
        req.headers(),
    ) {
        debug!("fixtures request authorized by cron secret");
        return Ok(next.run(req).await);
    }

    let user = require_session(&state, req.headers()).await?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        http::{HeaderValue, StatusCode, header::COOKIE},
        middleware::from_fn,
        routing::get,
    };

    fn user(role: Role, approved: bool) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role,
            approved,
            name: "Aes".into(),
            email: "aes@example.com".into(),
        }
    }

    /// Serve `/` behind `admin_middleware`, with `signed_in` placed in the
    /// request extensions the way `auth_middleware` would
    async fn admin_only_server(signed_in: Option<AuthUser>) -> String {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .route_layer(from_fn(admin_middleware))
            .route_layer(from_fn(move |mut req: Request<Body>, next: Next| {
                let signed_in = signed_in.clone();
                async move {
                    if let Some(user) = signed_in {
                        req.extensions_mut().insert(user);
                    }
                    next.run(req).await
                }
            }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn admin_gate_by_role() {
        let url = admin_only_server(Some(user(Role::Admin, true))).await;
        let res = reqwest::get(&url).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), "ok");

        let url = admin_only_server(Some(user(Role::User, true))).await;
        let res = reqwest::get(&url).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Admin only");

        let url = admin_only_server(None).await;
        let res = reqwest::get(&url).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn unapproved_users_are_not_admitted() {
        let err = admit(user(Role::User, false)).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Account awaiting admin approval");

        let err = admit(user(Role::Admin, false)).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        assert!(admit(user(Role::User, true)).is_ok());
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[test]
    fn session_token_prefers_header_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; session=from-cookie"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-header"));

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("session="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn cron_secret_sources() {
        let mut headers = HeaderMap::new();
        assert!(cron_authorized(Some("s3cret"), Some("s3cret"), &headers));
        assert!(!cron_authorized(Some("s3cret"), Some("nope"), &headers));
        assert!(!cron_authorized(None, Some("s3cret"), &headers));
        assert!(!cron_authorized(Some(""), Some(""), &headers));

        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(cron_authorized(Some("s3cret"), None, &headers));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert!(cron_authorized(Some("s3cret"), None, &headers));
    }
}
