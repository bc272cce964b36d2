//! Role-aware redirects in front of the static PWA bundle

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use common::models::Role;
use reqwest::Url;

use crate::{
    error::ApiError,
    middleware::{resolve_user, session_token},
    state::AppState,
};

const PUBLIC_PAGES: &[&str] = &[
    "/login",
    "/register",
    "/manifest.webmanifest",
    "/manifest.json",
    "/apple-touch-icon.png",
    "/offline",
    "/favicon.ico",
    "/robots.txt",
    "/sitemap.xml",
];

/// Outcome of the navigation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    Redirect(String),
}

fn always_public(path: &str) -> bool {
    path == "/api"
        || path.starts_with("/api/")
        || path.starts_with("/_next")
        || path.starts_with("/icons")
        || path.starts_with("/images")
        || path == "/sw.js"
}

/// `/login?callbackUrl=<target>` with the target form-encoded
pub fn login_redirect(target: &str) -> String {
    match Url::parse("http://localhost/login") {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("callbackUrl", target);
            match url.query() {
                Some(q) => format!("{}?{}", url.path(), q),
                None => url.path().to_string(),
            }
        }
        Err(_) => "/login".to_string(),
    }
}

/// Decide where a page request may go given the visitor's role, if any
pub fn navigate(path: &str, query: Option<&str>, role: Option<Role>) -> Navigation {
    if always_public(path) || PUBLIC_PAGES.contains(&path) {
        return match role {
            Some(role) if path == "/login" || path == "/register" => {
                Navigation::Redirect(home_for(role).to_string())
            }
            _ => Navigation::Allow,
        };
    }

    let Some(role) = role else {
        let target = match query.filter(|q| !q.is_empty()) {
            Some(q) => format!("{path}?{q}"),
            None => path.to_string(),
        };
        return Navigation::Redirect(login_redirect(&target));
    };

    let admin_area = path.starts_with("/admin");
    match (admin_area, role.is_admin()) {
        (true, false) => Navigation::Redirect("/".to_string()),
        (false, true) => Navigation::Redirect("/admin".to_string()),
        _ => Navigation::Allow,
    }
}

fn home_for(role: Role) -> &'static str {
    if role.is_admin() { "/admin" } else { "/" }
}

/// Applies `navigate` to every request reaching the static file service
pub async fn navigation_guard(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let role = match session_token(req.headers()) {
        Some(token) => resolve_user(&state, &token).await?.map(|user| user.role),
        None => None,
    };

    let uri = req.uri();
    match navigate(uri.path(), uri.query(), role) {
        Navigation::Allow => Ok(next.run(req).await),
        Navigation::Redirect(to) => Ok(Redirect::temporary(&to).into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirect(to: &str) -> Navigation {
        Navigation::Redirect(to.to_string())
    }

    #[test]
    fn assets_are_public_for_everyone() {
        for path in ["/_next/static/app.js", "/icons/192.png", "/sw.js", "/manifest.json", "/api/unknown"] {
            assert_eq!(navigate(path, None, None), Navigation::Allow);
            assert_eq!(navigate(path, None, Some(Role::Admin)), Navigation::Allow);
        }
    }

    #[test]
    fn anonymous_visitors_go_to_login_with_callback() {
        assert_eq!(
            navigate("/gallery", Some("page=2&x=a b"), None),
            redirect("/login?callbackUrl=%2Fgallery%3Fpage%3D2%26x%3Da+b")
        );
        assert_eq!(navigate("/", None, None), redirect("/login?callbackUrl=%2F"));
        assert_eq!(navigate("/login", None, None), Navigation::Allow);
        assert_eq!(navigate("/register", None, None), Navigation::Allow);
    }

    #[test]
    fn signed_in_visitors_skip_login_pages() {
        assert_eq!(navigate("/login", None, Some(Role::User)), redirect("/"));
        assert_eq!(navigate("/register", None, Some(Role::Admin)), redirect("/admin"));
    }

    #[test]
    fn areas_are_split_by_role() {
        assert_eq!(navigate("/admin/users", None, Some(Role::User)), redirect("/"));
        assert_eq!(navigate("/admin/users", None, Some(Role::Admin)), Navigation::Allow);
        assert_eq!(navigate("/leaderboard", None, Some(Role::Admin)), redirect("/admin"));
        assert_eq!(navigate("/leaderboard", None, Some(Role::User)), Navigation::Allow);
    }
}
