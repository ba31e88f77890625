//! Route gate: coarse allow/redirect decisions ahead of rendering.
//!
//! Presence-only: the gate checks that a session cookie exists, never its
//! validity. Real authorization is re-checked by the session verifier inside
//! protected pages, and by the upstream on every state-changing request.

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use crate::cookies::{LEGACY_SESSION_COOKIE, SESSION_COOKIE};
use crate::session::SessionCache;

/// Paths requiring a session cookie (prefix match).
pub const PROTECTED_PATHS: &[&str] = &["/dashboard", "/profile"];
/// Auth-only paths, pointless with a live session (prefix match).
pub const AUTH_PATHS: &[&str] = &["/login", "/register"];
pub const HOME_PATH: &str = "/";

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    ToLogin,
    ToDashboard,
}

/// Pure gate rules, in priority order.
pub fn decide(path: &str, has_session: bool) -> GateDecision {
    if PROTECTED_PATHS.iter().any(|p| path.starts_with(p)) && !has_session {
        return GateDecision::ToLogin;
    }
    if AUTH_PATHS.iter().any(|p| path.starts_with(p)) && has_session {
        return GateDecision::ToDashboard;
    }
    if path == HOME_PATH && has_session {
        return GateDecision::ToDashboard;
    }
    GateDecision::Allow
}

/// Applies [`decide`] to each inbound page request. Pass-through responses get
/// the fixed security headers and the request is seeded with a fresh
/// [`SessionCache`] for handlers deeper in the render path.
pub async fn gate_middleware(jar: CookieJar, mut req: Request, next: Next) -> Response {
    let has_session =
        jar.get(SESSION_COOKIE).is_some() || jar.get(LEGACY_SESSION_COOKIE).is_some();
    let path = req.uri().path();

    match decide(path, has_session) {
        GateDecision::ToLogin => {
            tracing::debug!(path, "no session cookie, redirecting to login");
            redirect(LOGIN_PATH)
        }
        GateDecision::ToDashboard => {
            tracing::debug!(path, "session cookie present, redirecting to dashboard");
            redirect(DASHBOARD_PATH)
        }
        GateDecision::Allow => {
            req.extensions_mut().insert(SessionCache::default());
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            );
            headers.insert(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("SAMEORIGIN"),
            );
            headers.insert(
                header::X_XSS_PROTECTION,
                HeaderValue::from_static("1; mode=block"),
            );
            response
        }
    }
}

fn redirect(location: &'static str) -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_path_without_session_goes_to_login() {
        assert_eq!(decide("/dashboard", false), GateDecision::ToLogin);
        assert_eq!(decide("/profile", false), GateDecision::ToLogin);
        assert_eq!(decide("/dashboard/settings", false), GateDecision::ToLogin);
    }

    #[test]
    fn protected_path_with_session_passes() {
        assert_eq!(decide("/dashboard", true), GateDecision::Allow);
        assert_eq!(decide("/profile", true), GateDecision::Allow);
    }

    #[test]
    fn auth_path_with_session_goes_to_dashboard() {
        assert_eq!(decide("/login", true), GateDecision::ToDashboard);
        assert_eq!(decide("/register", true), GateDecision::ToDashboard);
    }

    #[test]
    fn auth_path_without_session_passes() {
        assert_eq!(decide("/login", false), GateDecision::Allow);
        assert_eq!(decide("/register", false), GateDecision::Allow);
    }

    #[test]
    fn home_redirects_only_with_session() {
        assert_eq!(decide("/", true), GateDecision::ToDashboard);
        assert_eq!(decide("/", false), GateDecision::Allow);
    }

    #[test]
    fn unlisted_paths_pass_through() {
        assert_eq!(decide("/logout", true), GateDecision::Allow);
        assert_eq!(decide("/about", false), GateDecision::Allow);
    }
}
