//! Login and logout handlers: the CSRF double-submit handshake end to end.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{CookieJar, cookie::Cookie};
use serde::Deserialize;
use tracing::{error, info};

use super::{AppState, csrf_handshake, render_template};
use crate::cookies::{
    CSRF_COOKIE, CookieView, LEGACY_SESSION_COOKIE, SESSION_COOKIE, parse_set_cookies,
};
use crate::error::AppError;
use crate::middleware::gate::{DASHBOARD_PATH, LOGIN_PATH};
use crate::upstream::Credentials;

pub(crate) const GENERIC_LOGIN_ERROR: &str = "Login failed. Please check your credentials.";

#[derive(askama::Template)]
#[template(path = "pages/login.html")]
struct LoginTemplate {
    error_message: Option<String>,
    email: Option<String>,
}

/// GET /login - Show login form
pub async fn page() -> Result<Response, AppError> {
    render_template(LoginTemplate {
        error_message: None,
        email: None,
    })
}

#[derive(Deserialize)]
pub struct ActionInput {
    pub email: String,
    pub password: String,
}

/// POST /login - Handle login submission
///
/// 1. Fetch the CSRF cookie from the upstream and relay it onto the response.
/// 2. Re-derive the CSRF token from the merged cookie view (the relay step may
///    have just introduced the very cookie being read).
/// 3. POST credentials with the double-submit header; relay the session
///    cookies and redirect to the dashboard.
pub async fn action(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(input): Form<ActionInput>,
) -> Result<Response, AppError> {
    let (mut relay, view) = match csrf_handshake(&state, &jar).await {
        Ok(ok) => ok,
        Err(err) => {
            error!(error = %err, "CSRF cookie fetch failed");
            return render_template(LoginTemplate {
                error_message: Some(GENERIC_LOGIN_ERROR.to_string()),
                email: Some(input.email),
            });
        }
    };

    let credentials = Credentials {
        email: input.email,
        password: input.password,
    };

    match state.upstream.login(&view, &credentials).await {
        Ok(session_cookies) => {
            relay.extend(parse_set_cookies(&session_cookies));
            info!(email = %credentials.email, "login succeeded");
            // Fresh verified state comes from the upstream on the next
            // request; the login response itself is never trusted for user
            // data.
            Ok((relay, Redirect::to(DASHBOARD_PATH)).into_response())
        }
        Err(err) => {
            info!(email = %credentials.email, error = %err, "login rejected");
            let message = err
                .upstream_message()
                .map(str::to_string)
                .unwrap_or_else(|| GENERIC_LOGIN_ERROR.to_string());
            let page = render_template(LoginTemplate {
                error_message: Some(message),
                email: Some(credentials.email),
            })?;
            Ok((relay, page).into_response())
        }
    }
}

/// POST /logout - Invalidate the upstream session and clear local cookies.
///
/// The local cookies are cleared whether or not the upstream call succeeds; a
/// dead upstream must not leave the browser holding a session cookie.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let view = CookieView::from_jar(&jar);
    if let Err(err) = state.upstream.logout(&view).await {
        error!(error = %err, "upstream logout failed");
    }

    let jar = jar
        .remove(removal(SESSION_COOKIE))
        .remove(removal(LEGACY_SESSION_COOKIE))
        .remove(removal(CSRF_COOKIE));

    (jar, Redirect::to(LOGIN_PATH))
}

/// Removal cookie matching the path the relay writes under.
fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}
