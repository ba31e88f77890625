use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::{AppState, render_template};
use crate::error::AppError;
use crate::middleware::gate::LOGIN_PATH;
use crate::session::{SessionCache, verify_session};
use crate::upstream::User;

#[derive(askama::Template)]
#[template(path = "pages/dashboard.html")]
struct DashboardTemplate {
    user: User,
}

/// GET /dashboard - The gate guarantees a session cookie is present; the
/// upstream still re-verifies it here before any user data is rendered.
pub async fn page(
    State(state): State<AppState>,
    Extension(cache): Extension<SessionCache>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let session = verify_session(&cache, &state.upstream, &jar).await;
    match session.user {
        Some(user) => render_template(DashboardTemplate { user }),
        None => Ok(Redirect::to(LOGIN_PATH).into_response()),
    }
}
