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
#[template(path = "pages/profile.html")]
struct ProfileTemplate {
    user: User,
}

/// GET /profile - Account details for the verified user.
pub async fn page(
    State(state): State<AppState>,
    Extension(cache): Extension<SessionCache>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let session = verify_session(&cache, &state.upstream, &jar).await;
    match session.user {
        Some(user) => render_template(ProfileTemplate { user }),
        None => Ok(Redirect::to(LOGIN_PATH).into_response()),
    }
}
