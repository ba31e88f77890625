use askama::Template;
use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;

mod assets;
mod dashboard;
mod health;
mod index;
mod login;
mod profile;
mod register;

pub use assets::AssetsService;

use crate::config::Config;
use crate::cookies::{CookieView, RelayJar, parse_set_cookies};
use crate::error::AppError;
use crate::middleware::gate_middleware;
use crate::upstream::{UpstreamClient, UpstreamError};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub upstream: UpstreamClient,
}

/// Helper to render templates
pub(crate) fn render_template<T: Template>(t: T) -> Result<Response, AppError> {
    Ok(Html(t.render()?).into_response())
}

#[derive(Template)]
#[template(path = "pages/not_found.html")]
struct NotFoundTemplate;

pub async fn fallback() -> Response {
    match render_template(NotFoundTemplate) {
        Ok(mut response) => {
            *response.status_mut() = StatusCode::NOT_FOUND;
            response
        }
        Err(e) => e.into_response(),
    }
}

/// Run the CSRF handshake: fetch the upstream's CSRF cookies, stage them for
/// the outgoing response, and return the merged cookie view for the follow-up
/// POST.
///
/// The view has to be built explicitly because relay writes only land on the
/// outgoing response; the inbound request's cookies never see them.
pub(crate) async fn csrf_handshake(
    state: &AppState,
    jar: &CookieJar,
) -> Result<(RelayJar, CookieView), UpstreamError> {
    let raw = state.upstream.csrf_cookie().await?;
    let relayed = parse_set_cookies(&raw);

    let mut view = CookieView::from_jar(jar);
    view.merge_relayed(&relayed);

    let mut relay = RelayJar::new(state.config.runtime.is_production());
    relay.extend(relayed);
    Ok((relay, view))
}

pub fn router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(index::page))
        .route("/login", get(login::page).post(login::action))
        .route("/logout", post(login::logout))
        .route("/register", get(register::page).post(register::action))
        .route("/dashboard", get(dashboard::page))
        .route("/profile", get(profile::page))
        .fallback(fallback)
        .layer(axum_middleware::from_fn(gate_middleware))
        .with_state(state);

    Router::new()
        .route("/health", get(health::health))
        .nest_service("/static", AssetsService::new())
        .merge(pages)
}
