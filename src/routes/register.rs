//! Registration handlers. Same CSRF handshake and cookie relay as login; the
//! upstream signs the new user in on success.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::{error, info};

use super::{AppState, csrf_handshake, render_template};
use crate::cookies::parse_set_cookies;
use crate::error::AppError;
use crate::middleware::gate::DASHBOARD_PATH;
use crate::upstream::Registration;

const GENERIC_REGISTER_ERROR: &str = "Registration failed. Please try again.";

#[derive(askama::Template)]
#[template(path = "pages/register.html")]
struct RegisterTemplate {
    error_message: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

/// GET /register - Show registration form
pub async fn page() -> Result<Response, AppError> {
    render_template(RegisterTemplate {
        error_message: None,
        name: None,
        email: None,
    })
}

#[derive(Deserialize)]
pub struct ActionInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// POST /register - Handle registration submission
pub async fn action(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(input): Form<ActionInput>,
) -> Result<Response, AppError> {
    let (mut relay, view) = match csrf_handshake(&state, &jar).await {
        Ok(ok) => ok,
        Err(err) => {
            error!(error = %err, "CSRF cookie fetch failed");
            return render_template(RegisterTemplate {
                error_message: Some(GENERIC_REGISTER_ERROR.to_string()),
                name: Some(input.name),
                email: Some(input.email),
            });
        }
    };

    let registration = Registration {
        name: input.name,
        email: input.email,
        password: input.password,
        password_confirmation: input.password_confirmation,
    };

    match state.upstream.register(&view, &registration).await {
        Ok(session_cookies) => {
            relay.extend(parse_set_cookies(&session_cookies));
            info!(email = %registration.email, "registration succeeded");
            Ok((relay, Redirect::to(DASHBOARD_PATH)).into_response())
        }
        Err(err) => {
            info!(email = %registration.email, error = %err, "registration rejected");
            let message = err
                .upstream_message()
                .map(str::to_string)
                .unwrap_or_else(|| GENERIC_REGISTER_ERROR.to_string());
            let page = render_template(RegisterTemplate {
                error_message: Some(message),
                name: Some(registration.name),
                email: Some(registration.email),
            })?;
            Ok((relay, page).into_response())
        }
    }
}
