//! HTTP client for the upstream authentication API.
//!
//! One explicitly constructed client, carried in [`AppState`], instead of a
//! module-scoped global. Redirects are disabled so `Set-Cookie` headers on
//! login redirects stay visible, and no ambient cookie store is used: every
//! request's `Cookie` header is built from an explicit [`CookieView`].
//!
//! [`AppState`]: crate::routes::AppState

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header, redirect};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::UpstreamConfig;
use crate::cookies::CookieView;

pub const CSRF_COOKIE_ENDPOINT: &str = "/sanctum/csrf-cookie";
pub const LOGIN_ENDPOINT: &str = "/login";
pub const REGISTER_ENDPOINT: &str = "/register";
pub const LOGOUT_ENDPOINT: &str = "/logout";
pub const USER_ENDPOINT: &str = "/api/user";

/// Double-submit header carrying the URL-decoded `XSRF-TOKEN` cookie value.
pub const CSRF_HEADER: &str = "x-xsrf-token";

/// The authenticated user as returned by `GET /api/user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Error body shape the upstream uses for rejections.
#[derive(Debug, Deserialize)]
struct UpstreamMessage {
    message: Option<String>,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("invalid upstream url: {0}")]
    Url(#[from] url::ParseError),
}

impl UpstreamError {
    /// Human-readable message from the upstream, when it sent one.
    /// Transport failures have none; callers fall back to a generic message.
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            UpstreamError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    api_url: Url,
    app_url: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let http = Client::builder().redirect(redirect::Policy::none()).build()?;

        Ok(Self {
            http,
            api_url: Url::parse(&config.api_url)?,
            app_url: config.app_url.clone(),
        })
    }

    /// `GET /sanctum/csrf-cookie` - primes the CSRF handshake. Returns the
    /// raw `Set-Cookie` strings in response order for the relay to apply.
    pub async fn csrf_cookie(&self) -> Result<Vec<String>, UpstreamError> {
        let response = self
            .request(Method::GET, CSRF_COOKIE_ENDPOINT, &CookieView::default())?
            .send()
            .await?;

        if response.status().is_client_error() || response.status().is_server_error() {
            return Err(Self::rejected(response).await);
        }
        Ok(set_cookie_strings(&response))
    }

    /// `POST /login` - on success returns the session `Set-Cookie` strings.
    /// On rejection carries the upstream's message for the login form.
    pub async fn login(
        &self,
        view: &CookieView,
        credentials: &Credentials,
    ) -> Result<Vec<String>, UpstreamError> {
        self.submit(LOGIN_ENDPOINT, view, credentials).await
    }

    /// `POST /register` - same handshake and cookie relay as login.
    pub async fn register(
        &self,
        view: &CookieView,
        registration: &Registration,
    ) -> Result<Vec<String>, UpstreamError> {
        self.submit(REGISTER_ENDPOINT, view, registration).await
    }

    /// `POST /logout` - invalidates the upstream session.
    pub async fn logout(&self, view: &CookieView) -> Result<(), UpstreamError> {
        let response = self
            .request(Method::POST, LOGOUT_ENDPOINT, view)?
            .send()
            .await?;

        if response.status().is_client_error() || response.status().is_server_error() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }

    /// `GET /api/user` - `Ok(Some(user))` when authenticated, `Ok(None)` on
    /// the expected 401, `Err` for anything else (transport, 5xx, bad payload).
    pub async fn current_user(&self, view: &CookieView) -> Result<Option<User>, UpstreamError> {
        let response = self.request(Method::GET, USER_ENDPOINT, view)?.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(Some(response.json::<User>().await?))
    }

    async fn submit<B: Serialize>(
        &self,
        path: &str,
        view: &CookieView,
        body: &B,
    ) -> Result<Vec<String>, UpstreamError> {
        let response = self
            .request(Method::POST, path, view)?
            .json(body)
            .send()
            .await?;

        if response.status().is_client_error() || response.status().is_server_error() {
            return Err(Self::rejected(response).await);
        }
        Ok(set_cookie_strings(&response))
    }

    /// Fixed header contract for every upstream hop: forwarded cookies, the
    /// decoded CSRF header (omitted entirely when no token is present), JSON
    /// accept, and the configured app origin as referer.
    fn request(
        &self,
        method: Method,
        path: &str,
        view: &CookieView,
    ) -> Result<RequestBuilder, UpstreamError> {
        let url = self.api_url.join(path)?;
        let mut request = self
            .http
            .request(method, url)
            .header(header::ACCEPT, "application/json")
            .header(header::REFERER, &self.app_url);

        if !view.is_empty() {
            request = request.header(header::COOKIE, view.header());
        }
        if let Some(token) = view.csrf_token() {
            request = request.header(CSRF_HEADER, token);
        }

        Ok(request)
    }

    async fn rejected(response: Response) -> UpstreamError {
        let status = response.status();
        let message = response
            .json::<UpstreamMessage>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| format!("upstream returned {status}"));

        UpstreamError::Rejected { status, message }
    }
}

fn set_cookie_strings(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok().map(str::to_string))
        .collect()
}
