#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use frontdesk::config::{
    Config, ObservabilityConfig, RuntimeConfig, ServerConfig, UpstreamConfig,
};

pub const TEST_EMAIL: &str = "user@example.com";
pub const TEST_PASSWORD: &str = "password123";
/// URL-encoded CSRF cookie value; decodes to `abc=123`.
pub const CSRF_RAW: &str = "abc%3D123";
pub const CSRF_DECODED: &str = "abc=123";
pub const SESSION_VALUE: &str = "authed";

/// Shared counters and captures for asserting what the mock upstream saw.
#[derive(Clone, Default)]
pub struct UpstreamLog {
    pub user_calls: Arc<AtomicUsize>,
    pub logout_calls: Arc<AtomicUsize>,
    pub login_headers: Arc<Mutex<Option<HeaderMap>>>,
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    pub log: UpstreamLog,
}

/// Spawn a mock authentication API on an ephemeral port, mimicking the
/// Sanctum endpoints the app consumes.
pub async fn spawn_upstream() -> MockUpstream {
    let log = UpstreamLog::default();

    let router = Router::new()
        .route("/sanctum/csrf-cookie", get(csrf_cookie))
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/api/user", get(current_user))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockUpstream { addr, log }
}

pub fn test_config(api_url: String) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        upstream: UpstreamConfig {
            api_url,
            app_url: "http://localhost:3000".to_string(),
        },
        runtime: RuntimeConfig::default(),
        observability: ObservabilityConfig::default(),
    }
}

/// App wired to a live mock upstream.
pub async fn create_test_app() -> (Router, MockUpstream) {
    let upstream = spawn_upstream().await;
    let app = frontdesk::create_app(test_config(format!("http://{}", upstream.addr))).unwrap();
    (app, upstream)
}

/// App wired to an address nothing listens on; every upstream call fails.
pub fn create_dead_upstream_app() -> Router {
    frontdesk::create_app(test_config("http://127.0.0.1:9".to_string())).unwrap()
}

async fn csrf_cookie() -> Response {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(
            header::SET_COOKIE,
            format!("XSRF-TOKEN={CSRF_RAW}; Path=/; SameSite=Lax"),
        )
        .header(
            header::SET_COOKIE,
            "laravel-session=priming; Path=/; HttpOnly; SameSite=Lax",
        )
        .body(Body::empty())
        .unwrap()
}

async fn login(
    State(log): State<UpstreamLog>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    *log.login_headers.lock().await = Some(headers.clone());

    if !double_submit_ok(&headers) {
        return rejection(StatusCode::UNPROCESSABLE_ENTITY, "CSRF token mismatch.");
    }
    if body["email"] != TEST_EMAIL || body["password"] != TEST_PASSWORD {
        return rejection(
            StatusCode::UNPROCESSABLE_ENTITY,
            "These credentials do not match our records.",
        );
    }

    authenticated_response()
}

async fn register(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !double_submit_ok(&headers) {
        return rejection(StatusCode::UNPROCESSABLE_ENTITY, "CSRF token mismatch.");
    }
    if body["password"] != body["password_confirmation"] {
        return rejection(
            StatusCode::UNPROCESSABLE_ENTITY,
            "The password confirmation does not match.",
        );
    }

    authenticated_response()
}

async fn logout(State(log): State<UpstreamLog>) -> StatusCode {
    log.logout_calls
        .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

async fn current_user(State(log): State<UpstreamLog>, headers: HeaderMap) -> Response {
    log.user_calls
        .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

    let cookies = header_str(&headers, header::COOKIE);
    if cookies.contains(&format!("laravel-session={SESSION_VALUE}")) {
        Json(json!({
            "id": 1,
            "name": "Test User",
            "email": TEST_EMAIL,
        }))
        .into_response()
    } else {
        rejection(StatusCode::UNAUTHORIZED, "Unauthenticated.")
    }
}

/// The double-submit rule: decoded header must match the issued cookie, and
/// the cookie itself must be forwarded raw.
fn double_submit_ok(headers: &HeaderMap) -> bool {
    header_str(headers, "x-xsrf-token") == CSRF_DECODED
        && header_str(headers, header::COOKIE).contains(&format!("XSRF-TOKEN={CSRF_RAW}"))
}

fn header_str<K>(headers: &HeaderMap, name: K) -> String
where
    K: axum::http::header::AsHeaderName,
{
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn rejection(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn authenticated_response() -> Response {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(
            header::SET_COOKIE,
            format!("laravel-session={SESSION_VALUE}; Path=/; HttpOnly; SameSite=Lax"),
        )
        .header(
            header::SET_COOKIE,
            format!("XSRF-TOKEN={CSRF_RAW}; Path=/; SameSite=Lax"),
        )
        .body(Body::empty())
        .unwrap()
}
