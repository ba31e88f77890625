pub mod config;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod session;
pub mod upstream;

pub use routes::AppState;

use axum::http::{HeaderName, HeaderValue, header};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

/// Create the app router from a loaded configuration.
///
/// Used by the `serve` command and by integration tests, which point the
/// upstream at a mock server instead of a real API.
pub fn create_app(config: config::Config) -> anyhow::Result<axum::Router> {
    let upstream = upstream::UpstreamClient::new(&config.upstream)?;
    let state = AppState { config, upstream };

    // Site-wide security headers; the gate adds the per-page set on top.
    Ok(routes::router(state)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains; preload"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
        ))
        .layer(TraceLayer::new_for_http()))
}
