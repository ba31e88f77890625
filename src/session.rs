//! Session verification against the upstream, memoized per request.
//!
//! The gate middleware seeds every passed-through request with a fresh
//! [`SessionCache`]; however many handlers or template helpers ask for the
//! auth state during one render pass, the upstream is consulted at most once.
//! The cache dies with the request, so every new inbound request re-verifies.

use std::sync::Arc;

use axum_extra::extract::CookieJar;
use tokio::sync::OnceCell;

use crate::cookies::CookieView;
use crate::upstream::{UpstreamClient, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub authenticated: bool,
    pub user: Option<User>,
}

impl SessionState {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user: None,
        }
    }

    fn verified(user: User) -> Self {
        Self {
            authenticated: true,
            user: Some(user),
        }
    }
}

/// Request-scoped memoization cell for the verification result.
#[derive(Debug, Clone, Default)]
pub struct SessionCache(Arc<OnceCell<SessionState>>);

/// Classify the request's auth state by forwarding `GET /api/user` upstream.
///
/// A 401 is the expected unauthenticated outcome, never logged as a failure.
/// Transport errors, 5xx, and malformed payloads degrade to unauthenticated.
pub async fn verify_session(
    cache: &SessionCache,
    upstream: &UpstreamClient,
    jar: &CookieJar,
) -> SessionState {
    cache
        .0
        .get_or_init(|| verify_uncached(upstream, jar))
        .await
        .clone()
}

async fn verify_uncached(upstream: &UpstreamClient, jar: &CookieJar) -> SessionState {
    let view = CookieView::from_jar(jar);

    // No session cookie at all: skip the upstream round trip.
    if !view.has_session() {
        return SessionState::anonymous();
    }

    match upstream.current_user(&view).await {
        Ok(Some(user)) => {
            tracing::debug!(email = %user.email, "session verified");
            SessionState::verified(user)
        }
        Ok(None) => SessionState::anonymous(),
        Err(err) => {
            tracing::debug!(error = %err, "session verification failed");
            SessionState::anonymous()
        }
    }
}
