use axum::response::Response;

use super::render_template;
use crate::error::AppError;

#[derive(askama::Template)]
#[template(path = "pages/index.html")]
struct IndexTemplate;

/// GET / - Public landing page. The gate sends visitors with a session cookie
/// to /dashboard before this handler runs.
pub async fn page() -> Result<Response, AppError> {
    render_template(IndexTemplate)
}
