//! Route handlers.
//!
//! Every handler is an `async fn(AppState, Request) -> Result<Response, AppError>`
//! registered in [`crate::routes`].

pub mod admin;
pub mod auth;
pub mod home;
pub mod pages;
pub mod posts;

use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::error::{AppError, HttpError};
use crate::http::{response, Request};
use crate::state::AppState;
use crate::view::{page_data, Layout};

/// Renders a theme page inside the default layout (bare for HTMX).
pub(crate) fn render(
    state: &AppState,
    req: &Request,
    name: &str,
    data: Value,
) -> Result<Response, AppError> {
    let html = state
        .view
        .render(&req.scope(), name, page_data(data), Layout::Auto)?;
    Ok(response::html(html))
}

/// Renders an admin page inside the admin layout (bare for HTMX).
pub(crate) fn render_admin(
    state: &AppState,
    req: &Request,
    name: &str,
    data: Value,
) -> Result<Response, AppError> {
    let html = state
        .admin_view
        .render(&req.scope(), name, page_data(data), Layout::Auto)?;
    Ok(response::html(html))
}

/// Redirects to a site path, honoring `app.url`.
pub(crate) fn redirect_to(state: &AppState, path: &str) -> Response {
    response::redirect(&state.view.url(path))
}

/// Timestamp format of the `created_at`/`updated_at` columns.
pub(crate) fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Parses the numeric `{id}` route parameter.
pub(crate) fn id_param(req: &Request) -> Result<i64, AppError> {
    req.param("id")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| HttpError::NotFound("Not found".to_string()).into())
}
