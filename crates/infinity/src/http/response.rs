use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::error::{AppError, HttpError};
use crate::state::AppState;
use crate::view::{fragments::ErrorPage, fragments::HtmlTemplate, page_data, Layout, RequestScope};

pub fn html(body: impl Into<String>) -> Response {
    Html(body.into()).into_response()
}

pub fn json<T: Serialize>(value: T) -> Response {
    Json(value).into_response()
}

/// `302 Found` to `location`.
pub fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub fn forbidden(message: &str) -> Response {
    (StatusCode::FORBIDDEN, message.to_string()).into_response()
}

/// `401` with a JSON error body, for AJAX callers.
pub fn unauthorized_json() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Authentication required" })),
    )
        .into_response()
}

/// Renders the theme's `errors.404` page without a layout, or `message` as
/// plain text when the theme has none or it fails to render.
pub fn not_found(state: &AppState, scope: &RequestScope, message: &str) -> Response {
    if !state.view.exists("errors.404") {
        return (StatusCode::NOT_FOUND, message.to_string()).into_response();
    }

    let rendered = state.view.render(
        scope,
        "errors.404",
        page_data(json!({ "title": "404 Not Found", "message": message })),
        Layout::Bare,
    );
    match rendered {
        Ok(body) => (StatusCode::NOT_FOUND, Html(body)).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to render errors.404");
            (StatusCode::NOT_FOUND, message.to_string()).into_response()
        }
    }
}

/// Renders the theme's `errors.500` page without a layout. `details` are
/// only passed on when `app.debug` is on.
pub fn server_error(
    state: &AppState,
    scope: &RequestScope,
    message: &str,
    details: Option<String>,
) -> Response {
    let details = details.filter(|_| state.config.app.debug);

    if state.view.exists("errors.500") {
        let rendered = state.view.render(
            scope,
            "errors.500",
            page_data(json!({
                "title": "500 Internal Server Error",
                "message": message,
                "error_details": details.clone().unwrap_or_default(),
            })),
            Layout::Bare,
        );
        match rendered {
            Ok(body) => return (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response(),
            Err(err) => tracing::warn!(error = %err, "failed to render errors.500"),
        }
    }

    let mut response = HtmlTemplate(ErrorPage {
        status: 500,
        title: "Internal Server Error",
        message,
        details,
    })
    .into_response();
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Turns a handler error into the response the visitor sees.
pub fn error_response(state: &AppState, scope: &RequestScope, error: AppError) -> Response {
    let status = error.status();
    match status {
        StatusCode::NOT_FOUND => not_found(state, scope, &error.0.to_string()),
        StatusCode::UNAUTHORIZED if error.0.downcast_ref::<HttpError>().is_some() => {
            unauthorized_json()
        }
        StatusCode::FORBIDDEN => forbidden(&error.0.to_string()),
        status if status.is_server_error() => {
            tracing::error!(error = ?error, uri = %scope.uri, "request failed");
            server_error(state, scope, "Something went wrong", Some(format!("{:#}", error.0)))
        }
        status => (status, error.0.to_string()).into_response(),
    }
}
