use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde_json::json;

use infinity_core::content::Setting;
use infinity_core::view::uri_is;

use crate::error::AppError;
use crate::http::Request;
use crate::router::{Middleware, Next};
use crate::state::AppState;
use crate::view::{
    fragments::{HtmlTemplate, MaintenancePage},
    page_data, Layout,
};

pub const MAINTENANCE_SETTING: &str = "maintenance_mode";

/// Paths that stay reachable during maintenance.
const OPEN_PATHS: [&str; 4] = ["/admin", "/admin/*", "/login", "/logout"];

/// Answers `503` to anonymous visitors while the `maintenance_mode`
/// setting is `1`.
pub struct MaintenanceMiddleware;

#[async_trait]
impl Middleware for MaintenanceMiddleware {
    async fn handle(&self, state: &AppState, req: &mut Request) -> Result<Next, AppError> {
        if req.session().is_logged_in() || OPEN_PATHS.iter().any(|p| uri_is(req.path(), p)) {
            return Ok(Next::Continue);
        }
        if !maintenance_enabled(state).await {
            return Ok(Next::Continue);
        }

        tracing::debug!(path = %req.path(), "maintenance mode");
        let scope = req.scope();
        let site_name = state.config.app.name.as_str();

        let themed = if state.view.exists("errors.503") {
            state
                .view
                .render(
                    &scope,
                    "errors.503",
                    page_data(json!({ "title": "Under Maintenance", "site_name": site_name })),
                    Layout::Bare,
                )
                .map_err(|err| tracing::warn!(error = %err, "failed to render errors.503"))
                .ok()
        } else {
            None
        };

        let mut response = match themed {
            Some(body) => Html(body).into_response(),
            None => HtmlTemplate(MaintenancePage { site_name }).into_response(),
        };
        *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
        Ok(Next::Halt(response))
    }
}

/// Reads the setting; a missing settings table means maintenance is off.
async fn maintenance_enabled(state: &AppState) -> bool {
    match state.db.table_exists("settings").await {
        Ok(true) => {}
        Ok(false) => return false,
        Err(err) => {
            tracing::warn!(error = %err, "settings lookup failed");
            return false;
        }
    }

    state
        .db
        .table("settings")
        .where_eq("setting_key", MAINTENANCE_SETTING)
        .first_as::<Setting>()
        .await
        .ok()
        .flatten()
        .is_some_and(|setting| setting.is_enabled())
}
