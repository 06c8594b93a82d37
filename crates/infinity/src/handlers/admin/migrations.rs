use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

use infinity_core::migration::{MigrationReport, MigrationState, MigrationStatus};

use crate::error::AppError;
use crate::http::Request;
use crate::state::AppState;
use crate::view::fragments::{
    report_alert, HtmlTemplate, MigrationResultFragment, MigrationStatusFragment, StatusRow,
};

use crate::handlers::{redirect_to, render_admin};

fn status_rows(statuses: &[MigrationStatus]) -> Vec<Value> {
    statuses
        .iter()
        .map(|status| {
            let row = StatusRow::from(status);
            json!({
                "migration": row.migration,
                "state": row.state,
                "class": row.class,
                "batch": row.batch,
            })
        })
        .collect()
}

/// GET /admin/migrations
pub async fn index(state: AppState, req: Request) -> Result<Response, AppError> {
    let statuses = state.migrator.status().await?;
    let pending = statuses
        .iter()
        .filter(|s| s.state == MigrationState::Pending)
        .count();
    let results = req.session().take_flash("migration_results");
    let alert = req.session().take_flash("migration_alert");

    render_admin(
        &state,
        &req,
        "migrations.index",
        json!({
            "title": "Database Migrations",
            "migrations": status_rows(&statuses),
            "pending_count": pending,
            "results": results,
            "results_alert": alert,
        }),
    )
}

/// HTMX callers get the result alert in place; everyone else is redirected
/// back to the migrations page with the result flashed.
fn respond(state: &AppState, req: &Request, report: MigrationReport) -> Response {
    req.session().clear_migration_check();

    if req.is_htmx() {
        return HtmlTemplate(MigrationResultFragment::new(&report)).into_response();
    }

    req.session().flash("migration_results", report.lines());
    req.session().flash("migration_alert", report_alert(&report));
    redirect_to(state, "/admin/migrations")
}

/// POST /admin/migrations/run
pub async fn run(state: AppState, req: Request) -> Result<Response, AppError> {
    let report = state.migrator.run().await?;
    tracing::info!(failures = report.has_failures(), "migrations run from admin");
    Ok(respond(&state, &req, report))
}

/// POST /admin/migrations/rollback
pub async fn rollback(state: AppState, req: Request) -> Result<Response, AppError> {
    let report = state.migrator.rollback().await?;
    tracing::info!(failures = report.has_failures(), "migrations rolled back from admin");
    Ok(respond(&state, &req, report))
}

/// POST /admin/migrations/reset
pub async fn reset(state: AppState, req: Request) -> Result<Response, AppError> {
    let report = state.migrator.reset().await?;
    tracing::warn!(failures = report.has_failures(), "migrations reset from admin");
    Ok(respond(&state, &req, report))
}

/// Status table as an HTMX fragment (GET /admin/migrations/status).
pub async fn status(state: AppState, _req: Request) -> Result<Response, AppError> {
    let statuses = state.migrator.status().await?;
    Ok(HtmlTemplate(MigrationStatusFragment::new(&statuses)).into_response())
}
