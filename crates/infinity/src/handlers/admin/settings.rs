use axum::response::Response;
use serde_json::{json, Value};

use infinity_core::content::{Setting, SettingInput};
use infinity_core::query::{Direction, Record};

use crate::error::AppError;
use crate::http::Request;
use crate::state::AppState;

use crate::handlers::{redirect_to, render_admin, timestamp};

const MISSING_TABLE: &str = "The settings table does not exist. Please run migrations first.";

fn flash_errors(req: &Request, messages: Vec<String>) {
    req.session().flash("errors", messages);
}

/// `None` when the settings table is there; otherwise the redirect to send.
async fn require_table(state: &AppState, req: &Request) -> Result<Option<Response>, AppError> {
    if state.db.table_exists("settings").await? {
        return Ok(None);
    }
    flash_errors(req, vec![MISSING_TABLE.to_string()]);
    Ok(Some(redirect_to(state, "/admin/settings")))
}

fn id_input(req: &Request) -> Option<i64> {
    req.input_str("id").and_then(|id| id.trim().parse().ok())
}

fn take_errors(req: &Request) -> Value {
    req.session()
        .take_flash("errors")
        .unwrap_or(Value::Array(Vec::new()))
}

/// GET /admin/settings
pub async fn index(state: AppState, req: Request) -> Result<Response, AppError> {
    if !state.db.table_exists("settings").await? {
        return render_admin(
            &state,
            &req,
            "settings.error",
            json!({
                "title": "Settings",
                "error": "The settings table does not exist.",
                "message": "Please go to the Migrations page and run the migrations to create the settings table.",
            }),
        );
    }

    let settings: Vec<Setting> = state
        .db
        .table("settings")
        .order_by("setting_key", Direction::Asc)
        .get_as()
        .await?;
    let errors = take_errors(&req);

    render_admin(
        &state,
        &req,
        "settings.index",
        json!({ "title": "Settings", "settings": settings, "errors": errors }),
    )
}

/// GET /admin/settings/create
pub async fn create(state: AppState, req: Request) -> Result<Response, AppError> {
    if let Some(redirect) = require_table(&state, &req).await? {
        return Ok(redirect);
    }

    let errors = take_errors(&req);
    let old = req.session().take_old_input();
    render_admin(
        &state,
        &req,
        "settings.create",
        json!({ "title": "Create New Setting", "errors": errors, "old": old }),
    )
}

/// POST /admin/settings/store
pub async fn store(state: AppState, req: Request) -> Result<Response, AppError> {
    if let Some(redirect) = require_table(&state, &req).await? {
        return Ok(redirect);
    }

    let input: SettingInput = req.form()?;
    let rejected = match input.validate_create() {
        Err(errors) => Some(errors.messages().to_vec()),
        Ok(()) => {
            let key = input.setting_key.as_deref().unwrap_or_default().trim();
            let taken = state
                .db
                .table("settings")
                .where_eq("setting_key", key)
                .count()
                .await?
                > 0;
            taken.then(|| vec!["Setting key already exists".to_string()])
        }
    };
    if let Some(messages) = rejected {
        flash_errors(&req, messages);
        req.session().set_old_input(req.all().clone());
        return Ok(redirect_to(&state, "/admin/settings/create"));
    }

    let key = input.setting_key.as_deref().unwrap_or_default().trim();
    let now = timestamp();
    state
        .db
        .table("settings")
        .insert(
            &Record::new()
                .set("setting_key", key)
                .set("setting_value", input.setting_value.as_deref())
                .set("description", input.description.as_deref())
                .set("created_at", now.as_str())
                .set("updated_at", now.as_str()),
        )
        .await?;

    tracing::info!(setting_key = key, "setting created");
    req.session().flash("success", "Setting created successfully");
    Ok(redirect_to(&state, "/admin/settings"))
}

/// GET /admin/settings/edit?id=
pub async fn edit(state: AppState, req: Request) -> Result<Response, AppError> {
    if let Some(redirect) = require_table(&state, &req).await? {
        return Ok(redirect);
    }

    let setting: Option<Setting> = match id_input(&req) {
        Some(id) => state.db.table("settings").find_as(id).await?,
        None => None,
    };
    let Some(setting) = setting else {
        flash_errors(&req, vec!["Setting not found".to_string()]);
        return Ok(redirect_to(&state, "/admin/settings"));
    };

    let errors = take_errors(&req);
    render_admin(
        &state,
        &req,
        "settings.edit",
        json!({ "title": "Edit Setting", "setting": setting, "errors": errors }),
    )
}

/// POST /admin/settings/update
pub async fn update(state: AppState, req: Request) -> Result<Response, AppError> {
    if let Some(redirect) = require_table(&state, &req).await? {
        return Ok(redirect);
    }

    let Some(id) = id_input(&req) else {
        flash_errors(&req, vec!["Setting not found".to_string()]);
        return Ok(redirect_to(&state, "/admin/settings"));
    };

    let input: SettingInput = req.form()?;
    if let Err(errors) = input.validate_update() {
        flash_errors(&req, errors.messages().to_vec());
        return Ok(redirect_to(&state, &format!("/admin/settings/edit?id={id}")));
    }

    state
        .db
        .table("settings")
        .where_eq("id", id)
        .update(
            &Record::new()
                .set("setting_value", input.setting_value.as_deref())
                .set("description", input.description.as_deref())
                .set("updated_at", timestamp()),
        )
        .await?;

    tracing::info!(setting_id = id, "setting updated");
    req.session().flash("success", "Setting updated successfully");
    Ok(redirect_to(&state, "/admin/settings"))
}

/// POST /admin/settings/delete
pub async fn delete(state: AppState, req: Request) -> Result<Response, AppError> {
    if let Some(redirect) = require_table(&state, &req).await? {
        return Ok(redirect);
    }

    if let Some(id) = id_input(&req) {
        state.db.table("settings").where_eq("id", id).delete().await?;
        tracing::info!(setting_id = id, "setting deleted");
    }

    req.session().flash("success", "Setting deleted successfully");
    Ok(redirect_to(&state, "/admin/settings"))
}
