use axum::response::Response;
use serde_json::{json, Map, Value};

use infinity_core::content::{SessionUser, User};

use crate::error::AppError;
use crate::http::Request;
use crate::middleware::CSRF_FIELD;
use crate::password::verify_password;
use crate::state::AppState;

use super::{redirect_to, render};

/// Login form (GET /login). Logged-in users go straight to the dashboard.
pub async fn show_login(state: AppState, req: Request) -> Result<Response, AppError> {
    if req.session().is_logged_in() {
        return Ok(redirect_to(&state, "/admin/dashboard"));
    }

    let old = req.session().take_old_input();
    render(&state, &req, "auth.login", json!({ "title": "Login", "old": old }))
}

fn remember_username(req: &Request, username: &str) {
    let mut old = Map::new();
    old.insert("username".to_string(), Value::from(username));
    req.session().set_old_input(old);
}

/// Credential check (POST /login). `username` may also be an email.
pub async fn login(state: AppState, req: Request) -> Result<Response, AppError> {
    let session = req.session();

    if !session.verify_csrf(&req.input_or(CSRF_FIELD, "")) {
        session.flash("error", "Invalid request. Please try again.");
        return Ok(redirect_to(&state, "/login"));
    }

    let username = req.input_or("username", "").trim().to_string();
    let password = req.input_or("password", "");
    if username.is_empty() || password.is_empty() {
        session.flash("error", "Please enter both username and password.");
        remember_username(&req, &username);
        return Ok(redirect_to(&state, "/login"));
    }

    let user: Option<User> = state
        .db
        .table("users")
        .where_eq("username", username.as_str())
        .or_where_eq("email", username.as_str())
        .first_as()
        .await?;

    let Some(user) = user.filter(|user| verify_password(&password, &user.password)) else {
        tracing::info!(username = %username, "failed login");
        session.flash("error", "Invalid username or password.");
        remember_username(&req, &username);
        return Ok(redirect_to(&state, "/login"));
    };

    tracing::info!(user_id = user.id, username = %user.username, "login");
    session.login(SessionUser::from(&user));
    session.flash("success", format!("Welcome back, {}!", user.username));
    Ok(redirect_to(&state, "/admin/dashboard"))
}

/// GET /logout
pub async fn logout(state: AppState, req: Request) -> Result<Response, AppError> {
    if let Some(user) = req.session().user() {
        tracing::info!(user_id = user.id, "logout");
    }
    state.sessions.destroy(req.session()).await;
    req.session()
        .flash("success", "You have been logged out successfully.");
    Ok(redirect_to(&state, "/login"))
}
