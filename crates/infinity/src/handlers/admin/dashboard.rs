use axum::response::{IntoResponse, Response};
use serde_json::json;

use infinity_core::content::{Post, PostStats, PostStatus};
use infinity_core::query::Direction;

use crate::db::Database;
use crate::error::AppError;
use crate::http::Request;
use crate::state::AppState;
use crate::view::fragments::{HtmlTemplate, StatsFragment};

use crate::handlers::{redirect_to, render_admin};

const RECENT_POSTS: u64 = 5;

pub async fn post_stats(db: &Database) -> Result<PostStats, AppError> {
    let total = db.table("posts").count().await?;
    let published = db
        .table("posts")
        .where_eq("status", PostStatus::Published.as_str())
        .count()
        .await?;
    Ok(PostStats::new(total, published))
}

/// GET /admin
pub async fn root(state: AppState, _req: Request) -> Result<Response, AppError> {
    Ok(redirect_to(&state, "/admin/dashboard"))
}

/// GET /admin/dashboard
pub async fn index(state: AppState, req: Request) -> Result<Response, AppError> {
    let stats = post_stats(&state.db).await?;
    let recent: Vec<Post> = state
        .db
        .table("posts")
        .order_by("created_at", Direction::Desc)
        .order_by("id", Direction::Desc)
        .limit(RECENT_POSTS)
        .get_as()
        .await?;

    render_admin(
        &state,
        &req,
        "dashboard.index",
        json!({ "title": "Dashboard", "stats": stats, "recent_posts": recent }),
    )
}

/// Stats cards as an HTMX fragment (GET /admin/stats).
pub async fn stats(state: AppState, _req: Request) -> Result<Response, AppError> {
    let stats = post_stats(&state.db).await?;
    Ok(HtmlTemplate(StatsFragment { stats }).into_response())
}
