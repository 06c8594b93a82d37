use axum::response::Response;
use serde_json::json;

use infinity_core::content::{Post, PostStatus};
use infinity_core::query::Direction;

use crate::error::{AppError, HttpError};
use crate::http::Request;
use crate::state::AppState;

use super::render;

/// Published posts, newest first (GET /blog).
pub async fn index(state: AppState, req: Request) -> Result<Response, AppError> {
    let posts: Vec<Post> = state
        .db
        .table("posts")
        .where_eq("status", PostStatus::Published.as_str())
        .order_by("created_at", Direction::Desc)
        .order_by("id", Direction::Desc)
        .get_as()
        .await?;

    render(&state, &req, "blog", json!({ "title": "Blog", "posts": posts }))
}

/// A single published post (GET /post/{slug}).
pub async fn show(state: AppState, req: Request) -> Result<Response, AppError> {
    let slug = req.param("slug").unwrap_or_default();
    let post: Post = state
        .db
        .table("posts")
        .where_eq("slug", slug)
        .where_eq("status", PostStatus::Published.as_str())
        .first_as()
        .await?
        .ok_or_else(|| HttpError::NotFound("Post not found".to_string()))?;

    render(
        &state,
        &req,
        "post",
        json!({ "title": post.title.clone(), "post": post }),
    )
}
