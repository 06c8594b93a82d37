use axum::response::{IntoResponse, Response};
use serde_json::json;

use infinity_core::content::{Post, PostStatus};
use infinity_core::query::Direction;

use crate::error::AppError;
use crate::http::Request;
use crate::state::AppState;
use crate::view::fragments::{HtmlTemplate, LatestPostsFragment, PostCard};

use super::render;

const LATEST_POSTS: u64 = 5;

/// Home page (GET /).
pub async fn index(state: AppState, req: Request) -> Result<Response, AppError> {
    render(&state, &req, "home", json!({ "title": "Home" }))
}

/// Latest published posts as an HTMX fragment (GET /api/posts/latest).
pub async fn latest_posts(state: AppState, _req: Request) -> Result<Response, AppError> {
    let posts: Vec<Post> = state
        .db
        .table("posts")
        .where_eq("status", PostStatus::Published.as_str())
        .order_by("created_at", Direction::Desc)
        .order_by("id", Direction::Desc)
        .limit(LATEST_POSTS)
        .get_as()
        .await?;

    let posts = posts
        .iter()
        .map(|post| PostCard::new(post, |path| state.view.url(path)))
        .collect();

    Ok(HtmlTemplate(LatestPostsFragment { posts }).into_response())
}
