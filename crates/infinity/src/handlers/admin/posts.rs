use axum::response::Response;
use serde_json::{json, Value};

use infinity_core::content::{numbered_slug, slugify, Post, PostInput};
use infinity_core::query::{Direction, Op, Record};

use crate::db::Database;
use crate::error::{AppError, HttpError};
use crate::http::Request;
use crate::state::AppState;

use crate::handlers::{id_param, redirect_to, render_admin, timestamp};

const DEFAULT_AUTHOR: &str = "Admin";

/// Slug for `title` that no other post uses. `exclude` is the post being
/// updated.
pub async fn unique_slug(
    db: &Database,
    title: &str,
    exclude: Option<i64>,
) -> Result<String, AppError> {
    let base = slugify(title);
    let mut attempt = 0;
    loop {
        let candidate = numbered_slug(&base, attempt);
        let mut query = db.table("posts").where_eq("slug", candidate.as_str());
        if let Some(id) = exclude {
            query = query.where_op("id", Op::Ne, id);
        }
        if query.count().await? == 0 {
            return Ok(candidate);
        }
        attempt += 1;
    }
}

async fn find_post(state: &AppState, id: i64) -> Result<Post, AppError> {
    state
        .db
        .table("posts")
        .find_as(id)
        .await?
        .ok_or_else(|| HttpError::NotFound("Post not found".to_string()).into())
}

/// Flashes validation errors and the submitted input, then redirects back.
fn reject(state: &AppState, req: &Request, messages: &[String], back: &str) -> Response {
    req.session().flash("errors", messages.to_vec());
    req.session().set_old_input(req.all().clone());
    redirect_to(state, back)
}

fn take_errors(req: &Request) -> Value {
    req.session()
        .take_flash("errors")
        .unwrap_or(Value::Array(Vec::new()))
}

/// GET /admin/posts
pub async fn index(state: AppState, req: Request) -> Result<Response, AppError> {
    let posts: Vec<Post> = state
        .db
        .table("posts")
        .order_by("created_at", Direction::Desc)
        .order_by("id", Direction::Desc)
        .get_as()
        .await?;

    render_admin(
        &state,
        &req,
        "posts.index",
        json!({ "title": "Manage Posts", "posts": posts }),
    )
}

/// GET /admin/posts/create
pub async fn create(state: AppState, req: Request) -> Result<Response, AppError> {
    let errors = take_errors(&req);
    let old = req.session().take_old_input();
    render_admin(
        &state,
        &req,
        "posts.create",
        json!({ "title": "Create New Post", "errors": errors, "old": old }),
    )
}

/// POST /admin/posts
pub async fn store(state: AppState, req: Request) -> Result<Response, AppError> {
    let input: PostInput = req.form()?;
    if let Err(errors) = input.validate() {
        return Ok(reject(&state, &req, errors.messages(), "/admin/posts/create"));
    }

    let title = input.title.as_deref().unwrap_or_default().trim();
    let slug = unique_slug(&state.db, title, None).await?;
    let now = timestamp();

    let id = state
        .db
        .table("posts")
        .insert(
            &Record::new()
                .set("title", title)
                .set("slug", slug.as_str())
                .set("content", input.content.as_deref().unwrap_or_default())
                .set("excerpt", input.excerpt())
                .set(
                    "author",
                    input
                        .author
                        .as_deref()
                        .filter(|a| !a.trim().is_empty())
                        .unwrap_or(DEFAULT_AUTHOR),
                )
                .set("status", input.status().as_str())
                .set("created_at", now.as_str())
                .set("updated_at", now.as_str()),
        )
        .await?;

    tracing::info!(post_id = id, slug = %slug, "post created");
    req.session().flash("success", "Post created successfully");
    Ok(redirect_to(&state, "/admin/posts"))
}

/// GET /admin/posts/{id}/edit
pub async fn edit(state: AppState, req: Request) -> Result<Response, AppError> {
    let post = find_post(&state, id_param(&req)?).await?;
    let errors = take_errors(&req);
    let old = req.session().take_old_input();
    render_admin(
        &state,
        &req,
        "posts.edit",
        json!({ "title": "Edit Post", "post": post, "errors": errors, "old": old }),
    )
}

/// POST or PUT /admin/posts/{id}
pub async fn update(state: AppState, req: Request) -> Result<Response, AppError> {
    let id = id_param(&req)?;
    let post = find_post(&state, id).await?;

    let input: PostInput = req.form()?;
    if let Err(errors) = input.validate() {
        let back = format!("/admin/posts/{id}/edit");
        return Ok(reject(&state, &req, errors.messages(), &back));
    }

    let title = input.title.as_deref().unwrap_or_default().trim();
    let slug = if title == post.title {
        post.slug.clone()
    } else {
        unique_slug(&state.db, title, Some(id)).await?
    };
    let author = input
        .author
        .clone()
        .filter(|a| !a.trim().is_empty())
        .or(post.author.clone());

    state
        .db
        .table("posts")
        .where_eq("id", id)
        .update(
            &Record::new()
                .set("title", title)
                .set("slug", slug.as_str())
                .set("content", input.content.as_deref().unwrap_or_default())
                .set("excerpt", input.excerpt())
                .set("author", author)
                .set("status", input.status().as_str())
                .set("updated_at", timestamp()),
        )
        .await?;

    tracing::info!(post_id = id, slug = %slug, "post updated");
    req.session().flash("success", "Post updated successfully");
    Ok(redirect_to(&state, "/admin/posts"))
}

/// DELETE /admin/posts/{id}
pub async fn destroy(state: AppState, req: Request) -> Result<Response, AppError> {
    let id = id_param(&req)?;
    find_post(&state, id).await?;

    state.db.table("posts").where_eq("id", id).delete().await?;

    tracing::info!(post_id = id, "post deleted");
    req.session().flash("success", "Post deleted successfully");
    Ok(redirect_to(&state, "/admin/posts"))
}
