use axum::response::Response;
use serde_json::{json, Value};

use infinity_core::content::{ContactInput, Page, PostStatus};

use crate::error::{AppError, HttpError};
use crate::http::Request;
use crate::state::AppState;

use super::{redirect_to, render};

async fn published_page(state: &AppState, slug: &str) -> Result<Option<Page>, AppError> {
    Ok(state
        .db
        .table("pages")
        .where_eq("slug", slug)
        .where_eq("status", PostStatus::Published.as_str())
        .first_as()
        .await?)
}

/// Renders the CMS page `slug` with its own template, falling back to the
/// theme's `page` template when the theme does not have it.
pub async fn show_page(state: &AppState, req: &Request, slug: &str) -> Result<Response, AppError> {
    let page = published_page(state, slug)
        .await?
        .ok_or_else(|| HttpError::NotFound("Page not found".to_string()))?;

    let template = match page.template_name() {
        name if state.view.exists(name) => name.to_string(),
        name => {
            tracing::debug!(template = name, slug, "theme lacks page template, using default");
            Page::DEFAULT_TEMPLATE.to_string()
        }
    };

    render(
        state,
        req,
        &template,
        json!({
            "title": page.title.clone(),
            "content": page.content.clone().unwrap_or_default(),
            "slug": page.slug.clone(),
            "page": page,
        }),
    )
}

/// GET /about
pub async fn about(state: AppState, req: Request) -> Result<Response, AppError> {
    show_page(&state, &req, "about").await
}

/// Contact page with the form (GET /contact). Works without a `contact`
/// page row.
pub async fn contact(state: AppState, req: Request) -> Result<Response, AppError> {
    let page = published_page(&state, "contact").await?;
    let title = page
        .as_ref()
        .map_or_else(|| "Contact Us".to_string(), |p| p.title.clone());
    let content = page
        .as_ref()
        .and_then(|p| p.content.clone())
        .unwrap_or_default();
    let errors = req
        .session()
        .take_flash("contact_errors")
        .unwrap_or(Value::Array(Vec::new()));
    let old = req.session().take_old_input();

    render(
        &state,
        &req,
        "contact",
        json!({
            "title": title,
            "page": page,
            "content": content,
            "errors": errors,
            "old": old,
        }),
    )
}

/// Contact form submission (POST /contact).
pub async fn submit_contact(state: AppState, req: Request) -> Result<Response, AppError> {
    let input: ContactInput = req.form()?;

    if let Err(errors) = input.validate() {
        tracing::debug!(%errors, "contact form rejected");
        req.session().flash("contact_errors", errors.messages().to_vec());
        req.session().set_old_input(
            serde_json::to_value(&input)?
                .as_object()
                .cloned()
                .unwrap_or_default(),
        );
        return Ok(redirect_to(&state, "/contact"));
    }

    tracing::info!(
        email = input.email.as_deref().unwrap_or_default(),
        "contact message received"
    );
    req.session().flash(
        "success",
        "Thank you for your message! We'll get back to you soon.",
    );
    Ok(redirect_to(&state, "/contact"))
}
