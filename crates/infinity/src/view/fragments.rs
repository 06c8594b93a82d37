//! HTML fragments compiled into the binary.
//!
//! These back the HTMX endpoints and the pages that must render even when
//! the active theme is broken (maintenance, fallback errors).

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use infinity_core::content::{Post, PostStats};
use infinity_core::migration::{MigrationReport, MigrationState, MigrationStatus};

/// Template wrapper that converts Askama templates into HTML responses.
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {err}"),
            )
                .into_response(),
        }
    }
}

const EXCERPT_CHARS: usize = 150;

pub struct PostCard {
    pub title: String,
    pub excerpt: String,
    pub url: String,
}

impl PostCard {
    /// `url` maps a site path to an absolute URL.
    pub fn new(post: &Post, url: impl Fn(&str) -> String) -> Self {
        Self {
            title: post.title.clone(),
            excerpt: post.content.chars().take(EXCERPT_CHARS).collect(),
            url: url(&format!("/post/{}", post.slug)),
        }
    }
}

/// Latest published posts (GET /api/posts/latest).
#[derive(Template)]
#[template(path = "fragments/latest_posts.html")]
pub struct LatestPostsFragment {
    pub posts: Vec<PostCard>,
}

/// Dashboard counters (GET /admin/stats).
#[derive(Template)]
#[template(path = "fragments/stats.html")]
pub struct StatsFragment {
    pub stats: PostStats,
}

/// Outcome of a migration action, as an alert box.
#[derive(Template)]
#[template(path = "fragments/migration_result.html")]
pub struct MigrationResultFragment {
    pub alert: &'static str,
    pub lines: Vec<String>,
}

impl MigrationResultFragment {
    pub fn new(report: &MigrationReport) -> Self {
        Self {
            alert: report_alert(report),
            lines: report.lines(),
        }
    }
}

/// Alert class for a migration report: `danger` when anything failed,
/// `warning` when there was nothing to do.
pub fn report_alert(report: &MigrationReport) -> &'static str {
    match report {
        MigrationReport::NothingToMigrate | MigrationReport::NothingToRollback => "warning",
        _ if report.has_failures() => "danger",
        _ => "success",
    }
}

pub struct StatusRow {
    pub migration: String,
    pub state: String,
    pub class: &'static str,
    pub batch: String,
}

impl From<&MigrationStatus> for StatusRow {
    fn from(status: &MigrationStatus) -> Self {
        Self {
            migration: status.migration.clone(),
            state: status.state.to_string(),
            class: match status.state {
                MigrationState::Migrated => "success",
                _ => "warning",
            },
            batch: status
                .batch
                .map_or_else(|| "-".to_string(), |batch| batch.to_string()),
        }
    }
}

/// Migration status table (GET /admin/migrations/status).
#[derive(Template)]
#[template(path = "fragments/migration_status.html")]
pub struct MigrationStatusFragment {
    pub rows: Vec<StatusRow>,
}

impl MigrationStatusFragment {
    pub fn new(statuses: &[MigrationStatus]) -> Self {
        Self {
            rows: statuses.iter().map(StatusRow::from).collect(),
        }
    }
}

/// Served while `maintenance_mode` is on and the theme has no `errors.503`.
#[derive(Template)]
#[template(path = "fragments/maintenance.html")]
pub struct MaintenancePage<'a> {
    pub site_name: &'a str,
}

/// Error page used when the theme cannot render its own.
#[derive(Template)]
#[template(path = "fragments/error.html")]
pub struct ErrorPage<'a> {
    pub status: u16,
    pub title: &'a str,
    pub message: &'a str,
    pub details: Option<String>,
}
