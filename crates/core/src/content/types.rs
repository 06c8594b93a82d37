use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Publication state of posts and pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// A blog post row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }
}

/// A CMS page row. `template` names the theme template used to render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
}

impl Page {
    pub const DEFAULT_TEMPLATE: &'static str = "page";

    /// Template to render, ignoring the `default` placeholder the pages
    /// table ships with.
    pub fn template_name(&self) -> &str {
        match self.template.as_deref().map(str::trim) {
            Some("") | Some("default") | None => Self::DEFAULT_TEMPLATE,
            Some(template) => template,
        }
    }
}

/// A key/value row of the settings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub id: i64,
    pub setting_key: String,
    #[serde(default)]
    pub setting_value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Setting {
    pub fn is_enabled(&self) -> bool {
        self.setting_value.as_deref().map(str::trim) == Some("1")
    }
}

/// A users row, including the password hash. Never rendered directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// The user stored in the session after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone().unwrap_or_else(|| "user".to_string()),
        }
    }
}

/// Post counts shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PostStats {
    pub total: i64,
    pub published: i64,
    pub drafts: i64,
}

impl PostStats {
    pub fn new(total: i64, published: i64) -> Self {
        Self {
            total,
            published,
            drafts: (total - published).max(0),
        }
    }
}
