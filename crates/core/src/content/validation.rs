use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::PostStatus;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("email regex is valid")
});

/// One or more human-readable messages describing rejected input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.join(", "))]
pub struct ValidationError(pub Vec<String>);

impl ValidationError {
    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

fn finish(errors: Vec<String>) -> Result<(), ValidationError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError(errors))
    }
}

/// Fields submitted by the admin post form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub status: Option<String>,
}

impl PostInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        if blank(&self.title) {
            errors.push("Title is required".to_string());
        }
        if blank(&self.content) {
            errors.push("Content is required".to_string());
        }
        if let Some(status) = self.status.as_deref().filter(|s| !s.trim().is_empty()) {
            if status.parse::<PostStatus>().is_err() {
                errors.push("Status must be draft or published".to_string());
            }
        }
        finish(errors)
    }

    /// Status to store, defaulting to draft.
    pub fn status(&self) -> PostStatus {
        self.status
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn excerpt(&self) -> Option<&str> {
        self.excerpt.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Fields submitted by the public contact form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

impl ContactInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        if blank(&self.name) {
            errors.push("Name is required".to_string());
        }
        let email = self.email.as_deref().map(str::trim).unwrap_or("");
        if !EMAIL.is_match(email) {
            errors.push("Valid email is required".to_string());
        }
        if blank(&self.message) {
            errors.push("Message is required".to_string());
        }
        finish(errors)
    }
}

/// Fields submitted by the admin settings form. The key is only required
/// when creating a setting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingInput {
    pub setting_key: Option<String>,
    pub setting_value: Option<String>,
    pub description: Option<String>,
}

impl SettingInput {
    pub fn validate_create(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        if blank(&self.setting_key) {
            errors.push("Setting key is required".to_string());
        }
        if self.setting_value.is_none() {
            errors.push("Setting value is required".to_string());
        }
        finish(errors)
    }

    pub fn validate_update(&self) -> Result<(), ValidationError> {
        if self.setting_value.is_none() {
            return Err(ValidationError(vec!["Setting value is required".to_string()]));
        }
        Ok(())
    }
}
