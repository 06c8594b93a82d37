use thiserror::Error;

/// Errors raised while locating or rendering a template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("Template '{0}' not found")]
    TemplateNotFound(String),
    #[error("Layout '{0}' not found")]
    LayoutNotFound(String),
    #[error("Invalid template path: Path must be within the template directory")]
    InvalidPath,
    #[error("Failed to render template '{name}': {reason}")]
    Render { name: String, reason: String },
}
