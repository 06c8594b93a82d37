use thiserror::Error;

/// Errors raised while registering routes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Invalid route pattern '{uri}': {reason}")]
    InvalidPattern { uri: String, reason: String },
    #[error("Duplicate parameter '{name}' in route '{uri}'")]
    DuplicateParameter { uri: String, name: String },
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}
