use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;

use crate::error::AppError;
use crate::http::Request;
use crate::state::AppState;

/// What a middleware decided about the request.
pub enum Next {
    /// Hand the request to the next middleware or the handler.
    Continue,
    /// Stop and send this response.
    Halt(Response),
}

/// A named request filter, registered on the [`Router`](super::Router) and
/// referenced from routes and groups by name.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, state: &AppState, req: &mut Request) -> Result<Next, AppError>;
}

pub type BoxMiddleware = Arc<dyn Middleware>;
