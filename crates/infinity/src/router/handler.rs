use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use axum::response::Response;

use crate::error::AppError;
use crate::http::Request;
use crate::state::AppState;

/// A route action.
///
/// Any `async fn(AppState, Request) -> Result<Response, AppError>` is a
/// handler.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, state: AppState, req: Request) -> Result<Response, AppError>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(AppState, Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
{
    async fn call(&self, state: AppState, req: Request) -> Result<Response, AppError> {
        (self)(state, req).await
    }
}

pub type BoxHandler = Arc<dyn Handler>;

/// Boxes a handler for the route table.
pub fn handler<H: Handler + 'static>(handler: H) -> BoxHandler {
    Arc::new(handler)
}
