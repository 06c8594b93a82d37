use async_trait::async_trait;

use crate::error::AppError;
use crate::http::{response, Request};
use crate::router::{Middleware, Next};
use crate::state::AppState;

pub const CSRF_FIELD: &str = "_csrf_token";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Rejects state-changing requests that do not carry the session's CSRF
/// token in the `_csrf_token` field or the `X-CSRF-Token` header.
pub struct CsrfMiddleware;

#[async_trait]
impl Middleware for CsrfMiddleware {
    async fn handle(&self, _state: &AppState, req: &mut Request) -> Result<Next, AppError> {
        if req.method().is_safe() {
            return Ok(Next::Continue);
        }

        let submitted = req
            .input_str(CSRF_FIELD)
            .or_else(|| req.header(CSRF_HEADER).map(str::to_string))
            .unwrap_or_default();

        if req.session().verify_csrf(&submitted) {
            Ok(Next::Continue)
        } else {
            tracing::warn!(path = %req.path(), "CSRF token mismatch");
            Ok(Next::Halt(response::forbidden("Invalid CSRF token")))
        }
    }
}
