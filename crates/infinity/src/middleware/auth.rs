use async_trait::async_trait;

use crate::error::AppError;
use crate::http::{response, Request};
use crate::router::{Middleware, Next};
use crate::state::AppState;

/// Requires a logged-in user; visitors are sent to the login page.
pub struct AuthMiddleware;

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(&self, state: &AppState, req: &mut Request) -> Result<Next, AppError> {
        if req.session().is_logged_in() {
            Ok(Next::Continue)
        } else {
            Ok(Next::Halt(response::redirect(&state.view.url("/login"))))
        }
    }
}
