//! Request dispatch over the core route table.
//!
//! Order: global middleware, route lookup (themed 404 on a miss), route
//! middleware in group order, then the handler. Any middleware may halt
//! with its own response.

mod handler;
mod middleware;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use axum::response::Response;

use infinity_core::routing::{RouteInfo, RouteTable};

use crate::error::AppError;
use crate::http::{response, Request};
use crate::state::AppState;

pub use handler::{handler, BoxHandler, Handler};
pub use middleware::{BoxMiddleware, Middleware, Next};

pub struct Router {
    table: RouteTable<BoxHandler>,
    middleware: HashMap<String, BoxMiddleware>,
}

impl Router {
    pub fn new(table: RouteTable<BoxHandler>) -> Self {
        Self {
            table,
            middleware: HashMap::new(),
        }
    }

    /// Registers middleware under `name`.
    pub fn middleware<M: Middleware + 'static>(mut self, name: &str, middleware: M) -> Self {
        self.middleware.insert(name.to_string(), Arc::new(middleware));
        self
    }

    pub fn routes(&self) -> Vec<RouteInfo> {
        self.table.routes()
    }

    pub async fn dispatch(&self, state: &AppState, mut req: Request) -> Response {
        for name in self.table.global_middleware() {
            if let Some(response) = self.run_middleware(name, state, &mut req).await {
                return response;
            }
        }

        let Some(found) = self.table.find(req.method(), req.path()) else {
            tracing::debug!(method = %req.method(), path = %req.path(), "no route");
            return response::not_found(state, &req.scope(), "Page Not Found");
        };

        tracing::debug!(method = %req.method(), route = %found.uri, "dispatch");
        req.set_params(found.params);

        for name in found.middleware {
            if let Some(response) = self.run_middleware(name, state, &mut req).await {
                return response;
            }
        }

        let scope = req.scope();
        match found.action.call(state.clone(), req).await {
            Ok(response) => response,
            Err(err) => response::error_response(state, &scope, err),
        }
    }

    /// Runs one middleware; `Some` means the request stops here.
    async fn run_middleware(
        &self,
        name: &str,
        state: &AppState,
        req: &mut Request,
    ) -> Option<Response> {
        let result = match self.middleware.get(name) {
            Some(middleware) => middleware.handle(state, req).await,
            None => Err(AppError(anyhow!("Middleware {name} not found"))),
        };

        match result {
            Ok(Next::Continue) => None,
            Ok(Next::Halt(response)) => Some(response),
            Err(err) => Some(response::error_response(state, &req.scope(), err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{body::to_bytes, http::StatusCode, http::HeaderMap};
    use infinity_core::routing::Group;

    use crate::error::HttpError;
    use crate::session::Session;
    use crate::state::testing::test_state;

    fn request(method: &str, uri: &str) -> Request {
        Request::new(
            &method.parse().unwrap(),
            &uri.parse().unwrap(),
            HeaderMap::new(),
            b"",
            Session::detached(),
        )
        .unwrap()
    }

    async fn body(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn echo(_state: AppState, req: Request) -> Result<Response, AppError> {
        let shared = req
            .shared()
            .get("trail")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        Ok(response::html(format!(
            "{} {} [{}]",
            req.method(),
            req.param("slug").unwrap_or("-"),
            shared
        )))
    }

    async fn failing(_state: AppState, _req: Request) -> Result<Response, AppError> {
        Err(HttpError::NotFound("Post not found".to_string()).into())
    }

    struct Trail(&'static str);

    #[async_trait]
    impl Middleware for Trail {
        async fn handle(&self, _state: &AppState, req: &mut Request) -> Result<Next, AppError> {
            let trail = req
                .shared()
                .get("trail")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            req.share("trail", format!("{trail}{}", self.0));
            Ok(Next::Continue)
        }
    }

    struct Block;

    #[async_trait]
    impl Middleware for Block {
        async fn handle(&self, _state: &AppState, _req: &mut Request) -> Result<Next, AppError> {
            Ok(Next::Halt(response::forbidden("blocked")))
        }
    }

    fn router() -> Router {
        let mut table = RouteTable::new();
        table.add_global_middleware("g");
        table.get("/post/{slug}", handler(echo)).unwrap();
        table.get("/missing", handler(failing)).unwrap();
        table
            .group(Group::new().prefix("/admin").middleware("a"), |t| {
                t.group(Group::new().middleware("b"), |t| t.get("/x", handler(echo)))?;
                t.get("/blocked", handler(echo))
            })
            .unwrap();
        table
            .group(Group::new().middleware("block"), |t| t.delete("/admin/blocked", handler(echo)))
            .unwrap();
        table
            .group(Group::new().middleware("nope"), |t| t.get("/nope", handler(echo)))
            .unwrap();

        Router::new(table)
            .middleware("g", Trail("g"))
            .middleware("a", Trail("a"))
            .middleware("b", Trail("b"))
            .middleware("block", Block)
    }

    #[tokio::test]
    async fn test_dispatch_runs_middleware_in_order() {
        let state = test_state().await;
        let router = router();

        let response = router.dispatch(&state, request("GET", "/admin/x")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, "GET - [gab]");

        let response = router.dispatch(&state, request("GET", "/post/hello%20world")).await;
        assert_eq!(body(response).await, "GET hello world [g]");
    }

    #[tokio::test]
    async fn test_middleware_can_halt() {
        let state = test_state().await;
        let response = router().dispatch(&state, request("DELETE", "/admin/blocked")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body(response).await, "blocked");
    }

    #[tokio::test]
    async fn test_unknown_middleware_is_server_error() {
        let state = test_state().await;
        let response = router().dispatch(&state, request("GET", "/nope")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_no_route_and_handler_errors_are_themed_404s() {
        let state = test_state().await;
        let router = router();

        let response = router.dispatch(&state, request("GET", "/nowhere")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body(response).await.contains("Page Not Found"));

        // Method mismatch is a miss too.
        let response = router.dispatch(&state, request("POST", "/post/hello")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router.dispatch(&state, request("GET", "/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body(response).await.contains("Post not found"));
    }
}
