//! Named middleware referenced from the route table.

mod admin;
mod auth;
mod csrf;
mod maintenance;

pub use admin::{AdminMiddleware, MIGRATION_CHECK_TTL_SECONDS};
pub use auth::AuthMiddleware;
pub use csrf::{CsrfMiddleware, CSRF_FIELD, CSRF_HEADER};
pub use maintenance::{MaintenanceMiddleware, MAINTENANCE_SETTING};

#[cfg(test)]
mod tests {
    use axum::http::{header, HeaderMap, StatusCode};
    use chrono::Utc;
    use infinity_core::query::Record;
    use serde_json::Value;

    use super::*;
    use crate::error::AppError;
    use crate::http::Request;
    use crate::router::{Middleware, Next};
    use crate::session::{MigrationCheck, Session};
    use crate::state::testing::{admin_session, test_state};

    fn request(method: &str, uri: &str, headers: HeaderMap, body: &str, session: Session) -> Request {
        Request::new(
            &method.parse().unwrap(),
            &uri.parse().unwrap(),
            headers,
            body.as_bytes(),
            session,
        )
        .unwrap()
    }

    fn form_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded".parse().unwrap(),
        );
        headers
    }

    fn halted_status(result: Result<Next, AppError>) -> Option<StatusCode> {
        match result.unwrap() {
            Next::Continue => None,
            Next::Halt(response) => Some(response.status()),
        }
    }

    #[tokio::test]
    async fn test_admin_redirects_anonymous_visitors() {
        let state = test_state().await;
        let mut req = request("GET", "/admin/dashboard", HeaderMap::new(), "", Session::detached());

        let Next::Halt(response) = AdminMiddleware.handle(&state, &mut req).await.unwrap() else {
            panic!("anonymous request passed");
        };
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_admin_rejects_anonymous_ajax_with_401() {
        let state = test_state().await;
        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", "XMLHttpRequest".parse().unwrap());
        let mut req = request("GET", "/admin/stats", headers, "", Session::detached());

        let status = halted_status(AdminMiddleware.handle(&state, &mut req).await);
        assert_eq!(status, Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_admin_shares_pending_migrations() {
        let state = test_state().await;
        let session = admin_session(&state).await;

        let mut req = request("GET", "/admin/dashboard", HeaderMap::new(), "", session.clone());
        assert_eq!(halted_status(AdminMiddleware.handle(&state, &mut req).await), None);
        assert_eq!(req.shared().get("hasPendingMigrations"), Some(&Value::Bool(false)));
        assert_eq!(req.shared().get("pendingMigrationsCount"), Some(&Value::from(0)));

        // A fresh cached count is used without hitting the database.
        session.set_migration_check(MigrationCheck {
            pending: 2,
            checked_at: Utc::now(),
        });
        let mut req = request("GET", "/admin/dashboard", HeaderMap::new(), "", session.clone());
        AdminMiddleware.handle(&state, &mut req).await.unwrap();
        assert_eq!(req.shared().get("hasPendingMigrations"), Some(&Value::Bool(true)));
        assert_eq!(req.shared().get("pendingMigrationsCount"), Some(&Value::from(2)));

        // A stale one is refreshed.
        session.set_migration_check(MigrationCheck {
            pending: 2,
            checked_at: Utc::now() - chrono::Duration::seconds(MIGRATION_CHECK_TTL_SECONDS + 1),
        });
        let mut req = request("GET", "/admin/dashboard", HeaderMap::new(), "", session.clone());
        AdminMiddleware.handle(&state, &mut req).await.unwrap();
        assert_eq!(req.shared().get("pendingMigrationsCount"), Some(&Value::from(0)));
    }

    #[tokio::test]
    async fn test_auth_requires_login() {
        let state = test_state().await;
        let mut req = request("GET", "/account", HeaderMap::new(), "", Session::detached());
        assert_eq!(
            halted_status(AuthMiddleware.handle(&state, &mut req).await),
            Some(StatusCode::FOUND)
        );

        let session = admin_session(&state).await;
        let mut req = request("GET", "/account", HeaderMap::new(), "", session);
        assert_eq!(halted_status(AuthMiddleware.handle(&state, &mut req).await), None);
    }

    #[tokio::test]
    async fn test_csrf_checks_field_and_header() {
        let state = test_state().await;
        let session = Session::detached();
        let token = session.csrf_token();

        let mut req = request("GET", "/contact", HeaderMap::new(), "", session.clone());
        assert_eq!(halted_status(CsrfMiddleware.handle(&state, &mut req).await), None);

        let mut req = request("POST", "/contact", form_headers(), "name=x", session.clone());
        assert_eq!(
            halted_status(CsrfMiddleware.handle(&state, &mut req).await),
            Some(StatusCode::FORBIDDEN)
        );

        let body = format!("{CSRF_FIELD}={token}");
        let mut req = request("POST", "/contact", form_headers(), &body, session.clone());
        assert_eq!(halted_status(CsrfMiddleware.handle(&state, &mut req).await), None);

        let mut headers = HeaderMap::new();
        headers.insert(CSRF_HEADER, token.parse().unwrap());
        let mut req = request("DELETE", "/admin/posts/1", headers, "", session);
        assert_eq!(halted_status(CsrfMiddleware.handle(&state, &mut req).await), None);
    }

    #[tokio::test]
    async fn test_maintenance_mode() {
        let state = test_state().await;

        let mut req = request("GET", "/", HeaderMap::new(), "", Session::detached());
        assert_eq!(halted_status(MaintenanceMiddleware.handle(&state, &mut req).await), None);

        state
            .db
            .table("settings")
            .where_eq("setting_key", MAINTENANCE_SETTING)
            .update(&Record::new().set("setting_value", "1"))
            .await
            .unwrap();

        let mut req = request("GET", "/blog", HeaderMap::new(), "", Session::detached());
        assert_eq!(
            halted_status(MaintenanceMiddleware.handle(&state, &mut req).await),
            Some(StatusCode::SERVICE_UNAVAILABLE)
        );

        for open in ["/login", "/admin", "/admin/settings"] {
            let mut req = request("GET", open, HeaderMap::new(), "", Session::detached());
            assert_eq!(
                halted_status(MaintenanceMiddleware.handle(&state, &mut req).await),
                None,
                "{open} should stay reachable"
            );
        }

        for closed in ["/administrator", "/admin-foo", "/loginx"] {
            let mut req = request("GET", closed, HeaderMap::new(), "", Session::detached());
            assert_eq!(
                halted_status(MaintenanceMiddleware.handle(&state, &mut req).await),
                Some(StatusCode::SERVICE_UNAVAILABLE),
                "{closed} should be blocked"
            );
        }

        let session = admin_session(&state).await;
        let mut req = request("GET", "/blog", HeaderMap::new(), "", session);
        assert_eq!(halted_status(MaintenanceMiddleware.handle(&state, &mut req).await), None);
    }
}
