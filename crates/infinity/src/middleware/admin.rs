use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::error::AppError;
use crate::http::{response, Request};
use crate::router::{Middleware, Next};
use crate::session::MigrationCheck;
use crate::state::AppState;

/// How long the pending-migration count stays cached in the session.
pub const MIGRATION_CHECK_TTL_SECONDS: i64 = 300;

/// Guards the back-office.
///
/// Anonymous AJAX calls get a `401` JSON body, other anonymous requests are
/// redirected to `/login`. Logged-in requests get `hasPendingMigrations`
/// and `pendingMigrationsCount` shared with their templates.
pub struct AdminMiddleware;

#[async_trait]
impl Middleware for AdminMiddleware {
    async fn handle(&self, state: &AppState, req: &mut Request) -> Result<Next, AppError> {
        if !req.session().is_logged_in() {
            if req.is_ajax() {
                return Ok(Next::Halt(response::unauthorized_json()));
            }
            return Ok(Next::Halt(response::redirect(&state.view.url("/login"))));
        }

        let pending = pending_migrations(state, req).await;
        req.share("hasPendingMigrations", pending > 0);
        req.share("pendingMigrationsCount", pending);
        Ok(Next::Continue)
    }
}

async fn pending_migrations(state: &AppState, req: &Request) -> usize {
    let now = Utc::now();
    let ttl = Duration::seconds(MIGRATION_CHECK_TTL_SECONDS);
    if let Some(check) = req.session().migration_check() {
        if check.is_fresh(now, ttl) {
            return check.pending;
        }
    }

    // Errors count as nothing pending.
    let pending = match state.migrator.pending().await {
        Ok(pending) => pending.len(),
        Err(err) => {
            tracing::warn!(error = %err, "pending migration check failed");
            0
        }
    };
    req.session().set_migration_check(MigrationCheck {
        pending,
        checked_at: now,
    });
    pending
}
