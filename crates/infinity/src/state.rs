//! Shared application state passed to every middleware and handler.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::db::Database;
use crate::migration::Migrator;
use crate::router::Router;
use crate::routes;
use crate::session::SessionStore;
use crate::view::{AdminView, View};

/// Cloned for each request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub sessions: SessionStore,
    /// Active theme.
    pub view: View,
    /// Back-office templates.
    pub admin_view: AdminView,
    pub migrator: Migrator,
    pub router: Arc<Router>,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let config = Arc::new(config);
        let router = routes::router().context("Failed to register routes")?;

        Ok(Self {
            sessions: SessionStore::new(config.session_lifetime()),
            view: View::new(config.clone()),
            admin_view: AdminView::new(config.clone()),
            migrator: Migrator::new(db.clone(), config.paths.migrations.clone()),
            router: Arc::new(router),
            db,
            config,
        })
    }

    /// Opens the configured database file and builds the state.
    pub async fn open(config: Config) -> Result<Self> {
        let db = Database::open(&config.database.path)
            .await
            .with_context(|| format!("Failed to open database {}", config.database.path))?;
        Self::new(config, db)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::PathBuf;

    use infinity_core::content::SessionUser;
    use infinity_core::query::Record;

    use super::*;
    use crate::password::hash_password;
    use crate::session::Session;

    pub const ADMIN_USERNAME: &str = "admin";
    pub const ADMIN_PASSWORD: &str = "secret-password";

    /// The repository root, which ships the default theme, admin views and
    /// migrations.
    pub fn workspace_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    pub fn test_config() -> Config {
        Config::with_root(workspace_root())
    }

    /// Fully migrated in-memory state using the bundled theme.
    pub async fn test_state() -> AppState {
        state_with(test_config()).await
    }

    pub async fn state_with(config: Config) -> AppState {
        let db = Database::open_in_memory().await.unwrap();
        let state = AppState::new(config, db).unwrap();
        let report = state.migrator.run().await.unwrap();
        assert!(!report.has_failures(), "{:?}", report.lines());
        state
    }

    /// Inserts the admin user and returns it as a session user.
    pub async fn create_admin(state: &AppState) -> SessionUser {
        let id = state
            .db
            .table("users")
            .insert(
                &Record::new()
                    .set("username", ADMIN_USERNAME)
                    .set("email", "admin@example.com")
                    .set("password", hash_password(ADMIN_PASSWORD).unwrap())
                    .set("role", "admin"),
            )
            .await
            .unwrap();

        SessionUser {
            id,
            username: ADMIN_USERNAME.to_string(),
            email: "admin@example.com".to_string(),
            role: "admin".to_string(),
        }
    }

    /// A stored session with the admin logged in.
    pub async fn admin_session(state: &AppState) -> Session {
        let user = create_admin(state).await;
        let session = state.sessions.load(None).await;
        session.login(user);
        state.sessions.save(&session).await;
        session
    }
}
