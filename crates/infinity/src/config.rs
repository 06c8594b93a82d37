use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Serialize;
use serde_json::Value;

/// Application configuration loaded from environment variables.
///
/// Sections serialize to nested JSON so templates and handlers can read
/// values with dotted keys (`app.name`, `theme.active`) via [`Config::lookup`].
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub app: AppConfig,
    pub theme: ThemeConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub name: String,
    /// Base URL prepended to generated links. Empty means root-relative.
    pub url: String,
    pub env: String,
    pub debug: bool,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemeConfig {
    pub active: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub lifetime_minutes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathsConfig {
    pub themes: PathBuf,
    pub admin_views: PathBuf,
    pub admin_assets: PathBuf,
    pub migrations: PathBuf,
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    /// Defaults with every directory resolved under `root`.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            app: AppConfig {
                name: "Infinity CMS".to_string(),
                url: String::new(),
                env: "production".to_string(),
                debug: false,
                request_timeout_seconds: 10,
            },
            theme: ThemeConfig {
                active: "infinity".to_string(),
            },
            database: DatabaseConfig {
                path: root.join("infinity.db").to_string_lossy().into_owned(),
            },
            session: SessionConfig {
                cookie_name: "infinity_session".to_string(),
                lifetime_minutes: 120,
            },
            paths: PathsConfig {
                themes: root.join("themes"),
                admin_views: root.join("admin/views"),
                admin_assets: root.join("admin/assets"),
                migrations: root.join("database/migrations"),
            },
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `INFINITY_ROOT` - Base directory for themes, admin views and migrations (default: ".")
    /// - `APP_NAME` - Site name (default: "Infinity CMS")
    /// - `APP_URL` - Base URL for generated links (default: "", root-relative)
    /// - `APP_ENV` - Environment name (default: "production")
    /// - `APP_DEBUG` - Show error details on 500 pages (default: false)
    /// - `REQUEST_TIMEOUT_SECONDS` - Per-request timeout (default: 10)
    /// - `THEME` - Active theme directory name (default: "infinity")
    /// - `DATABASE_PATH` - SQLite database path (default: "{root}/infinity.db")
    /// - `SESSION_COOKIE` - Session cookie name (default: "infinity_session")
    /// - `SESSION_LIFETIME` - Session lifetime in minutes (default: 120)
    /// - `THEMES_PATH`, `ADMIN_VIEWS_PATH`, `ADMIN_ASSETS_PATH`, `MIGRATIONS_PATH` - Directory overrides
    pub fn from_env() -> Self {
        let root = var("INFINITY_ROOT").unwrap_or_else(|| ".".to_string());
        let mut config = Self::with_root(root);

        if let Some(name) = var("APP_NAME") {
            config.app.name = name;
        }
        if let Some(url) = var("APP_URL") {
            config.app.url = url.trim_end_matches('/').to_string();
        }
        if let Some(app_env) = var("APP_ENV") {
            config.app.env = app_env;
        }
        if let Some(debug) = var("APP_DEBUG") {
            config.app.debug = parse_flag(&debug);
        }
        if let Some(timeout) = var("REQUEST_TIMEOUT_SECONDS").and_then(|v| v.parse().ok()) {
            config.app.request_timeout_seconds = timeout;
        }
        if let Some(theme) = var("THEME") {
            config.theme.active = theme;
        }
        if let Some(path) = var("DATABASE_PATH") {
            config.database.path = path;
        }
        if let Some(name) = var("SESSION_COOKIE") {
            config.session.cookie_name = name;
        }
        if let Some(minutes) = var("SESSION_LIFETIME").and_then(|v| v.parse().ok()) {
            config.session.lifetime_minutes = minutes;
        }
        if let Some(path) = var("THEMES_PATH") {
            config.paths.themes = path.into();
        }
        if let Some(path) = var("ADMIN_VIEWS_PATH") {
            config.paths.admin_views = path.into();
        }
        if let Some(path) = var("ADMIN_ASSETS_PATH") {
            config.paths.admin_assets = path.into();
        }
        if let Some(path) = var("MIGRATIONS_PATH") {
            config.paths.migrations = path.into();
        }

        config
    }

    /// Reads a value by dotted key, e.g. `app.name` or `session.lifetime_minutes`.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        if key.is_empty() {
            return None;
        }
        let tree = serde_json::to_value(self).ok()?;
        tree.pointer(&format!("/{}", key.replace('.', "/"))).cloned()
    }

    /// Directory of the active theme.
    pub fn theme_dir(&self) -> PathBuf {
        self.paths.themes.join(&self.theme.active)
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session.lifetime_minutes * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.app.request_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
