//! Cookie-identified, in-memory sessions.
//!
//! A [`Session`] is a handle to shared data; every clone sees the same
//! values, so middleware, handlers and template contexts of one request can
//! all read and write it. The store keeps sessions until their lifetime
//! elapses without a request.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use infinity_core::content::SessionUser;

/// Pending-migration count cached in the session by the admin middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationCheck {
    pub pending: usize,
    pub checked_at: DateTime<Utc>,
}

impl MigrationCheck {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.checked_at <= ttl
    }
}

#[derive(Debug, Default)]
struct SessionData {
    user: Option<SessionUser>,
    flash: HashMap<String, Value>,
    old_input: Map<String, Value>,
    csrf_token: Option<String>,
    migration_check: Option<MigrationCheck>,
}

impl SessionData {
    fn is_empty(&self) -> bool {
        self.user.is_none()
            && self.flash.is_empty()
            && self.old_input.is_empty()
            && self.csrf_token.is_none()
            && self.migration_check.is_none()
    }
}

fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect()
}

fn generate_session_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Handle to one visitor's session data.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    is_new: bool,
    data: Arc<Mutex<SessionData>>,
}

impl Session {
    fn new(id: String, is_new: bool, data: Arc<Mutex<SessionData>>) -> Self {
        Self { id, is_new, data }
    }

    /// A session that is not backed by any store. Used by the CLI and tests.
    pub fn detached() -> Self {
        Self::new(generate_session_id(), true, Arc::default())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    fn data(&self) -> MutexGuard<'_, SessionData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.data().user.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.data().user.is_some()
    }

    pub fn login(&self, user: SessionUser) {
        let mut data = self.data();
        data.user = Some(user);
        data.old_input.clear();
        // Rotated on login.
        data.csrf_token = Some(random_token());
    }

    /// Resets the session to empty.
    pub fn clear(&self) {
        *self.data() = SessionData::default();
    }

    /// Stores a one-time message for the next rendered page.
    pub fn flash(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.data().flash.insert(key.into(), value.into());
    }

    /// Reads a flash message and removes it.
    pub fn take_flash(&self, key: &str) -> Option<Value> {
        self.data().flash.remove(key)
    }

    pub fn has_flash(&self, key: &str) -> bool {
        self.data().flash.contains_key(key)
    }

    /// Remembers submitted form input so a redirected form can be refilled.
    pub fn set_old_input(&self, input: Map<String, Value>) {
        self.data().old_input = input;
    }

    /// Returns and clears the remembered form input.
    pub fn take_old_input(&self) -> Map<String, Value> {
        std::mem::take(&mut self.data().old_input)
    }

    /// The session's CSRF token, generated on first use.
    pub fn csrf_token(&self) -> String {
        self.data()
            .csrf_token
            .get_or_insert_with(random_token)
            .clone()
    }

    /// Compares a submitted token against the session token.
    pub fn verify_csrf(&self, submitted: &str) -> bool {
        match self.data().csrf_token.as_deref() {
            Some(token) => !submitted.is_empty() && token == submitted,
            None => false,
        }
    }

    pub fn migration_check(&self) -> Option<MigrationCheck> {
        self.data().migration_check
    }

    pub fn set_migration_check(&self, check: MigrationCheck) {
        self.data().migration_check = Some(check);
    }

    pub fn clear_migration_check(&self) {
        self.data().migration_check = None;
    }

    fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}

#[derive(Debug)]
struct StoredSession {
    data: Arc<Mutex<SessionData>>,
    expires_at: DateTime<Utc>,
}

/// In-memory session store.
///
/// Stores sessions in a HashMap wrapped in `Arc<RwLock<_>>`. Data is lost
/// when the process exits.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, StoredSession>>>,
    lifetime: Duration,
}

impl SessionStore {
    pub fn new(lifetime: std::time::Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            lifetime: Duration::from_std(lifetime).unwrap_or_else(|_| Duration::hours(2)),
        }
    }

    /// Resumes the session named by the cookie, or starts a new one.
    pub async fn load(&self, id: Option<&str>) -> Session {
        let now = Utc::now();
        if let Some(id) = id {
            let sessions = self.sessions.read().await;
            if let Some(stored) = sessions.get(id).filter(|s| s.expires_at > now) {
                return Session::new(id.to_string(), false, stored.data.clone());
            }
        }
        Session::new(generate_session_id(), true, Arc::default())
    }

    /// Persists the session and extends its lifetime. New sessions that
    /// never received any data are not stored.
    ///
    /// Returns whether the visitor needs a session cookie.
    pub async fn save(&self, session: &Session) -> bool {
        if session.is_new() && session.is_empty() {
            return false;
        }

        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, stored| stored.expires_at > now);
        sessions.insert(
            session.id.clone(),
            StoredSession {
                data: session.data.clone(),
                expires_at: now + self.lifetime,
            },
        );
        session.is_new()
    }

    pub async fn destroy(&self, session: &Session) {
        self.sessions.write().await.remove(session.id());
        session.clear();
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
