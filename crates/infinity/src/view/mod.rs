//! Theme and admin rendering.
//!
//! Theme templates live under `{themes}/{active}`; admin templates under the
//! admin views directory. Both are minijinja templates that receive their
//! data as top-level variables plus a context object (`theme` or `admin`).
//! Compiled-in HTML fragments are askama templates in [`fragments`].

mod admin;
mod context;
mod engine;
pub mod fragments;
mod theme;

use serde_json::{Map, Value as JsonValue};

use crate::session::Session;

pub use admin::{AdminContext, AdminView};
pub use context::ThemeContext;
pub use theme::View;

/// Which layout wraps a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Layout {
    /// The view's default layout, except for HTMX requests which get the
    /// bare page.
    #[default]
    Auto,
    /// The page alone.
    Bare,
    /// A specific layout, even for HTMX requests.
    Named(String),
}

/// The parts of the current request that templates can see.
#[derive(Debug, Clone)]
pub struct RequestScope {
    pub uri: String,
    pub is_htmx: bool,
    pub session: Session,
    /// Values shared by middleware for this request only.
    pub shared: Map<String, JsonValue>,
}

impl RequestScope {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            is_htmx: false,
            session: Session::detached(),
            shared: Map::new(),
        }
    }
}

/// Accepts `json!({...})` page data; anything but an object is empty data.
pub fn page_data(value: JsonValue) -> Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    }
}
