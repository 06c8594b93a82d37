//! Template-name resolution and the helpers exposed to templates.
//!
//! The shell performs the filesystem checks; this module decides which
//! relative paths are candidates for a given template name.

mod error;
mod escape;
mod resolve;
mod rules;

pub use error::ViewError;
pub use escape::escape_html;
pub use resolve::{
    admin_candidates, layout_path, partial_path, sanitize_name, theme_candidates,
    TEMPLATE_EXTENSION,
};
pub use rules::{is_public_config_key, join_url, uri_is};
