//! Content types stored by the CMS and the rules applied to user input.

mod slug;
mod types;
mod validation;

pub use slug::{numbered_slug, slugify};
pub use types::{Page, Post, PostStats, PostStatus, SessionUser, Setting, User};
pub use validation::{ContactInput, PostInput, SettingInput, ValidationError};
