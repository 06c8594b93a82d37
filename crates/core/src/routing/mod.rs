//! Route patterns and the linear route table.
//!
//! Patterns such as `/post/{slug}` compile to anchored regular expressions.
//! Lookup walks the routes of a method in registration order and the first
//! match wins.

mod error;
mod method;
mod pattern;
mod table;

pub use error::RouteError;
pub use method::Method;
pub use pattern::{normalize_uri, RoutePattern};
pub use table::{Group, RouteInfo, RouteMatch, RouteTable};
