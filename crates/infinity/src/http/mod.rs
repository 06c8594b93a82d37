//! Request parsing and response helpers shared by middleware and handlers.

mod request;
pub mod response;

pub use request::{normalize_path, Request, METHOD_FIELD};
