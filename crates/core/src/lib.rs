//! Functional core for Infinity CMS.
//!
//! Everything in this crate is pure: route patterns and the route table,
//! SQL lowering for the query builder, migration planning, template-name
//! resolution and content rules. The `infinity` crate owns all I/O.

pub mod content;
pub mod migration;
pub mod query;
pub mod routing;
pub mod storage;
pub mod view;
