//! A thin fluent query builder that lowers to parameterized SQL.
//!
//! Nothing here touches a database. The builder validates identifiers and
//! produces a [`Statement`] (SQL text with `?` placeholders plus its
//! bindings) that the shell hands to the driver.

mod builder;
mod error;
mod ident;
mod value;

pub use builder::{Direction, Op, QueryBuilder, Record, Statement};
pub use error::QueryError;
pub use ident::{validate_column, validate_identifier};
pub use value::SqlValue;
