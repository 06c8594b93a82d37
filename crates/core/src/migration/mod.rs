//! Migration planning.
//!
//! Migrations are SQL files named so that lexicographic order is execution
//! order. Executed migrations are tracked with a batch number; a rollback
//! undoes the most recent batch.

mod error;
mod plan;
mod script;
mod types;

pub use error::MigrationError;
pub use plan::{last_batch, migration_name, next_batch, pending, rollback_order, status};
pub use script::MigrationScript;
pub use types::{
    ExecutedMigration, MigrationAction, MigrationOutcome, MigrationReport, MigrationState,
    MigrationStatus,
};
