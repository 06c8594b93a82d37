use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MigrationError {
    #[error("Migration '{name}' is invalid: {reason}")]
    InvalidScript { name: String, reason: String },
    #[error("Migration '{0}' has no down script")]
    IrreversibleMigration(String),
    #[error("Migration '{0}' not found")]
    NotFound(String),
}
