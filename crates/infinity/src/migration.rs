//! Applies and rolls back the SQL migrations in the migrations directory.
//!
//! Planning (what is pending, which batch to roll back) lives in
//! `infinity_core::migration`; this module reads the files and talks to the
//! database.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::params;

use infinity_core::migration::{
    self, ExecutedMigration, MigrationAction, MigrationError, MigrationOutcome, MigrationReport,
    MigrationScript, MigrationStatus,
};
use infinity_core::query::Direction;

use crate::db::Database;

const TRACKING_TABLE: &str = "CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    migration TEXT NOT NULL UNIQUE,
    batch INTEGER NOT NULL,
    executed_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

#[derive(Clone)]
pub struct Migrator {
    db: Database,
    dir: PathBuf,
}

impl Migrator {
    pub fn new(db: Database, dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn ensure_table(&self) -> Result<()> {
        self.db
            .execute_batch(TRACKING_TABLE)
            .await
            .context("Failed to create migrations table")
    }

    /// Migration names found on disk, sorted. A missing directory has none.
    pub async fn discover(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(dir = %self.dir.display(), "migrations directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.dir.display()))
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            if let Some(name) = file_name.to_str().and_then(migration::migration_name) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn load(&self, name: &str) -> Result<MigrationScript> {
        let path = self.dir.join(format!("{name}.sql"));
        let source = match tokio::fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MigrationError::NotFound(name.to_string()).into())
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };
        Ok(MigrationScript::parse(name, &source)?)
    }

    /// Rows of the tracking table, oldest first.
    pub async fn executed(&self) -> Result<Vec<ExecutedMigration>> {
        self.ensure_table().await?;
        Ok(self
            .db
            .table("migrations")
            .select(["id", "migration", "batch"])
            .order_by("id", Direction::Asc)
            .get_as()
            .await?)
    }

    pub async fn pending(&self) -> Result<Vec<String>> {
        let discovered = self.discover().await?;
        let executed = self.executed().await?;
        Ok(migration::pending(&discovered, &executed))
    }

    pub async fn has_pending(&self) -> Result<bool> {
        Ok(!self.pending().await?.is_empty())
    }

    pub async fn status(&self) -> Result<Vec<MigrationStatus>> {
        let discovered = self.discover().await?;
        let executed = self.executed().await?;
        Ok(migration::status(&discovered, &executed))
    }

    /// Applies every pending migration as one new batch.
    pub async fn run(&self) -> Result<MigrationReport> {
        let executed = self.executed().await?;
        let pending = migration::pending(&self.discover().await?, &executed);
        if pending.is_empty() {
            return Ok(MigrationReport::NothingToMigrate);
        }

        let batch = migration::next_batch(&executed);
        let mut outcomes = Vec::with_capacity(pending.len());
        for name in pending {
            let error = self.apply(&name, batch).await.err().map(|e| format!("{e:#}"));
            match &error {
                None => tracing::info!(migration = %name, batch, "migrated"),
                Some(error) => tracing::error!(migration = %name, %error, "migration failed"),
            }
            outcomes.push(MigrationOutcome {
                migration: name,
                action: MigrationAction::Migrated,
                error,
            });
        }
        Ok(MigrationReport::Outcomes(outcomes))
    }

    async fn apply(&self, name: &str, batch: i64) -> Result<()> {
        let script = self.load(name).await?;
        let name = name.to_string();
        let executed_at = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.db
            .transaction(move |tx| {
                tx.execute_batch(&script.up)?;
                tx.execute(
                    "INSERT INTO migrations (migration, batch, executed_at) VALUES (?1, ?2, ?3)",
                    params![name, batch, executed_at],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Reverts the most recent batch, newest migration first.
    pub async fn rollback(&self) -> Result<MigrationReport> {
        let executed = self.executed().await?;
        let batch = migration::rollback_order(&executed);
        if batch.is_empty() {
            return Ok(MigrationReport::NothingToRollback);
        }

        let mut outcomes = Vec::with_capacity(batch.len());
        for row in batch {
            let error = self.revert(&row).await.err().map(|e| format!("{e:#}"));
            match &error {
                None => tracing::info!(migration = %row.migration, "rolled back"),
                Some(error) => tracing::error!(migration = %row.migration, %error, "rollback failed"),
            }
            outcomes.push(MigrationOutcome {
                migration: row.migration,
                action: MigrationAction::RolledBack,
                error,
            });
        }
        Ok(MigrationReport::Outcomes(outcomes))
    }

    async fn revert(&self, row: &ExecutedMigration) -> Result<()> {
        let script = self.load(&row.migration).await?;
        let down = script
            .down
            .ok_or_else(|| MigrationError::IrreversibleMigration(row.migration.clone()))?;
        let id = row.id;
        self.db
            .transaction(move |tx| {
                tx.execute_batch(&down)?;
                tx.execute("DELETE FROM migrations WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Rolls back batch after batch until none is left, stopping early when
    /// a pass cannot remove anything.
    pub async fn reset(&self) -> Result<MigrationReport> {
        let mut outcomes: Vec<MigrationOutcome> = Vec::new();
        loop {
            let before = self.executed().await?.len();
            if before == 0 {
                break;
            }

            let report = self.rollback().await?;
            if self.executed().await?.len() < before {
                outcomes.extend(report.outcomes().iter().cloned());
                continue;
            }

            // A stalled pass retried rows an earlier pass already reported.
            let fresh: Vec<MigrationOutcome> = report
                .outcomes()
                .iter()
                .filter(|o| !outcomes.iter().any(|seen| seen.migration == o.migration))
                .cloned()
                .collect();
            outcomes.extend(fresh);
            tracing::warn!("reset stopped: last batch could not be rolled back");
            break;
        }

        if outcomes.is_empty() {
            Ok(MigrationReport::NothingToRollback)
        } else {
            Ok(MigrationReport::Outcomes(outcomes))
        }
    }
}
