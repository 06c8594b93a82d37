use std::fmt;

use serde::{Deserialize, Serialize};

/// A row of the migrations tracking table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedMigration {
    pub id: i64,
    pub migration: String,
    pub batch: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MigrationState {
    Migrated,
    Pending,
    /// Recorded as executed but the file is gone.
    Missing,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MigrationState::Migrated => "Migrated",
            MigrationState::Pending => "Pending",
            MigrationState::Missing => "Missing",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub migration: String,
    pub state: MigrationState,
    pub batch: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MigrationAction {
    Migrated,
    RolledBack,
}

/// What happened to one migration during a run or rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    pub migration: String,
    pub action: MigrationAction,
    pub error: Option<String>,
}

impl MigrationOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, self.action) {
            (None, MigrationAction::Migrated) => write!(f, "✓ Migrated: {}", self.migration),
            (None, MigrationAction::RolledBack) => write!(f, "✓ Rolled back: {}", self.migration),
            (Some(error), _) => write!(f, "✗ Failed: {} - {error}", self.migration),
        }
    }
}

/// Result of a migrate, rollback or reset command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MigrationReport {
    NothingToMigrate,
    NothingToRollback,
    Outcomes(Vec<MigrationOutcome>),
}

impl MigrationReport {
    /// Human-readable lines, one per migration.
    pub fn lines(&self) -> Vec<String> {
        match self {
            MigrationReport::NothingToMigrate => vec!["No pending migrations".to_string()],
            MigrationReport::NothingToRollback => vec!["Nothing to rollback".to_string()],
            MigrationReport::Outcomes(outcomes) => outcomes.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn outcomes(&self) -> &[MigrationOutcome] {
        match self {
            MigrationReport::Outcomes(outcomes) => outcomes,
            _ => &[],
        }
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes().iter().any(|o| !o.succeeded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_lines() {
        let report = MigrationReport::Outcomes(vec![
            MigrationOutcome {
                migration: "001_create_posts_table".to_string(),
                action: MigrationAction::Migrated,
                error: None,
            },
            MigrationOutcome {
                migration: "002_create_users_table".to_string(),
                action: MigrationAction::RolledBack,
                error: None,
            },
            MigrationOutcome {
                migration: "003_broken".to_string(),
                action: MigrationAction::Migrated,
                error: Some("near \"TABEL\": syntax error".to_string()),
            },
        ]);

        assert_eq!(
            report.lines(),
            vec![
                "✓ Migrated: 001_create_posts_table",
                "✓ Rolled back: 002_create_users_table",
                "✗ Failed: 003_broken - near \"TABEL\": syntax error",
            ]
        );
        assert!(report.has_failures());
    }

    #[test]
    fn test_empty_reports() {
        assert_eq!(MigrationReport::NothingToMigrate.lines(), vec!["No pending migrations"]);
        assert_eq!(MigrationReport::NothingToRollback.lines(), vec!["Nothing to rollback"]);
        assert!(!MigrationReport::NothingToRollback.has_failures());
    }
}
