use std::collections::{HashMap, HashSet};

use super::{ExecutedMigration, MigrationState, MigrationStatus};

/// Returns the migration name for a `*.sql` file name.
pub fn migration_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(".sql")
        .filter(|stem| !stem.is_empty() && !stem.starts_with('.'))
}

/// Discovered migrations that have not been executed, in execution order.
pub fn pending(discovered: &[String], executed: &[ExecutedMigration]) -> Vec<String> {
    let done: HashSet<&str> = executed.iter().map(|m| m.migration.as_str()).collect();
    let mut pending: Vec<String> = discovered
        .iter()
        .filter(|name| !done.contains(name.as_str()))
        .cloned()
        .collect();
    pending.sort();
    pending.dedup();
    pending
}

pub fn last_batch(executed: &[ExecutedMigration]) -> Option<i64> {
    executed.iter().map(|m| m.batch).max()
}

pub fn next_batch(executed: &[ExecutedMigration]) -> i64 {
    last_batch(executed).unwrap_or(0) + 1
}

/// Migrations of the most recent batch, newest first.
pub fn rollback_order(executed: &[ExecutedMigration]) -> Vec<ExecutedMigration> {
    let Some(batch) = last_batch(executed) else {
        return Vec::new();
    };

    let mut rows: Vec<ExecutedMigration> = executed
        .iter()
        .filter(|m| m.batch == batch)
        .cloned()
        .collect();
    rows.sort_by(|a, b| b.id.cmp(&a.id));
    rows
}

/// Status of every discovered migration, followed by executed migrations
/// whose files are missing.
pub fn status(discovered: &[String], executed: &[ExecutedMigration]) -> Vec<MigrationStatus> {
    let batches: HashMap<&str, i64> = executed
        .iter()
        .map(|m| (m.migration.as_str(), m.batch))
        .collect();

    let mut names: Vec<&String> = discovered.iter().collect();
    names.sort();
    names.dedup();

    let mut rows: Vec<MigrationStatus> = names
        .into_iter()
        .map(|name| match batches.get(name.as_str()) {
            Some(batch) => MigrationStatus {
                migration: name.clone(),
                state: MigrationState::Migrated,
                batch: Some(*batch),
            },
            None => MigrationStatus {
                migration: name.clone(),
                state: MigrationState::Pending,
                batch: None,
            },
        })
        .collect();

    let on_disk: HashSet<&str> = discovered.iter().map(String::as_str).collect();
    let mut missing: Vec<&ExecutedMigration> = executed
        .iter()
        .filter(|m| !on_disk.contains(m.migration.as_str()))
        .collect();
    missing.sort_by_key(|m| m.id);

    rows.extend(missing.into_iter().map(|m| MigrationStatus {
        migration: m.migration.clone(),
        state: MigrationState::Missing,
        batch: Some(m.batch),
    }));

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executed(id: i64, name: &str, batch: i64) -> ExecutedMigration {
        ExecutedMigration {
            id,
            migration: name.to_string(),
            batch,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_migration_name() {
        assert_eq!(migration_name("001_create_posts_table.sql"), Some("001_create_posts_table"));
        assert_eq!(migration_name("README.md"), None);
        assert_eq!(migration_name(".sql"), None);
        assert_eq!(migration_name(".hidden.sql"), None);
    }

    #[test]
    fn test_pending_is_sorted_difference() {
        let discovered = names(&["003_c", "001_a", "002_b"]);
        let done = vec![executed(1, "001_a", 1)];
        assert_eq!(pending(&discovered, &done), names(&["002_b", "003_c"]));
    }

    #[test]
    fn test_batches() {
        assert_eq!(last_batch(&[]), None);
        assert_eq!(next_batch(&[]), 1);

        let done = vec![executed(1, "a", 1), executed(2, "b", 2), executed(3, "c", 2)];
        assert_eq!(last_batch(&done), Some(2));
        assert_eq!(next_batch(&done), 3);
    }

    #[test]
    fn test_rollback_order_is_last_batch_newest_first() {
        let done = vec![
            executed(1, "a", 1),
            executed(2, "b", 2),
            executed(3, "c", 2),
            executed(4, "d", 2),
        ];
        let order: Vec<String> = rollback_order(&done).into_iter().map(|m| m.migration).collect();
        assert_eq!(order, names(&["d", "c", "b"]));
        assert!(rollback_order(&[]).is_empty());
    }

    #[test]
    fn test_status_marks_migrated_pending_and_missing() {
        let discovered = names(&["002_b", "001_a"]);
        let done = vec![executed(1, "001_a", 1), executed(2, "000_removed", 1)];

        let rows = status(&discovered, &done);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].migration, "001_a");
        assert_eq!(rows[0].state, MigrationState::Migrated);
        assert_eq!(rows[0].batch, Some(1));
        assert_eq!(rows[1].state, MigrationState::Pending);
        assert_eq!(rows[1].batch, None);
        assert_eq!(rows[2].migration, "000_removed");
        assert_eq!(rows[2].state, MigrationState::Missing);
    }
}
