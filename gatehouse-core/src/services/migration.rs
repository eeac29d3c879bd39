//! Schema migrations
//!
//! Applies the embedded SQL files in name order. Each file runs in its own
//! transaction together with its `sys_migrations` row, so a failing file
//! leaves neither partial schema nor a bookkeeping entry behind.

use std::collections::HashSet;

use duckdb::Connection;
use tracing::{info, warn};

use crate::domain::result::{Error, Result};
use crate::migrations::MIGRATIONS;

/// Outcome of a migration run
#[derive(Debug, Default)]
pub struct MigrationResult {
    /// Names of newly applied migrations
    pub applied: Vec<String>,
    /// Count of migrations that were already applied
    pub already_applied: usize,
}

/// Applies pending migrations over a borrowed connection
pub struct MigrationService<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Apply every embedded migration not yet recorded
    pub fn run_pending(&self) -> Result<MigrationResult> {
        self.apply(MIGRATIONS)
    }

    fn apply(&self, migrations: &[(&str, &str)]) -> Result<MigrationResult> {
        let mut done = self.recorded()?;
        let mut result = MigrationResult::default();

        for (name, sql) in migrations {
            if done.contains(*name) {
                result.already_applied += 1;
                continue;
            }
            self.apply_one(name, sql)?;
            info!(migration = %name, "Applied migration");
            done.insert(name.to_string());
            result.applied.push(name.to_string());
        }

        Ok(result)
    }

    /// Names in `sys_migrations`; empty before the bookkeeping table exists
    fn recorded(&self) -> Result<HashSet<String>> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Ok(HashSet::new());
        }

        let mut stmt = self.conn.prepare("SELECT migration_name FROM sys_migrations")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(names.collect::<std::result::Result<HashSet<_>, _>>()?)
    }

    fn apply_one(&self, name: &str, sql: &str) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;

        let outcome = self.conn.execute_batch(sql).and_then(|()| {
            self.conn
                .execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])
        });

        match outcome {
            Ok(_) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    warn!(migration = %name, error = %rollback, "Rollback failed");
                }
                Err(Error::database(format!("Migration {} failed: {}", name, e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, table: &str) -> bool {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        count > 0
    }

    #[test]
    fn test_migrations_run_once() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);

        let first = service.run_pending().unwrap();
        assert_eq!(first.applied.len(), MIGRATIONS.len());
        assert_eq!(first.already_applied, 0);
        assert!(table_exists(&conn, "sys_users"));

        let second = service.run_pending().unwrap();
        assert!(second.applied.is_empty());
        assert_eq!(second.already_applied, MIGRATIONS.len());
    }

    #[test]
    fn test_failed_migration_is_rolled_back() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);
        let bootstrap = MIGRATIONS[0];

        let err = service
            .apply(&[
                bootstrap,
                (
                    "001_broken.sql",
                    "CREATE TABLE half_done (id INTEGER); SELECT * FROM no_such_table;",
                ),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));

        // The bootstrap committed; the broken file left nothing behind
        assert!(!table_exists(&conn, "half_done"));
        let recorded = service.recorded().unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(recorded.contains(bootstrap.0));

        // A corrected file applies on the next run
        let fixed = service
            .apply(&[bootstrap, ("001_broken.sql", "CREATE TABLE half_done (id INTEGER);")])
            .unwrap();
        assert_eq!(fixed.applied, vec!["001_broken.sql".to_string()]);
        assert_eq!(fixed.already_applied, 1);
        assert!(table_exists(&conn, "half_done"));
    }

    #[test]
    fn test_users_table_rejects_unknown_roles() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationService::new(&conn).run_pending().unwrap();

        let rejected = conn.execute(
            "INSERT INTO sys_users (user_id, role, password_hash) VALUES (?, ?, ?)",
            ["a@x.com", "superuser", "hash"],
        );
        assert!(rejected.is_err());
    }
}
