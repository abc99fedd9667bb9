//! Database migrations for classync.
//!
//! Each migration is a function that upgrades the schema by one version.
//! Migrations are run automatically when the database is opened, inside an
//! immediate transaction so concurrent openers apply each version once.

use rusqlite::{Connection, TransactionBehavior};

use crate::error::ClassyncError;

/// Current schema version.
const CURRENT_VERSION: i32 = 1;

/// Get the current schema version from the database.
///
/// Returns 0 if no version has been set (new database).
pub fn get_version(conn: &Connection) -> Result<i32, ClassyncError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| ClassyncError::Storage(format!("Failed to get schema version: {e}")))
}

/// Set the schema version in the database.
fn set_version(conn: &Connection, version: i32) -> Result<(), ClassyncError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| ClassyncError::Storage(format!("Failed to set schema version: {e}")))
}

/// Run all pending migrations.
pub fn run(conn: &mut Connection) -> Result<(), ClassyncError> {
    if get_version(conn)? >= CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| ClassyncError::Storage(format!("Failed to begin migration: {e}")))?;

    // Another connection may have migrated while we waited for the lock
    let current = get_version(&tx)?;
    for version in (current + 1)..=CURRENT_VERSION {
        run_migration(&tx, version)?;
        set_version(&tx, version)?;
    }

    tx.commit()
        .map_err(|e| ClassyncError::Storage(format!("Failed to commit migration: {e}")))
}

/// Run a specific migration.
fn run_migration(conn: &Connection, version: i32) -> Result<(), ClassyncError> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(ClassyncError::Storage(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: request queue.
///
/// `AUTOINCREMENT` keeps ids from being reused after the highest row is
/// deleted.
fn migrate_v1(conn: &Connection) -> Result<(), ClassyncError> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS request_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            method TEXT NOT NULL,
            body TEXT,
            headers TEXT NOT NULL DEFAULT '{}',
            timestamp INTEGER NOT NULL,
            temp_id TEXT,
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_request_queue_temp_id
        ON request_queue(temp_id);
        ",
    )
    .map_err(|e| ClassyncError::Storage(format!("Migration v1 failed: {e}")))
}
