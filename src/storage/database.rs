//! `SQLite` database connection and operations.
//!
//! The database is stored at `~/.classync/queue.db` and contains the
//! `request_queue` table of deferred mutating requests.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;

use crate::config::Paths;
use crate::error::ClassyncError;

use super::migrations;

/// How long a writer waits on a lock held by another connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection wrapper.
///
/// The connection sits behind a mutex so the queue can be shared between
/// the sync engine and write-path callers on other threads. Every store
/// operation holds the lock for exactly one statement or transaction.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at the default location.
    ///
    /// Creates the database file and runs migrations if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open() -> Result<Self, ClassyncError> {
        let paths = Paths::new()?;
        paths.ensure_dirs()?;
        Self::open_at(&paths.database)
    }

    /// Open the database at a specific path.
    ///
    /// Creates the database file and runs migrations if necessary. Several
    /// processes may open the same file at once; the schema is created by
    /// whichever takes the write lock first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_at(path: &Path) -> Result<Self, ClassyncError> {
        let conn = Connection::open(path).map_err(|e| {
            ClassyncError::Storage(format!("Failed to open database {}: {e}", path.display()))
        })?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| ClassyncError::Storage(format!("Failed to set busy timeout: {e}")))?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_in_memory() -> Result<Self, ClassyncError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            ClassyncError::Storage(format!("Failed to open in-memory database: {e}"))
        })?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, ClassyncError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Run database migrations.
    ///
    /// Safe to call any number of times; already-applied versions are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub fn migrate(&self) -> Result<(), ClassyncError> {
        let mut conn = self.lock()?;
        migrations::run(&mut conn)
    }

    /// Get the current schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, ClassyncError> {
        let conn = self.lock()?;
        migrations::get_version(&conn)
    }

    /// Run `f` with exclusive access to the underlying connection.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or a storage error if the lock was
    /// poisoned by a panicking holder.
    pub fn with_connection<T, F>(&self, f: F) -> Result<T, ClassyncError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ClassyncError>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ClassyncError> {
        self.conn
            .lock()
            .map_err(|_| ClassyncError::Storage("database lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.schema_version().unwrap() > 0);
    }

    #[test]
    fn test_open_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("queue.db");

        let db = Database::open_at(&db_path).unwrap();
        assert!(db.schema_version().unwrap() > 0);
        assert!(db_path.exists());
    }

    #[test]
    fn test_reopen_database() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("queue.db");

        {
            let db = Database::open_at(&db_path).unwrap();
            db.with_connection(|conn| {
                conn.execute(
                    "INSERT INTO request_queue (url, method, headers, timestamp)
                     VALUES ('/a', 'POST', '{}', 1)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        }

        // Reopen - rows survive and migrations are not rerun
        let db = Database::open_at(&db_path).unwrap();
        let count: i64 = db
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM request_queue", [], |row| {
                    row.get(0)
                })?)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_concurrent_open_same_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("queue.db");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = db_path.clone();
                std::thread::spawn(move || Database::open_at(&path).map(|db| db.schema_version()))
            })
            .collect();

        for handle in handles {
            let version = handle.join().unwrap().unwrap().unwrap();
            assert!(version > 0);
        }
    }

    #[test]
    fn test_migrate_repeatedly() {
        let db = Database::open_in_memory().unwrap();
        let before = db.schema_version().unwrap();
        db.migrate().unwrap();
        db.migrate().unwrap();
        assert_eq!(db.schema_version().unwrap(), before);
    }
}
