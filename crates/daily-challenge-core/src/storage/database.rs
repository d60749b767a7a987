//! SQLite connection handling.
//!
//! The database is the only shared mutable resource of the bot. Every unit of
//! work opens its own [`Database`]; concurrent writers are serialized by
//! SQLite's locking, with a busy timeout so contention waits instead of failing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use super::{data_dir, migrations, StorageConfig};
use crate::error::DatabaseError;

pub const DEFAULT_DB_FILE: &str = "daily_challenge.db";

pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// File backing this database, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Open the database named by the storage config, defaulting to
    /// `<data_dir>/daily_challenge.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &StorageConfig) -> Result<Self, DatabaseError> {
        let path = match &config.database_path {
            Some(path) => path.clone(),
            None => data_dir()
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
                .join(DEFAULT_DB_FILE),
        };
        Self::open_at(path, Duration::from_millis(config.busy_timeout_ms))
    }

    /// Open (creating if needed) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, DatabaseError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        conn.busy_timeout(busy_timeout)?;
        relax_foreign_keys(&conn)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "opened database");

        let db = Self {
            conn,
            path: Some(path),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and dry runs).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        relax_foreign_keys(&conn)?;
        let db = Self { conn, path: None };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        migrations::migrate(&self.conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }
}

/// The bundled SQLite enforces foreign keys by default. Submissions and
/// LeetCode profiles may reference users who have not spoken in the chat yet.
fn relax_foreign_keys(conn: &Connection) -> Result<(), DatabaseError> {
    conn.pragma_update(None, "foreign_keys", false)?;
    Ok(())
}
