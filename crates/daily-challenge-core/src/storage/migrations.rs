//! Database schema migrations.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

use crate::counter::FIRST_DAY;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i32>>(0)
    }) {
        Ok(v) => Ok(v.unwrap_or(0)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: problems, users, submissions, daily challenges and the day counter.
///
/// `submissions` is unique per (user, date): a user is credited at most once
/// per date whatever problem they report. `daily_challenges` is unique per date.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS problems (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            title     TEXT NOT NULL UNIQUE CHECK (length(title) > 0),
            url       TEXT NOT NULL,
            category  TEXT NOT NULL,
            used      INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY,
            username    TEXT,
            first_name  TEXT NOT NULL DEFAULT '',
            last_name   TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS submissions (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id       INTEGER NOT NULL REFERENCES users (id),
            problem_id    INTEGER NOT NULL REFERENCES problems (id),
            date          TEXT NOT NULL,
            submitted_at  TEXT NOT NULL,
            UNIQUE (user_id, date)
        );

        CREATE TABLE IF NOT EXISTS daily_challenges (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            problem_id  INTEGER NOT NULL REFERENCES problems (id),
            date        TEXT NOT NULL UNIQUE,
            posted_at   TEXT NOT NULL,
            day_number  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS challenge_counter (
            id            INTEGER PRIMARY KEY CHECK (id = 1),
            current_day   INTEGER NOT NULL,
            last_updated  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_problems_used ON problems(used);
        CREATE INDEX IF NOT EXISTS idx_submissions_date ON submissions(date);",
    )?;

    tx.execute(
        "INSERT OR IGNORE INTO challenge_counter (id, current_day, last_updated)
         VALUES (1, ?1, ?2)",
        rusqlite::params![FIRST_DAY, chrono::Utc::now().to_rfc3339()],
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: LeetCode profiles used for automatic verification.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS leetcode_profiles (
            user_id            INTEGER PRIMARY KEY REFERENCES users (id),
            leetcode_username  TEXT NOT NULL UNIQUE,
            created_at         TEXT NOT NULL
        );",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn.execute("UPDATE challenge_counter SET current_day = 20", [])
            .unwrap();
        migrate(&conn).unwrap();

        let day: i64 = conn
            .query_row("SELECT current_day FROM challenge_counter", [], |r| r.get(0))
            .unwrap();
        assert_eq!(day, 20);
    }

    #[test]
    fn counter_is_seeded_with_first_day() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let day: i64 = conn
            .query_row("SELECT current_day FROM challenge_counter WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(day, FIRST_DAY);
    }

    #[test]
    fn counter_table_holds_a_single_row() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let second = conn.execute(
            "INSERT INTO challenge_counter (id, current_day, last_updated) VALUES (2, 1, '')",
            [],
        );
        assert!(second.is_err());
    }
}
