//! The global day counter.
//!
//! `increment` is one `UPDATE ... RETURNING` statement, so the read, add and
//! write happen under SQLite's write lock and concurrent callers always get
//! distinct values, across threads and processes alike.

use rusqlite::{params, Connection};

use crate::error::DatabaseError;

/// Challenge numbering starts at day 9.
pub const FIRST_DAY: i64 = 9;

pub struct DayCounter<'a> {
    conn: &'a Connection,
}

impl<'a> DayCounter<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn current(&self) -> Result<i64, DatabaseError> {
        let day = self.conn.query_row(
            "SELECT current_day FROM challenge_counter WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(day)
    }

    /// Add one and return the new value.
    pub fn increment(&self) -> Result<i64, DatabaseError> {
        let day = self.conn.query_row(
            "UPDATE challenge_counter
             SET current_day = current_day + 1, last_updated = ?1
             WHERE id = 1
             RETURNING current_day",
            params![chrono::Utc::now().to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(day)
    }

    /// Set the counter one below [`FIRST_DAY`] so the next increment yields it.
    pub fn reset(&self) -> Result<(), DatabaseError> {
        self.conn.execute(
            "UPDATE challenge_counter SET current_day = ?1, last_updated = ?2 WHERE id = 1",
            params![FIRST_DAY - 1, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
