//! Append-only ledger of completion records, one per user per date.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::date::ChallengeDate;
use crate::error::DatabaseError;
use crate::models::{ProblemId, RecordOutcome, Submission, UserId};

pub struct SubmissionLedger<'a> {
    conn: &'a Connection,
}

impl<'a> SubmissionLedger<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert unless the user already has a record for `date`.
    ///
    /// Uniqueness is enforced by the `UNIQUE (user_id, date)` constraint, so
    /// two racing submits from one user produce exactly one `Created`.
    pub fn record(
        &self,
        user_id: UserId,
        problem_id: ProblemId,
        date: ChallengeDate,
    ) -> Result<RecordOutcome, DatabaseError> {
        let changes = self.conn.execute(
            "INSERT INTO submissions (user_id, problem_id, date, submitted_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, date) DO NOTHING",
            params![user_id, problem_id, date, Utc::now().to_rfc3339()],
        )?;
        Ok(RecordOutcome::from_changes(changes))
    }

    pub fn has_submitted(&self, user_id: UserId, date: ChallengeDate) -> Result<bool, DatabaseError> {
        let found = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM submissions WHERE user_id = ?1 AND date = ?2)",
            params![user_id, date],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    /// Distinct dates submitted, per user. Users without submissions are absent.
    pub fn count_by_user(&self) -> Result<HashMap<UserId, u64>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id, COUNT(DISTINCT date) FROM submissions GROUP BY user_id")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, UserId>(0)?, row.get::<_, u64>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(counts)
    }

    pub fn submitters_on(&self, date: ChallengeDate) -> Result<HashSet<UserId>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id FROM submissions WHERE date = ?1")?;
        let users = stmt
            .query_map(params![date], |row| row.get::<_, UserId>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(users)
    }

    pub fn for_user(&self, user_id: UserId) -> Result<Vec<Submission>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, problem_id, date, submitted_at FROM submissions
             WHERE user_id = ?1 ORDER BY date",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                let submitted_at: String = row.get(3)?;
                Ok(Submission {
                    user_id: row.get(0)?,
                    problem_id: row.get(1)?,
                    date: row.get(2)?,
                    submitted_at: DateTime::parse_from_rfc3339(&submitted_at)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
