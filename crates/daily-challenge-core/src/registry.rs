//! Date → challenge registry. One immutable row per calendar date.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::date::ChallengeDate;
use crate::error::DatabaseError;
use crate::models::{DailyChallenge, Problem, ProblemId, RecordOutcome};

/// A raw registry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub date: ChallengeDate,
    pub problem_id: ProblemId,
    pub day_number: i64,
    pub posted_at: DateTime<Utc>,
}

pub struct ChallengeRegistry<'a> {
    conn: &'a Connection,
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl<'a> ChallengeRegistry<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Register the challenge for `date`.
    ///
    /// When the date already has a row it is returned unchanged together with
    /// [`RecordOutcome::AlreadyExists`].
    pub fn record_for_date(
        &self,
        date: ChallengeDate,
        problem_id: ProblemId,
        day_number: i64,
    ) -> Result<(RecordOutcome, ChallengeRecord), DatabaseError> {
        let changes = self.conn.execute(
            "INSERT INTO daily_challenges (problem_id, date, posted_at, day_number)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(date) DO NOTHING",
            params![problem_id, date, Utc::now().to_rfc3339(), day_number],
        )?;

        let record = self.conn.query_row(
            "SELECT date, problem_id, day_number, posted_at FROM daily_challenges WHERE date = ?1",
            params![date],
            |row| {
                let posted_at: String = row.get(3)?;
                Ok(ChallengeRecord {
                    date: row.get(0)?,
                    problem_id: row.get(1)?,
                    day_number: row.get(2)?,
                    posted_at: parse_timestamp(&posted_at),
                })
            },
        )?;
        Ok((RecordOutcome::from_changes(changes), record))
    }

    /// The challenge for `date` joined with its problem.
    pub fn lookup_by_date(&self, date: ChallengeDate) -> Result<Option<DailyChallenge>, DatabaseError> {
        let challenge = self
            .conn
            .query_row(
                "SELECT dc.date, dc.day_number, dc.posted_at,
                        p.id, p.title, p.url, p.category, p.used
                 FROM daily_challenges dc
                 JOIN problems p ON p.id = dc.problem_id
                 WHERE dc.date = ?1",
                params![date],
                |row| {
                    let posted_at: String = row.get(2)?;
                    Ok(DailyChallenge {
                        date: row.get(0)?,
                        day_number: row.get(1)?,
                        posted_at: parse_timestamp(&posted_at),
                        problem: Problem {
                            id: row.get(3)?,
                            title: row.get(4)?,
                            url: row.get(5)?,
                            category: row.get(6)?,
                            used: row.get(7)?,
                        },
                    })
                },
            )
            .optional()?;
        Ok(challenge)
    }

    /// Most recent challenges first.
    pub fn recent(&self, limit: usize) -> Result<Vec<ChallengeRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, problem_id, day_number, posted_at FROM daily_challenges
             ORDER BY date DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let posted_at: String = row.get(3)?;
                Ok(ChallengeRecord {
                    date: row.get(0)?,
                    problem_id: row.get(1)?,
                    day_number: row.get(2)?,
                    posted_at: parse_timestamp(&posted_at),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ProblemPool;
    use crate::storage::Database;

    fn date(s: &str) -> ChallengeDate {
        s.parse().unwrap()
    }

    fn seeded() -> Database {
        let db = Database::open_memory().unwrap();
        let pool = ProblemPool::new(db.conn());
        pool.add("Two Sum", "https://leetcode.com/problems/two-sum/", "Arrays").unwrap();
        pool.add("Valid Parentheses", "https://leetcode.com/problems/valid-parentheses/", "Stack")
            .unwrap();
        db
    }

    #[test]
    fn record_then_lookup() {
        let db = seeded();
        let registry = ChallengeRegistry::new(db.conn());
        let (outcome, record) = registry.record_for_date(date("2024-01-10"), 1, 10).unwrap();
        assert_eq!(outcome, RecordOutcome::Created);
        assert_eq!(record.day_number, 10);

        let found = registry.lookup_by_date(date("2024-01-10")).unwrap().unwrap();
        assert_eq!(found.day_number, 10);
        assert_eq!(found.problem.title, "Two Sum");
    }

    #[test]
    fn second_record_returns_existing_row_unchanged() {
        let db = seeded();
        let registry = ChallengeRegistry::new(db.conn());
        registry.record_for_date(date("2024-01-10"), 1, 10).unwrap();
        let (outcome, record) = registry.record_for_date(date("2024-01-10"), 2, 11).unwrap();
        assert_eq!(outcome, RecordOutcome::AlreadyExists);
        assert_eq!(record.problem_id, 1);
        assert_eq!(record.day_number, 10);
    }

    #[test]
    fn lookup_of_unposted_date_is_none() {
        let db = seeded();
        let registry = ChallengeRegistry::new(db.conn());
        assert!(registry.lookup_by_date(date("2024-01-10")).unwrap().is_none());
    }

    #[test]
    fn recent_lists_newest_first() {
        let db = seeded();
        let registry = ChallengeRegistry::new(db.conn());
        registry.record_for_date(date("2024-01-10"), 1, 10).unwrap();
        registry.record_for_date(date("2024-01-11"), 2, 11).unwrap();
        let recent = registry.recent(5).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].date, date("2024-01-11"));
    }
}
