//! The problem pool: the catalog of problems and their used flag.
//!
//! Selection and marking are separate primitives. The orchestrator decides
//! where the transaction boundary goes; selecting without marking simply
//! leaves the problem eligible for the next pick.

use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{DatabaseError, LifecycleError};
use crate::models::{Problem, ProblemId, RecordOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCounts {
    pub total: u64,
    pub unused: u64,
}

pub struct ProblemPool<'a> {
    conn: &'a Connection,
}

fn row_to_problem(row: &rusqlite::Row) -> Result<Problem, rusqlite::Error> {
    Ok(Problem {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        category: row.get(3)?,
        used: row.get(4)?,
    })
}

impl<'a> ProblemPool<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a problem unless one with the same title exists.
    pub fn add(&self, title: &str, url: &str, category: &str) -> Result<RecordOutcome, DatabaseError> {
        let changes = self.conn.execute(
            "INSERT INTO problems (title, url, category) VALUES (?1, ?2, ?3)
             ON CONFLICT(title) DO NOTHING",
            params![title, url, category],
        )?;
        Ok(RecordOutcome::from_changes(changes))
    }

    /// Pick one unused problem uniformly at random.
    ///
    /// # Errors
    /// [`LifecycleError::PoolExhausted`] when every problem has been used.
    pub fn select_random_unused(&self) -> Result<Problem, LifecycleError> {
        self.select_random_unused_with(&mut rand::thread_rng())
    }

    pub fn select_random_unused_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Problem, LifecycleError> {
        let unused: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM problems WHERE used = 0",
            [],
            |row| row.get(0),
        )?;
        if unused == 0 {
            return Err(LifecycleError::PoolExhausted);
        }

        let offset = rng.gen_range(0..unused);
        let problem = self
            .conn
            .query_row(
                "SELECT id, title, url, category, used FROM problems
                 WHERE used = 0 ORDER BY id LIMIT 1 OFFSET ?1",
                params![offset],
                row_to_problem,
            )
            .optional()?;
        problem.ok_or(LifecycleError::PoolExhausted)
    }

    /// Flip `used` to true. Marking an already-used problem is a no-op.
    pub fn mark_used(&self, id: ProblemId) -> Result<(), DatabaseError> {
        self.conn.execute(
            "UPDATE problems SET used = 1 WHERE id = ?1 AND used = 0",
            params![id],
        )?;
        Ok(())
    }

    pub fn get(&self, id: ProblemId) -> Result<Option<Problem>, DatabaseError> {
        let problem = self
            .conn
            .query_row(
                "SELECT id, title, url, category, used FROM problems WHERE id = ?1",
                params![id],
                row_to_problem,
            )
            .optional()?;
        Ok(problem)
    }

    pub fn counts(&self) -> Result<PoolCounts, DatabaseError> {
        let (total, unused) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN used = 0 THEN 1 ELSE 0 END), 0) FROM problems",
            [],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        Ok(PoolCounts { total, unused })
    }

    pub fn list(&self, unused_only: bool) -> Result<Vec<Problem>, DatabaseError> {
        let sql = if unused_only {
            "SELECT id, title, url, category, used FROM problems WHERE used = 0 ORDER BY id"
        } else {
            "SELECT id, title, url, category, used FROM problems ORDER BY id"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let problems = stmt
            .query_map([], row_to_problem)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;
    use std::collections::HashSet;

    fn pool_with(db: &Database, n: usize) {
        let pool = ProblemPool::new(db.conn());
        for i in 0..n {
            pool.add(
                &format!("Problem {i}"),
                &format!("https://leetcode.com/problems/p-{i}/"),
                "Arrays",
            )
            .unwrap();
        }
    }

    #[test]
    fn add_ignores_duplicate_titles() {
        let db = Database::open_memory().unwrap();
        let pool = ProblemPool::new(db.conn());
        assert_eq!(pool.add("Two Sum", "u1", "Arrays").unwrap(), RecordOutcome::Created);
        assert_eq!(
            pool.add("Two Sum", "u2", "Hashing").unwrap(),
            RecordOutcome::AlreadyExists
        );
        let problems = pool.list(false).unwrap();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].url, "u1");
    }

    #[test]
    fn empty_title_is_rejected_by_the_store() {
        let db = Database::open_memory().unwrap();
        assert!(ProblemPool::new(db.conn()).add("", "u", "c").is_err());
    }

    #[test]
    fn exhausts_after_every_problem_is_marked() {
        let db = Database::open_memory().unwrap();
        pool_with(&db, 2);
        let pool = ProblemPool::new(db.conn());
        let mut rng = Mcg128Xsl64::seed_from_u64(7);

        let first = pool.select_random_unused_with(&mut rng).unwrap();
        pool.mark_used(first.id).unwrap();
        let second = pool.select_random_unused_with(&mut rng).unwrap();
        pool.mark_used(second.id).unwrap();

        assert_ne!(first.id, second.id);
        assert!(matches!(
            pool.select_random_unused_with(&mut rng),
            Err(LifecycleError::PoolExhausted)
        ));
    }

    #[test]
    fn empty_pool_is_exhausted() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            ProblemPool::new(db.conn()).select_random_unused(),
            Err(LifecycleError::PoolExhausted)
        ));
    }

    #[test]
    fn selection_without_marking_may_repeat() {
        let db = Database::open_memory().unwrap();
        pool_with(&db, 1);
        let pool = ProblemPool::new(db.conn());
        let a = pool.select_random_unused().unwrap();
        let b = pool.select_random_unused().unwrap();
        assert_eq!(a.id, b.id);
        assert!(!a.used);
    }

    #[test]
    fn mark_used_is_idempotent() {
        let db = Database::open_memory().unwrap();
        pool_with(&db, 3);
        let pool = ProblemPool::new(db.conn());
        let p = pool.select_random_unused().unwrap();
        pool.mark_used(p.id).unwrap();
        pool.mark_used(p.id).unwrap();
        assert!(pool.get(p.id).unwrap().unwrap().used);
        assert_eq!(pool.counts().unwrap(), PoolCounts { total: 3, unused: 2 });
    }

    #[test]
    fn selection_reaches_every_unused_problem() {
        let db = Database::open_memory().unwrap();
        pool_with(&db, 5);
        let pool = ProblemPool::new(db.conn());
        let mut rng = Mcg128Xsl64::seed_from_u64(42);
        let seen: HashSet<ProblemId> = (0..200)
            .map(|_| pool.select_random_unused_with(&mut rng).unwrap().id)
            .collect();
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn used_problems_are_never_selected() {
        let db = Database::open_memory().unwrap();
        pool_with(&db, 4);
        let pool = ProblemPool::new(db.conn());
        let used: Vec<ProblemId> = pool.list(false).unwrap().iter().take(3).map(|p| p.id).collect();
        for id in &used {
            pool.mark_used(*id).unwrap();
        }
        let mut rng = Mcg128Xsl64::seed_from_u64(1);
        for _ in 0..50 {
            let p = pool.select_random_unused_with(&mut rng).unwrap();
            assert!(!used.contains(&p.id));
        }
        assert_eq!(pool.list(true).unwrap().len(), 1);
    }
}
