//! Challenge lifecycle orchestration.
//!
//! Per calendar date the lifecycle is
//!
//! ```text
//!   NoChallenge ──post──> Posted ──submit(user)──> Posted (+ submission)
//!                           │
//!                           └──post again──> Posted (no-op, same challenge)
//! ```
//!
//! Posting runs in two write transactions. The first selects and marks a
//! problem; the second re-checks the date, increments the day counter and
//! registers the challenge. A failure after the first commit leaves the
//! problem consumed without a post: a problem is never repeated, at the cost
//! of occasionally wasting one. Nothing here talks to the network; callers
//! notify after these functions return.

use std::collections::BTreeSet;

use rand::Rng;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::counter::DayCounter;
use crate::date::ChallengeDate;
use crate::error::LifecycleError;
use crate::leaderboard::LeaderboardRanker;
use crate::ledger::SubmissionLedger;
use crate::models::{DailyChallenge, LeaderboardEntry, Problem, RecordOutcome, User, UserId};
use crate::pool::{PoolCounts, ProblemPool};
use crate::registry::ChallengeRegistry;
use crate::reminder::ReminderEngine;
use crate::storage::Database;
use crate::users::UserDirectory;

/// Decides whether an origin (user or chat id) may run administrative operations.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, origin: i64) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(i64) -> bool + Send + Sync,
{
    fn is_authorized(&self, origin: i64) -> bool {
        self(origin)
    }
}

/// Fixed set of designated admin origins.
#[derive(Debug, Clone, Default)]
pub struct AdminOrigins(BTreeSet<i64>);

impl AdminOrigins {
    pub fn new(origins: impl IntoIterator<Item = i64>) -> Self {
        Self(origins.into_iter().collect())
    }
}

impl Authorizer for AdminOrigins {
    fn is_authorized(&self, origin: i64) -> bool {
        self.0.contains(&origin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "challenge", rename_all = "snake_case")]
pub enum PostOutcome {
    Posted(DailyChallenge),
    /// The date already had a challenge; nothing changed.
    AlreadyPosted(DailyChallenge),
}

impl PostOutcome {
    pub fn challenge(&self) -> &DailyChallenge {
        match self {
            PostOutcome::Posted(c) | PostOutcome::AlreadyPosted(c) => c,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, PostOutcome::Posted(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub outcome: RecordOutcome,
    pub challenge: DailyChallenge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderTargets {
    pub challenge: DailyChallenge,
    pub non_responders: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub date: ChallengeDate,
    pub current_day: i64,
    pub challenge: Option<DailyChallenge>,
    pub leader: Option<LeaderboardEntry>,
    pub pending_count: usize,
    pub pool: PoolCounts,
}

pub struct LifecycleOrchestrator<'a> {
    conn: &'a Connection,
    authorizer: &'a dyn Authorizer,
}

impl<'a> LifecycleOrchestrator<'a> {
    pub fn new(db: &'a Database, authorizer: &'a dyn Authorizer) -> Self {
        Self {
            conn: db.conn(),
            authorizer,
        }
    }

    pub fn authorize(&self, origin: i64) -> Result<(), LifecycleError> {
        if self.authorizer.is_authorized(origin) {
            Ok(())
        } else {
            warn!(origin, "rejected administrative operation");
            Err(LifecycleError::Unauthorized { origin })
        }
    }

    /// Post the challenge for `date`, or return the existing one.
    ///
    /// # Errors
    /// [`LifecycleError::PoolExhausted`] when no unused problem remains and
    /// the date has no challenge yet.
    pub fn post_daily_challenge(&self, date: ChallengeDate) -> Result<PostOutcome, LifecycleError> {
        self.post_daily_challenge_with(date, &mut rand::thread_rng())
    }

    pub fn post_daily_challenge_with<R: Rng + ?Sized>(
        &self,
        date: ChallengeDate,
        rng: &mut R,
    ) -> Result<PostOutcome, LifecycleError> {
        let problem = {
            let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
            if let Some(existing) = ChallengeRegistry::new(&tx).lookup_by_date(date)? {
                debug!(%date, day = existing.day_number, "challenge already posted");
                return Ok(PostOutcome::AlreadyPosted(existing));
            }
            let pool = ProblemPool::new(&tx);
            let problem = pool.select_random_unused_with(rng)?;
            pool.mark_used(problem.id)?;
            tx.commit()?;
            Problem {
                used: true,
                ..problem
            }
        };

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let registry = ChallengeRegistry::new(&tx);
        if let Some(existing) = registry.lookup_by_date(date)? {
            warn!(
                %date,
                problem = %problem.title,
                "challenge registered concurrently; selected problem stays consumed"
            );
            return Ok(PostOutcome::AlreadyPosted(existing));
        }
        let day_number = DayCounter::new(&tx).increment()?;
        let (outcome, record) = registry.record_for_date(date, problem.id, day_number)?;
        tx.commit()?;

        debug_assert!(outcome.is_created());
        info!(%date, day = record.day_number, problem = %problem.title, "posted daily challenge");
        Ok(PostOutcome::Posted(DailyChallenge {
            date: record.date,
            day_number: record.day_number,
            posted_at: record.posted_at,
            problem,
        }))
    }

    /// Administrative post, e.g. a manual trigger from chat.
    pub fn post_manual(&self, origin: i64, date: ChallengeDate) -> Result<PostOutcome, LifecycleError> {
        self.authorize(origin)?;
        self.post_daily_challenge(date)
    }

    /// Credit `user_id` for `date`. A repeat submit reports
    /// [`RecordOutcome::AlreadyExists`] rather than failing.
    ///
    /// # Errors
    /// [`LifecycleError::NoChallengeToday`] when nothing is posted for `date`.
    pub fn submit(&self, user_id: UserId, date: ChallengeDate) -> Result<SubmitOutcome, LifecycleError> {
        let challenge = self.challenge_for(date)?;
        let outcome = SubmissionLedger::new(self.conn).record(user_id, challenge.problem.id, date)?;
        debug!(user_id, %date, ?outcome, "submission");
        Ok(SubmitOutcome { outcome, challenge })
    }

    /// The posted challenge for `date` and the users who have not submitted.
    pub fn compute_reminder_targets(&self, date: ChallengeDate) -> Result<ReminderTargets, LifecycleError> {
        let challenge = self.challenge_for(date)?;
        let roster = UserDirectory::new(self.conn).roster()?;
        let non_responders = ReminderEngine::new(self.conn).non_responders(date, &roster)?;
        Ok(ReminderTargets {
            challenge,
            non_responders,
        })
    }

    /// Restart day numbering. Posted challenges keep their day numbers.
    pub fn reset_cycle(&self, origin: i64) -> Result<(), LifecycleError> {
        self.authorize(origin)?;
        DayCounter::new(self.conn).reset()?;
        info!(origin, "day counter reset");
        Ok(())
    }

    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, LifecycleError> {
        Ok(LeaderboardRanker::new(self.conn).rank(limit)?)
    }

    pub fn status(&self, date: ChallengeDate) -> Result<StatusReport, LifecycleError> {
        let challenge = ChallengeRegistry::new(self.conn).lookup_by_date(date)?;
        let roster = UserDirectory::new(self.conn).roster()?;
        let pending_count = ReminderEngine::new(self.conn)
            .non_responders(date, &roster)?
            .len();
        let leader = LeaderboardRanker::new(self.conn)
            .rank(1)?
            .into_iter()
            .next()
            .filter(|entry| entry.total_solved > 0);
        Ok(StatusReport {
            date,
            current_day: DayCounter::new(self.conn).current()?,
            challenge,
            leader,
            pending_count,
            pool: ProblemPool::new(self.conn).counts()?,
        })
    }

    fn challenge_for(&self, date: ChallengeDate) -> Result<DailyChallenge, LifecycleError> {
        ChallengeRegistry::new(self.conn)
            .lookup_by_date(date)?
            .ok_or(LifecycleError::NoChallengeToday { date })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::FIRST_DAY;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;

    fn date(s: &str) -> ChallengeDate {
        s.parse().unwrap()
    }

    fn seeded(n: usize) -> Database {
        let db = Database::open_memory().unwrap();
        let pool = ProblemPool::new(db.conn());
        for i in 0..n {
            pool.add(&format!("Problem {i}"), &format!("https://x/{i}"), "Arrays")
                .unwrap();
        }
        db
    }

    fn allow_all(_: i64) -> bool {
        true
    }

    #[test]
    fn post_consumes_a_problem_and_numbers_the_day() {
        let db = seeded(3);
        let lifecycle = LifecycleOrchestrator::new(&db, &allow_all);
        let outcome = lifecycle.post_daily_challenge(date("2024-01-10")).unwrap();

        assert!(outcome.is_new());
        let challenge = outcome.challenge();
        assert_eq!(challenge.day_number, FIRST_DAY + 1);
        assert!(challenge.problem.used);
        assert_eq!(
            ProblemPool::new(db.conn()).counts().unwrap(),
            PoolCounts { total: 3, unused: 2 }
        );
    }

    #[test]
    fn second_post_for_same_date_is_a_no_op() {
        let db = seeded(3);
        let lifecycle = LifecycleOrchestrator::new(&db, &allow_all);
        let first = lifecycle.post_daily_challenge(date("2024-01-10")).unwrap();
        let second = lifecycle.post_daily_challenge(date("2024-01-10")).unwrap();

        assert!(!second.is_new());
        assert_eq!(first.challenge(), second.challenge());
        assert_eq!(DayCounter::new(db.conn()).current().unwrap(), FIRST_DAY + 1);
        assert_eq!(ProblemPool::new(db.conn()).counts().unwrap().unused, 2);
    }

    #[test]
    fn consecutive_dates_get_consecutive_days_and_distinct_problems() {
        let db = seeded(3);
        let lifecycle = LifecycleOrchestrator::new(&db, &allow_all);
        let mut rng = Mcg128Xsl64::seed_from_u64(3);
        let a = lifecycle
            .post_daily_challenge_with(date("2024-01-10"), &mut rng)
            .unwrap();
        let b = lifecycle
            .post_daily_challenge_with(date("2024-01-11"), &mut rng)
            .unwrap();
        assert_eq!(b.challenge().day_number, a.challenge().day_number + 1);
        assert_ne!(a.challenge().problem.id, b.challenge().problem.id);
    }

    #[test]
    fn exhausted_pool_fails_without_touching_the_counter() {
        let db = seeded(1);
        let lifecycle = LifecycleOrchestrator::new(&db, &allow_all);
        lifecycle.post_daily_challenge(date("2024-01-10")).unwrap();
        let err = lifecycle.post_daily_challenge(date("2024-01-11")).unwrap_err();
        assert!(matches!(err, LifecycleError::PoolExhausted));
        assert_eq!(DayCounter::new(db.conn()).current().unwrap(), FIRST_DAY + 1);
        assert!(ChallengeRegistry::new(db.conn())
            .lookup_by_date(date("2024-01-11"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn exhausted_pool_still_returns_existing_post() {
        let db = seeded(1);
        let lifecycle = LifecycleOrchestrator::new(&db, &allow_all);
        lifecycle.post_daily_challenge(date("2024-01-10")).unwrap();
        assert!(!lifecycle
            .post_daily_challenge(date("2024-01-10"))
            .unwrap()
            .is_new());
    }

    #[test]
    fn submit_requires_a_posted_challenge() {
        let db = seeded(1);
        let lifecycle = LifecycleOrchestrator::new(&db, &allow_all);
        let err = lifecycle.submit(1, date("2024-01-10")).unwrap_err();
        assert!(matches!(err, LifecycleError::NoChallengeToday { .. }));
    }

    #[test]
    fn submit_twice_is_created_then_already_exists() {
        let db = seeded(1);
        let lifecycle = LifecycleOrchestrator::new(&db, &allow_all);
        lifecycle.post_daily_challenge(date("2024-01-10")).unwrap();

        let first = lifecycle.submit(7, date("2024-01-10")).unwrap();
        let second = lifecycle.submit(7, date("2024-01-10")).unwrap();
        assert_eq!(first.outcome, RecordOutcome::Created);
        assert_eq!(second.outcome, RecordOutcome::AlreadyExists);
        assert_eq!(first.challenge.day_number, second.challenge.day_number);
    }

    #[test]
    fn submit_from_a_user_never_seen_is_counted_but_not_ranked() {
        let db = seeded(1);
        let lifecycle = LifecycleOrchestrator::new(&db, &allow_all);
        lifecycle.post_daily_challenge(date("2024-01-10")).unwrap();

        let outcome = lifecycle.submit(404, date("2024-01-10")).unwrap();
        assert_eq!(outcome.outcome, RecordOutcome::Created);

        let counts = crate::ledger::SubmissionLedger::new(db.conn())
            .count_by_user()
            .unwrap();
        assert_eq!(counts.get(&404), Some(&1));
        assert!(lifecycle.leaderboard(10).unwrap().is_empty());
    }

    #[test]
    fn reset_then_post_yields_first_day() {
        let db = seeded(5);
        let lifecycle = LifecycleOrchestrator::new(&db, &allow_all);
        let first = lifecycle.post_daily_challenge(date("2024-01-10")).unwrap();
        lifecycle.post_daily_challenge(date("2024-01-11")).unwrap();

        lifecycle.reset_cycle(1).unwrap();
        let after = lifecycle.post_daily_challenge(date("2024-01-12")).unwrap();
        assert_eq!(after.challenge().day_number, FIRST_DAY);

        // history keeps its day numbers
        let old = ChallengeRegistry::new(db.conn())
            .lookup_by_date(date("2024-01-10"))
            .unwrap()
            .unwrap();
        assert_eq!(old.day_number, first.challenge().day_number);
    }

    #[test]
    fn unauthorized_reset_changes_nothing() {
        let db = seeded(1);
        let admins = AdminOrigins::new([-100]);
        let lifecycle = LifecycleOrchestrator::new(&db, &admins);
        DayCounter::new(db.conn()).increment().unwrap();

        let err = lifecycle.reset_cycle(42).unwrap_err();
        assert!(matches!(err, LifecycleError::Unauthorized { origin: 42 }));
        assert_eq!(DayCounter::new(db.conn()).current().unwrap(), FIRST_DAY + 1);

        lifecycle.reset_cycle(-100).unwrap();
        assert_eq!(DayCounter::new(db.conn()).current().unwrap(), FIRST_DAY - 1);
    }

    #[test]
    fn unauthorized_manual_post_changes_nothing() {
        let db = seeded(1);
        let admins = AdminOrigins::new([-100]);
        let lifecycle = LifecycleOrchestrator::new(&db, &admins);
        assert!(matches!(
            lifecycle.post_manual(5, date("2024-01-10")),
            Err(LifecycleError::Unauthorized { .. })
        ));
        assert_eq!(ProblemPool::new(db.conn()).counts().unwrap().unused, 1);
        assert!(lifecycle.post_manual(-100, date("2024-01-10")).unwrap().is_new());
    }

    #[test]
    fn reminder_targets_exclude_submitters() {
        let db = seeded(1);
        let users = UserDirectory::new(db.conn());
        for (id, name) in [(1, "U1"), (2, "U2"), (3, "U3")] {
            users.upsert(&User::new(id, name)).unwrap();
        }
        let lifecycle = LifecycleOrchestrator::new(&db, &allow_all);
        lifecycle.post_daily_challenge(date("2024-01-10")).unwrap();
        lifecycle.submit(1, date("2024-01-10")).unwrap();

        let targets = lifecycle.compute_reminder_targets(date("2024-01-10")).unwrap();
        let ids: Vec<UserId> = targets.non_responders.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn reminder_targets_need_a_challenge() {
        let db = seeded(1);
        let lifecycle = LifecycleOrchestrator::new(&db, &allow_all);
        assert!(matches!(
            lifecycle.compute_reminder_targets(date("2024-01-10")),
            Err(LifecycleError::NoChallengeToday { .. })
        ));
    }

    #[test]
    fn status_summarises_the_day() {
        let db = seeded(2);
        let users = UserDirectory::new(db.conn());
        users.upsert(&User::new(1, "Ada")).unwrap();
        users.upsert(&User::new(2, "Bob")).unwrap();
        let lifecycle = LifecycleOrchestrator::new(&db, &allow_all);

        let before = lifecycle.status(date("2024-01-10")).unwrap();
        assert!(before.challenge.is_none());
        assert!(before.leader.is_none());
        assert_eq!(before.pending_count, 2);

        lifecycle.post_daily_challenge(date("2024-01-10")).unwrap();
        lifecycle.submit(2, date("2024-01-10")).unwrap();
        let after = lifecycle.status(date("2024-01-10")).unwrap();
        assert_eq!(after.current_day, FIRST_DAY + 1);
        assert_eq!(after.leader.unwrap().user.first_name, "Bob");
        assert_eq!(after.pending_count, 1);
        assert_eq!(after.pool, PoolCounts { total: 2, unused: 1 });
    }
}
