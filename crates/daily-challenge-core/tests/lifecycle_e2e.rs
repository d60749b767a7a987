//! End-to-end challenge days driven through the public API.

use daily_challenge_core::{
    AdminOrigins, Catalog, ChallengeDate, Database, LifecycleError, LifecycleOrchestrator,
    PostOutcome, ProblemPool, RecordOutcome, User, UserDirectory, FIRST_DAY,
};

const CATALOG: &str = "
Arrays:
  - title: Two Sum
    url: https://leetcode.com/problems/two-sum/
  - title: Contains Duplicate
    url: https://leetcode.com/problems/contains-duplicate/
Stack:
  - title: Valid Parentheses
    url: https://leetcode.com/problems/valid-parentheses/
";

const GROUP: i64 = -1001;

fn date(s: &str) -> ChallengeDate {
    s.parse().unwrap()
}

fn setup() -> Database {
    let db = Database::open_memory().unwrap();
    Catalog::from_yaml_str(CATALOG).unwrap().import(db.conn()).unwrap();
    let users = UserDirectory::new(db.conn());
    users.upsert(&User::new(1, "Ada").with_username("ada")).unwrap();
    users.upsert(&User::new(2, "Bob")).unwrap();
    users.upsert(&User::new(3, "Cy")).unwrap();
    db
}

#[test]
fn three_days_until_the_pool_runs_dry() {
    let db = setup();
    let admins = AdminOrigins::new([GROUP]);
    let lifecycle = LifecycleOrchestrator::new(&db, &admins);

    let mut seen = Vec::new();
    for (i, day) in ["2024-01-08", "2024-01-09", "2024-01-10"].iter().enumerate() {
        let outcome = lifecycle.post_daily_challenge(date(day)).unwrap();
        assert!(outcome.is_new());
        assert_eq!(outcome.challenge().day_number, FIRST_DAY + 1 + i as i64);
        seen.push(outcome.challenge().problem.id);
    }
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 3, "no problem is posted twice");

    let err = lifecycle.post_daily_challenge(date("2024-01-11")).unwrap_err();
    assert!(matches!(err, LifecycleError::PoolExhausted));
    // Posted dates stay readable after exhaustion.
    assert!(matches!(
        lifecycle.post_daily_challenge(date("2024-01-10")),
        Ok(PostOutcome::AlreadyPosted(_))
    ));
}

#[test]
fn a_day_of_submissions_reminders_and_ranking() {
    let db = setup();
    let admins = AdminOrigins::new([GROUP]);
    let lifecycle = LifecycleOrchestrator::new(&db, &admins);
    let day1 = date("2024-01-08");
    let day2 = date("2024-01-09");

    lifecycle.post_daily_challenge(day1).unwrap();
    assert_eq!(lifecycle.submit(2, day1).unwrap().outcome, RecordOutcome::Created);
    assert_eq!(lifecycle.submit(2, day1).unwrap().outcome, RecordOutcome::AlreadyExists);
    lifecycle.submit(3, day1).unwrap();

    let pending = lifecycle.compute_reminder_targets(day1).unwrap().non_responders;
    assert_eq!(pending.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1]);

    lifecycle.post_daily_challenge(day2).unwrap();
    lifecycle.submit(3, day2).unwrap();

    let board = lifecycle.leaderboard(10).unwrap();
    let ranking: Vec<(&str, u64)> = board
        .iter()
        .map(|e| (e.user.first_name.as_str(), e.total_solved))
        .collect();
    assert_eq!(ranking, vec![("Cy", 2), ("Bob", 1), ("Ada", 0)]);

    // Submitting for a date with no challenge fails and records nothing.
    assert!(matches!(
        lifecycle.submit(1, date("2024-01-12")),
        Err(LifecycleError::NoChallengeToday { .. })
    ));
    assert_eq!(lifecycle.leaderboard(1).unwrap()[0].total_solved, 2);
}

#[test]
fn reset_restarts_numbering_without_touching_history() {
    let db = setup();
    let admins = AdminOrigins::new([GROUP]);
    let lifecycle = LifecycleOrchestrator::new(&db, &admins);
    let first = lifecycle.post_daily_challenge(date("2024-01-08")).unwrap();

    assert!(matches!(
        lifecycle.reset_cycle(42),
        Err(LifecycleError::Unauthorized { origin: 42 })
    ));
    lifecycle.reset_cycle(GROUP).unwrap();

    let next = lifecycle.post_daily_challenge(date("2024-01-09")).unwrap();
    assert_eq!(next.challenge().day_number, FIRST_DAY);
    let status = lifecycle.status(date("2024-01-08")).unwrap();
    assert_eq!(
        status.challenge.unwrap().day_number,
        first.challenge().day_number
    );
    assert_eq!(ProblemPool::new(db.conn()).counts().unwrap().unused, 1);
}
