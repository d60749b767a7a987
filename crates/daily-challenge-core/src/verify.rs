//! Automatic submission credit from LeetCode accepted solutions.
//!
//! A sync round is split so no database handle is held across an await:
//! [`plan`] reads who still needs checking, [`find_solvers`] talks to
//! LeetCode, and [`credit`] records submissions through the regular submit
//! path.

use chrono::FixedOffset;
use tracing::{debug, warn};
use url::Url;

use crate::date::ChallengeDate;
use crate::error::LifecycleError;
use crate::integrations::{AcceptedSubmission, LeetCodeClient};
use crate::ledger::SubmissionLedger;
use crate::lifecycle::LifecycleOrchestrator;
use crate::models::{DailyChallenge, Problem, User, UserId};
use crate::registry::ChallengeRegistry;
use crate::storage::Database;
use crate::users::{LeetCodeProfile, LeetCodeProfiles, UserDirectory};

/// `two-sum` from `https://leetcode.com/problems/two-sum/description/`.
pub fn problem_slug(problem_url: &str) -> Option<String> {
    let url = Url::parse(problem_url).ok()?;
    let mut segments = url.path_segments()?;
    segments.find(|s| *s == "problems")?;
    segments
        .find(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
}

/// Slug match when the problem URL has one, otherwise case-insensitive title.
pub fn matches_problem(submission: &AcceptedSubmission, problem: &Problem) -> bool {
    match problem_slug(&problem.url) {
        Some(slug) => submission.title_slug.eq_ignore_ascii_case(&slug),
        None => submission.title.trim().eq_ignore_ascii_case(problem.title.trim()),
    }
}

/// Whether any submission solves `problem` on `date` as seen from `offset`.
pub fn accepted_on(
    submissions: &[AcceptedSubmission],
    problem: &Problem,
    date: ChallengeDate,
    offset: FixedOffset,
) -> bool {
    submissions.iter().any(|s| {
        matches_problem(s, problem) && ChallengeDate::of(&s.accepted_at.with_timezone(&offset)) == date
    })
}

#[derive(Debug, Clone)]
pub struct VerificationPlan {
    pub challenge: DailyChallenge,
    /// Registered users who have not submitted yet.
    pub candidates: Vec<LeetCodeProfile>,
}

/// `None` when nothing is posted for `date`.
pub fn plan(db: &Database, date: ChallengeDate) -> Result<Option<VerificationPlan>, LifecycleError> {
    let Some(challenge) = ChallengeRegistry::new(db.conn()).lookup_by_date(date)? else {
        return Ok(None);
    };
    let submitted = SubmissionLedger::new(db.conn()).submitters_on(date)?;
    let candidates = LeetCodeProfiles::new(db.conn())
        .all()?
        .into_iter()
        .filter(|p| !submitted.contains(&p.user_id))
        .collect();
    Ok(Some(VerificationPlan {
        challenge,
        candidates,
    }))
}

/// Candidates whose recent accepted list contains the day's problem.
/// A failed lookup for one user is logged and skipped.
pub async fn find_solvers(
    client: &LeetCodeClient,
    plan: &VerificationPlan,
    offset: FixedOffset,
    recent_limit: u32,
) -> Vec<UserId> {
    let mut solvers = Vec::new();
    for profile in &plan.candidates {
        match client
            .recent_accepted(&profile.leetcode_username, recent_limit)
            .await
        {
            Ok(recent) => {
                if accepted_on(&recent, &plan.challenge.problem, plan.challenge.date, offset) {
                    solvers.push(profile.user_id);
                }
            }
            Err(e) => warn!(
                user_id = profile.user_id,
                leetcode = %profile.leetcode_username,
                error = %e,
                "LeetCode lookup failed"
            ),
        }
    }
    debug!(checked = plan.candidates.len(), solved = solvers.len(), "LeetCode sync round");
    solvers
}

/// Record submissions for `user_ids`; returns the users newly credited.
pub fn credit(
    db: &Database,
    date: ChallengeDate,
    user_ids: &[UserId],
) -> Result<Vec<User>, LifecycleError> {
    let deny_admin = |_: i64| false;
    let lifecycle = LifecycleOrchestrator::new(db, &deny_admin);
    let directory = UserDirectory::new(db.conn());

    let mut credited = Vec::new();
    for &user_id in user_ids {
        if lifecycle.submit(user_id, date)?.outcome.is_created() {
            if let Some(user) = directory.get(user_id)? {
                credited.push(user);
            }
        }
    }
    Ok(credited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn problem(url: &str) -> Problem {
        Problem {
            id: 1,
            title: "Two Sum".into(),
            url: url.into(),
            category: "Arrays".into(),
            used: true,
        }
    }

    fn accepted(title: &str, slug: &str, at: &str) -> AcceptedSubmission {
        AcceptedSubmission {
            title: title.into(),
            title_slug: slug.into(),
            accepted_at: DateTime::parse_from_rfc3339(at).unwrap().with_timezone(&Utc),
        }
    }

    fn plus7() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn slug_comes_from_the_problems_segment() {
        assert_eq!(
            problem_slug("https://leetcode.com/problems/two-sum/").as_deref(),
            Some("two-sum")
        );
        assert_eq!(
            problem_slug("https://leetcode.com/problems/Two-Sum/description/").as_deref(),
            Some("two-sum")
        );
        assert_eq!(problem_slug("https://example.com/two-sum"), None);
        assert_eq!(problem_slug("not a url"), None);
    }

    #[test]
    fn title_fallback_when_url_has_no_slug() {
        let p = problem("https://example.com/x");
        assert!(matches_problem(&accepted("two sum", "other", "2024-01-10T01:00:00Z"), &p));
        assert!(!matches_problem(&accepted("Three Sum", "two-sum", "2024-01-10T01:00:00Z"), &p));
    }

    #[test]
    fn acceptance_date_uses_the_configured_offset() {
        let p = problem("https://leetcode.com/problems/two-sum/");
        let date: ChallengeDate = "2024-01-10".parse().unwrap();
        // 18:30 UTC on the 9th is 01:30 on the 10th at +07:00
        let late = [accepted("Two Sum", "two-sum", "2024-01-09T18:30:00Z")];
        assert!(accepted_on(&late, &p, date, plus7()));
        // 17:30 UTC on the 10th is already the 11th at +07:00
        let next_day = [accepted("Two Sum", "two-sum", "2024-01-10T17:30:00Z")];
        assert!(!accepted_on(&next_day, &p, date, plus7()));
    }
}
