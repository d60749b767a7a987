//! Leaderboard ranking over the roster and the submission ledger.

use std::cmp::Reverse;
use std::collections::HashMap;

use rusqlite::Connection;

use crate::error::DatabaseError;
use crate::ledger::SubmissionLedger;
use crate::models::{LeaderboardEntry, User, UserId};
use crate::users::UserDirectory;

/// Rank `users` by solved count (descending), then first name, then id.
///
/// Users missing from `counts` rank with zero. One pass over the users plus
/// the sort; the counts map comes from a single grouped query.
pub fn rank_entries(
    users: Vec<User>,
    counts: &HashMap<UserId, u64>,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = users
        .into_iter()
        .map(|user| LeaderboardEntry {
            total_solved: counts.get(&user.id).copied().unwrap_or(0),
            user,
        })
        .collect();

    entries.sort_by(|a, b| {
        (Reverse(a.total_solved), &a.user.first_name, a.user.id).cmp(&(
            Reverse(b.total_solved),
            &b.user.first_name,
            b.user.id,
        ))
    });
    entries.truncate(limit);
    entries
}

pub struct LeaderboardRanker<'a> {
    conn: &'a Connection,
}

impl<'a> LeaderboardRanker<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn rank(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, DatabaseError> {
        let users = UserDirectory::new(self.conn).roster()?;
        let counts = SubmissionLedger::new(self.conn).count_by_user()?;
        Ok(rank_entries(users, &counts, limit))
    }
}
