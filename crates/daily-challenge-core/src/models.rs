//! Records shared across the lifecycle components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::date::ChallengeDate;

pub type ProblemId = i64;

/// External platform id (Telegram user id).
pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: ProblemId,
    pub title: String,
    pub url: String,
    pub category: String,
    pub used: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: UserId, first_name: impl Into<String>) -> Self {
        Self {
            id,
            username: None,
            first_name: first_name.into(),
            last_name: String::new(),
            created_at: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        let username = username.into();
        self.username = (!username.is_empty()).then_some(username);
        self
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = last_name.into();
        self
    }

    /// "First Last (@handle)" with the empty parts left out.
    pub fn display_name(&self) -> String {
        let mut name = self.first_name.clone();
        if !self.last_name.is_empty() {
            name.push(' ');
            name.push_str(&self.last_name);
        }
        if let Some(handle) = &self.username {
            name.push_str(&format!(" (@{handle})"));
        }
        name
    }

    /// How the user is addressed in a group reminder.
    pub fn mention(&self) -> String {
        match &self.username {
            Some(handle) => format!("@{handle}"),
            None => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub user_id: UserId,
    pub problem_id: ProblemId,
    pub date: ChallengeDate,
    pub submitted_at: DateTime<Utc>,
}

/// The challenge registered for one calendar date, joined with its problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyChallenge {
    pub date: ChallengeDate,
    pub day_number: i64,
    pub posted_at: DateTime<Utc>,
    pub problem: Problem,
}

/// Result of an insert-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    Created,
    AlreadyExists,
}

impl RecordOutcome {
    pub fn is_created(self) -> bool {
        self == RecordOutcome::Created
    }

    pub(crate) fn from_changes(changes: usize) -> Self {
        if changes > 0 {
            RecordOutcome::Created
        } else {
            RecordOutcome::AlreadyExists
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user: User,
    pub total_solved: u64,
}
