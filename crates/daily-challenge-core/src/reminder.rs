//! Non-responder computation and reminder tone.
//!
//! The two are independent: the set of users to nudge depends only on the
//! roster and the ledger, the tone only on the wall-clock hour.

use std::collections::HashSet;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::date::ChallengeDate;
use crate::error::DatabaseError;
use crate::ledger::SubmissionLedger;
use crate::models::{User, UserId};

/// Roster members absent from `submitted`, in roster order.
pub fn non_responders(roster: &[User], submitted: &HashSet<UserId>) -> Vec<User> {
    roster
        .iter()
        .filter(|user| !submitted.contains(&user.id))
        .cloned()
        .collect()
}

pub struct ReminderEngine<'a> {
    conn: &'a Connection,
}

impl<'a> ReminderEngine<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn non_responders(
        &self,
        date: ChallengeDate,
        roster: &[User],
    ) -> Result<Vec<User>, DatabaseError> {
        let submitted = SubmissionLedger::new(self.conn).submitters_on(date)?;
        Ok(non_responders(roster, &submitted))
    }
}

/// Reminder checkpoint, used only to pick the wording of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    Afternoon,
    Evening,
}

impl Checkpoint {
    /// The afternoon checkpoint fires at `afternoon_hour`; any other hour reads as evening.
    pub fn for_hour(hour: u32, afternoon_hour: u32) -> Self {
        if hour == afternoon_hour {
            Checkpoint::Afternoon
        } else {
            Checkpoint::Evening
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Checkpoint::Afternoon => "Afternoon",
            Checkpoint::Evening => "Evening",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Checkpoint::Afternoon => "⏰",
            Checkpoint::Evening => "🌙",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crate::users::UserDirectory;

    fn date(s: &str) -> ChallengeDate {
        s.parse().unwrap()
    }

    #[test]
    fn pure_set_difference_keeps_roster_order() {
        let roster = vec![User::new(3, "C"), User::new(1, "A"), User::new(2, "B")];
        let submitted = HashSet::from([1]);
        let ids: Vec<UserId> = non_responders(&roster, &submitted).iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn everyone_submitted_gives_empty_set() {
        let roster = vec![User::new(1, "A")];
        assert!(non_responders(&roster, &HashSet::from([1])).is_empty());
        assert!(non_responders(&[], &HashSet::new()).is_empty());
    }

    #[test]
    fn engine_reads_the_ledger_for_the_date() {
        let db = Database::open_memory().unwrap();
        let users = UserDirectory::new(db.conn());
        for (id, name) in [(1, "U1"), (2, "U2"), (3, "U3")] {
            users.upsert(&User::new(id, name)).unwrap();
        }
        let ledger = SubmissionLedger::new(db.conn());
        ledger.record(1, 1, date("2024-01-10")).unwrap();
        ledger.record(2, 1, date("2024-01-09")).unwrap();

        let roster = users.roster().unwrap();
        let pending = ReminderEngine::new(db.conn())
            .non_responders(date("2024-01-10"), &roster)
            .unwrap();
        let ids: Vec<UserId> = pending.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn checkpoint_depends_only_on_hour() {
        assert_eq!(Checkpoint::for_hour(15, 15), Checkpoint::Afternoon);
        assert_eq!(Checkpoint::for_hour(22, 15), Checkpoint::Evening);
        assert_eq!(Checkpoint::for_hour(9, 15), Checkpoint::Evening);
        assert_eq!(Checkpoint::Afternoon.label(), "Afternoon");
    }
}
