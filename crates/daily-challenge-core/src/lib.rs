//! # Daily Challenge Core Library
//!
//! Core logic for a group coding-challenge bot: one problem is posted per
//! calendar day, members report completion, and the bot reminds whoever has
//! not submitted yet and keeps a leaderboard. The `daily-challenge` CLI and
//! the Telegram daemon are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Components**: [`ProblemPool`], [`DayCounter`], [`SubmissionLedger`],
//!   [`ChallengeRegistry`], [`ReminderEngine`] and [`LeaderboardRanker`] each
//!   own one table and borrow a connection (or an open transaction)
//! - **Lifecycle**: [`LifecycleOrchestrator`] composes them into the
//!   post / submit / remind / reset operations
//! - **Storage**: SQLite with versioned migrations and TOML configuration
//! - **Integrations**: Telegram Bot API and the LeetCode GraphQL endpoint
//!
//! Notification is never part of a state transition: every operation commits
//! first and callers send messages afterwards.

pub mod catalog;
pub mod commands;
pub mod counter;
pub mod date;
pub mod error;
pub mod integrations;
pub mod leaderboard;
pub mod ledger;
pub mod lifecycle;
pub mod messages;
pub mod models;
pub mod notify;
pub mod pool;
pub mod registry;
pub mod reminder;
pub mod storage;
pub mod trigger;
pub mod users;
pub mod verify;

pub use catalog::{Catalog, CatalogEntry, ImportSummary};
pub use commands::{Command, CommandContext, CommandHandler, Inbound, Reply};
pub use counter::{DayCounter, FIRST_DAY};
pub use date::ChallengeDate;
pub use error::{
    CatalogError, ConfigError, CoreError, DatabaseError, IntegrationError, LifecycleError,
    ValidationError,
};
pub use leaderboard::LeaderboardRanker;
pub use ledger::SubmissionLedger;
pub use lifecycle::{
    AdminOrigins, Authorizer, LifecycleOrchestrator, PostOutcome, ReminderTargets, StatusReport,
    SubmitOutcome,
};
pub use models::{DailyChallenge, LeaderboardEntry, Problem, RecordOutcome, Submission, User};
pub use notify::{notify_best_effort, Notifier};
pub use pool::{PoolCounts, ProblemPool};
pub use registry::ChallengeRegistry;
pub use reminder::{Checkpoint, ReminderEngine};
pub use storage::{Config, Database};
pub use trigger::{Trigger, TriggerSchedule};
pub use users::{LeetCodeProfile, LeetCodeProfiles, UserDirectory};
