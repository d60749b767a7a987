//! Chat command handling.
//!
//! [`CommandHandler::handle`] does all database work synchronously and
//! returns the messages to send. Errors are turned into reply text here;
//! nothing propagates back to the polling loop.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use tracing::{error, info, warn};

use crate::counter::FIRST_DAY;
use crate::date::ChallengeDate;
use crate::error::{ConfigError, DatabaseError, LifecycleError};
use crate::lifecycle::{Authorizer, LifecycleOrchestrator, PostOutcome};
use crate::messages;
use crate::models::{RecordOutcome, User};
use crate::reminder::Checkpoint;
use crate::storage::{parse_clock_time, Config, Database};
use crate::users::{LeetCodeProfiles, UserDirectory};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit,
    Leaderboard,
    Status,
    Help,
    Manual,
    TestReminder,
    ResetDay,
    Register(Option<String>),
    Unknown(String),
}

impl Command {
    /// `None` for text that is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        // `/submit@SomeBot` in groups
        let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
        if name.is_empty() {
            return None;
        }

        Some(match name.as_str() {
            "submit" => Command::Submit,
            "leaderboards" | "leaderboard" => Command::Leaderboard,
            "status" => Command::Status,
            "help" | "start" => Command::Help,
            "manual" => Command::Manual,
            "testreminder" => Command::TestReminder,
            "resetday" => Command::ResetDay,
            "register" => Command::Register(
                args.split_whitespace().next().map(str::to_string),
            ),
            _ => Command::Unknown(name),
        })
    }
}

/// A message received from a chat.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub sender: User,
    pub chat_id: i64,
    pub text: String,
}

/// A message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub chat_id: i64,
    pub text: String,
}

impl Reply {
    fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
        }
    }
}

/// Settings the handler needs from [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct CommandContext {
    pub group_id: i64,
    pub offset: FixedOffset,
    pub afternoon_hour: u32,
    pub leaderboard_limit: usize,
}

impl CommandContext {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let afternoon = parse_clock_time(
            "schedule.afternoon_reminder_at",
            &config.schedule.afternoon_reminder_at,
        )?;
        Ok(Self {
            group_id: config.telegram.group_id,
            offset: config.utc_offset()?,
            afternoon_hour: afternoon.hour(),
            leaderboard_limit: config.leaderboard.limit,
        })
    }
}

fn valid_leetcode_username(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 40
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

pub struct CommandHandler<'a> {
    db: &'a Database,
    authorizer: &'a dyn Authorizer,
    ctx: CommandContext,
}

impl<'a> CommandHandler<'a> {
    pub fn new(db: &'a Database, authorizer: &'a dyn Authorizer, ctx: CommandContext) -> Self {
        Self {
            db,
            authorizer,
            ctx,
        }
    }

    /// Handle one inbound message received at `now`.
    pub fn handle(&self, inbound: &Inbound, now: DateTime<Utc>) -> Vec<Reply> {
        if let Err(e) = UserDirectory::new(self.db.conn()).upsert(&inbound.sender) {
            warn!(user_id = inbound.sender.id, error = %e, "failed to save user");
        }

        let Some(command) = Command::parse(&inbound.text) else {
            return Vec::new();
        };
        let local = now.with_timezone(&self.ctx.offset);
        let date = ChallengeDate::of(&local);
        let lifecycle = LifecycleOrchestrator::new(self.db, self.authorizer);
        let chat = inbound.chat_id;

        match command {
            Command::Submit => vec![self.submit(&lifecycle, inbound.sender.id, date, chat)],
            Command::Leaderboard => match lifecycle.leaderboard(self.ctx.leaderboard_limit) {
                Ok(entries) => vec![Reply::new(chat, messages::leaderboard(&entries))],
                Err(e) => vec![self.store_error(chat, &e)],
            },
            Command::Status => match lifecycle.status(date) {
                Ok(report) => vec![Reply::new(chat, messages::status(&report))],
                Err(e) => vec![self.store_error(chat, &e)],
            },
            Command::Help => vec![Reply::new(chat, messages::HELP)],
            Command::Manual => {
                let origin = self.admin_origin(inbound);
                match lifecycle.post_manual(origin, date) {
                    Ok(PostOutcome::Posted(challenge)) => vec![
                        Reply::new(self.group_or(chat), messages::announcement(&challenge)),
                        Reply::new(chat, "✅ Manual challenge posted successfully!"),
                    ],
                    Ok(PostOutcome::AlreadyPosted(challenge)) => vec![Reply::new(
                        chat,
                        format!(
                            "ℹ️ Today's challenge is already posted (Day {}).",
                            challenge.day_number
                        ),
                    )],
                    Err(e) => vec![self.lifecycle_error(chat, &e)],
                }
            }
            Command::TestReminder => {
                let origin = self.admin_origin(inbound);
                if let Err(e) = lifecycle.authorize(origin) {
                    return vec![self.lifecycle_error(chat, &e)];
                }
                match lifecycle.compute_reminder_targets(date) {
                    Ok(targets) if targets.non_responders.is_empty() => {
                        vec![Reply::new(chat, "🎉 Everyone has submitted today!")]
                    }
                    Ok(targets) => {
                        let checkpoint =
                            Checkpoint::for_hour(local.hour(), self.ctx.afternoon_hour);
                        vec![
                            Reply::new(
                                self.group_or(chat),
                                messages::reminder(
                                    checkpoint,
                                    &targets.challenge,
                                    &targets.non_responders,
                                ),
                            ),
                            Reply::new(chat, "✅ Test reminder sent successfully!"),
                        ]
                    }
                    Err(e) => vec![self.lifecycle_error(chat, &e)],
                }
            }
            Command::ResetDay => {
                let origin = self.admin_origin(inbound);
                match lifecycle.reset_cycle(origin) {
                    Ok(()) => vec![Reply::new(chat, messages::reset_done(FIRST_DAY))],
                    Err(e) => vec![self.lifecycle_error(chat, &e)],
                }
            }
            Command::Register(None) => vec![Reply::new(chat, messages::REGISTER_USAGE)],
            Command::Register(Some(name)) => vec![self.register(inbound.sender.id, &name, chat)],
            Command::Unknown(name) => {
                info!(command = %name, "unknown command");
                vec![Reply::new(chat, messages::UNKNOWN_COMMAND)]
            }
        }
    }

    fn submit(
        &self,
        lifecycle: &LifecycleOrchestrator<'_>,
        user_id: i64,
        date: ChallengeDate,
        chat: i64,
    ) -> Reply {
        match lifecycle.submit(user_id, date) {
            Ok(outcome) => match outcome.outcome {
                RecordOutcome::Created => {
                    Reply::new(chat, messages::submit_confirmation(&outcome.challenge))
                }
                RecordOutcome::AlreadyExists => Reply::new(chat, messages::ALREADY_SUBMITTED),
            },
            Err(e) => self.lifecycle_error(chat, &e),
        }
    }

    fn register(&self, user_id: i64, name: &str, chat: i64) -> Reply {
        if !valid_leetcode_username(name) {
            return Reply::new(chat, messages::REGISTER_USAGE);
        }
        let profiles = LeetCodeProfiles::new(self.db.conn());
        match profiles.register(user_id, name) {
            Ok(()) => Reply::new(chat, messages::registered(name)),
            Err(DatabaseError::Duplicate(_)) => Reply::new(
                chat,
                "❌ That LeetCode username is already linked to another member.",
            ),
            Err(e) => self.store_error(chat, &e),
        }
    }

    /// The chat when it is a designated origin, otherwise the sender.
    fn admin_origin(&self, inbound: &Inbound) -> i64 {
        if self.authorizer.is_authorized(inbound.chat_id) {
            inbound.chat_id
        } else {
            inbound.sender.id
        }
    }

    fn group_or(&self, chat: i64) -> i64 {
        if self.ctx.group_id != 0 {
            self.ctx.group_id
        } else {
            chat
        }
    }

    fn lifecycle_error(&self, chat: i64, err: &LifecycleError) -> Reply {
        match err {
            LifecycleError::NoChallengeToday { .. } => Reply::new(chat, messages::NO_CHALLENGE),
            LifecycleError::Unauthorized { .. } => Reply::new(chat, messages::ADMIN_ONLY),
            LifecycleError::PoolExhausted => Reply::new(
                chat,
                "❌ The problem pool is exhausted. Import more problems to continue.",
            ),
            LifecycleError::StoreUnavailable(e) => self.store_error(chat, e),
        }
    }

    fn store_error(&self, chat: i64, err: &dyn std::error::Error) -> Reply {
        error!(error = %err, "command failed on storage");
        Reply::new(chat, messages::STORE_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_bot_suffix_and_args() {
        assert_eq!(Command::parse("/submit"), Some(Command::Submit));
        assert_eq!(Command::parse("/Submit@LeetBot"), Some(Command::Submit));
        assert_eq!(Command::parse("/leaderboard"), Some(Command::Leaderboard));
        assert_eq!(
            Command::parse("/register  ada_lc extra"),
            Some(Command::Register(Some("ada_lc".into())))
        );
        assert_eq!(Command::parse("/register"), Some(Command::Register(None)));
        assert_eq!(Command::parse("/dance"), Some(Command::Unknown("dance".into())));
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(Command::parse("hello /submit"), None);
        assert_eq!(Command::parse("/"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn leetcode_username_validation() {
        assert!(valid_leetcode_username("ada_lc-1"));
        assert!(!valid_leetcode_username("ada lc"));
        assert!(!valid_leetcode_username("ada\"}"));
        assert!(!valid_leetcode_username(""));
    }
}
