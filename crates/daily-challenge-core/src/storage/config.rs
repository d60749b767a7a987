//! TOML-based bot configuration.
//!
//! Stored at `<data_dir>/config.toml` and created with defaults on first load.
//! The Telegram bot token is deliberately not part of the file; it is read
//! from `TELEGRAM_BOT_TOKEN`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;

pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Group chat that receives announcements and reminders.
    #[serde(default)]
    pub group_id: i64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Defaults to `<data_dir>/daily_challenge.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_problems_file")]
    pub problems_file: PathBuf,
    #[serde(default = "default_true")]
    pub import_on_start: bool,
}

/// Fixed trigger times, interpreted in `utc_offset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    #[serde(default = "default_post_at")]
    pub post_at: String,
    #[serde(default = "default_afternoon_at")]
    pub afternoon_reminder_at: String,
    #[serde(default = "default_evening_at")]
    pub evening_reminder_at: String,
    #[serde(default = "default_true")]
    pub weekdays_only: bool,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_min: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Origins (user or chat ids) allowed to run administrative commands,
    /// in addition to the group itself.
    #[serde(default)]
    pub origins: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    #[serde(default = "default_leaderboard_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeetCodeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: u32,
}

/// Bot configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
    #[serde(default)]
    pub leetcode: LeetCodeConfig,
}

fn default_api_base() -> String {
    "https://api.telegram.org".into()
}
fn default_poll_timeout() -> u64 {
    60
}
fn default_busy_timeout() -> u64 {
    5000
}
fn default_problems_file() -> PathBuf {
    PathBuf::from("problem_deduplicated.yaml")
}
fn default_true() -> bool {
    true
}
fn default_utc_offset() -> String {
    "+07:00".into()
}
fn default_post_at() -> String {
    "07:00".into()
}
fn default_afternoon_at() -> String {
    "15:00".into()
}
fn default_evening_at() -> String {
    "22:00".into()
}
fn default_sync_interval() -> u64 {
    5
}
fn default_leaderboard_limit() -> usize {
    10
}
fn default_graphql_url() -> String {
    "https://leetcode.com/graphql".into()
}
fn default_recent_limit() -> u32 {
    15
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            group_id: 0,
            api_base: default_api_base(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            problems_file: default_problems_file(),
            import_on_start: true,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
            post_at: default_post_at(),
            afternoon_reminder_at: default_afternoon_at(),
            evening_reminder_at: default_evening_at(),
            weekdays_only: true,
            sync_interval_min: default_sync_interval(),
        }
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            limit: default_leaderboard_limit(),
        }
    }
}

impl Default for LeetCodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            graphql_url: default_graphql_url(),
            recent_limit: default_recent_limit(),
        }
    }
}

/// Parse `HH:MM`.
pub fn parse_clock_time(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{value}' is not an HH:MM time: {e}"),
    })
}

/// Parse `+HH:MM` / `-HH:MM` (or `Z`).
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: "schedule.utc_offset".into(),
        message,
    };
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| invalid("zero offset".into()));
    }

    let (sign, rest) = if let Some(rest) = value.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = value.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid(format!("'{value}' must start with + or -")));
    };
    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| invalid(format!("'{value}' must look like +HH:MM")))?;
    let hours: i32 = hours
        .parse()
        .map_err(|_| invalid(format!("bad hours in '{value}'")))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| invalid(format!("bad minutes in '{value}'")))?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid(format!("'{value}' is out of range")));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| invalid(format!("'{value}' is out of range")))
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent_path, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut parent = root;
        if let Some(path) = parent_path {
            for part in path.split('.') {
                parent = parent.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let obj = parent.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|e| invalid(format!("'{value}': {e}")))?,
            ),
            serde_json::Value::Number(_) => {
                let n = value
                    .parse::<i64>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                serde_json::Value::Number(n.into())
            }
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
            }
            serde_json::Value::Null if value.is_empty() => serde_json::Value::Null,
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("."),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing,
    /// then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = Self::load_from(&Self::path()?)?;
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path` without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Environment overrides kept from the original deployment:
    /// `TELEGRAM_GROUP_ID`, `DATABASE_PATH`, `PROBLEMS_FILE_PATH`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(group) = lookup("TELEGRAM_GROUP_ID").and_then(|v| v.trim().parse().ok()) {
            self.telegram.group_id = group;
        }
        if let Some(path) = lookup("DATABASE_PATH").filter(|v| !v.is_empty()) {
            self.storage.database_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("PROBLEMS_FILE_PATH").filter(|v| !v.is_empty()) {
            self.catalog.problems_file = PathBuf::from(path);
        }
    }

    /// Check the values that are parsed lazily elsewhere.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_utc_offset(&self.schedule.utc_offset)?;
        parse_clock_time("schedule.post_at", &self.schedule.post_at)?;
        parse_clock_time(
            "schedule.afternoon_reminder_at",
            &self.schedule.afternoon_reminder_at,
        )?;
        parse_clock_time(
            "schedule.evening_reminder_at",
            &self.schedule.evening_reminder_at,
        )?;
        if self.schedule.sync_interval_min == 0 {
            return Err(ConfigError::InvalidValue {
                key: "schedule.sync_interval_min".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        parse_utc_offset(&self.schedule.utc_offset)
    }

    /// Origins allowed to run administrative commands: the group plus `admin.origins`.
    pub fn admin_origins(&self) -> BTreeSet<i64> {
        let mut origins: BTreeSet<i64> = self.admin.origins.iter().copied().collect();
        if self.telegram.group_id != 0 {
            origins.insert(self.telegram.group_id);
        }
        origins
    }

    /// The bot token from `TELEGRAM_BOT_TOKEN`.
    pub fn bot_token() -> Result<String, ConfigError> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingKey(TOKEN_ENV.into()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key. The change is validated but not persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}
