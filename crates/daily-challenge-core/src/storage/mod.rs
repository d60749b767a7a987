mod config;
pub mod database;
pub mod migrations;

pub use config::{
    parse_clock_time, parse_utc_offset, AdminConfig, CatalogConfig, Config, LeaderboardConfig,
    LeetCodeConfig, ScheduleConfig, StorageConfig, TelegramConfig, TOKEN_ENV,
};
pub use database::Database;

use std::path::PathBuf;

/// Returns the data directory.
///
/// `DAILY_CHALLENGE_HOME` wins when set; otherwise `~/.config/daily-challenge[-dev]/`
/// based on `DAILY_CHALLENGE_ENV`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("DAILY_CHALLENGE_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("DAILY_CHALLENGE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("daily-challenge-dev")
            } else {
                base_dir.join("daily-challenge")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
