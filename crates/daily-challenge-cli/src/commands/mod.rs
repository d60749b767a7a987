pub mod challenge;
pub mod config;
pub mod problems;
pub mod run;
pub mod user;

use std::path::{Path, PathBuf};

use daily_challenge_core::storage::data_dir;
use daily_challenge_core::error::Result;
use daily_challenge_core::{ChallengeDate, Config, Database};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Origin id used for administrative operations run from the CLI.
pub const OPERATOR: i64 = 0;

/// Anyone with shell access to the data directory is an operator.
pub fn operator(_origin: i64) -> bool {
    true
}

pub fn load() -> Result<(Config, Database)> {
    let config = Config::load()?;
    let db = Database::open(&config.storage)?;
    Ok((config, db))
}

/// `--date` if given, otherwise today in the configured offset.
pub fn resolve_date(
    arg: Option<&str>,
    config: &Config,
) -> Result<ChallengeDate> {
    match arg {
        Some(raw) => Ok(raw.parse()?),
        None => Ok(ChallengeDate::today_in(config.utc_offset()?)),
    }
}

/// Relative catalog paths are looked up in the working directory first,
/// then in the data directory.
pub fn catalog_path(path: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }
    data_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
