//! Core error types for daily-challenge-core.
//!
//! The lifecycle taxonomy lives in [`LifecycleError`]; storage, configuration
//! and integration failures have their own enums and fold into [`CoreError`].

use std::path::PathBuf;
use thiserror::Error;

use crate::date::ChallengeDate;

/// Core error type for daily-challenge-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Challenge lifecycle errors
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Telegram / LeetCode failures
    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),

    /// Problem catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Malformed user input such as a date argument
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A UNIQUE constraint rejected the write
    #[error("Duplicate value: {0}")]
    Duplicate(String),

    /// Database is locked or busy past the busy timeout
    #[error("Database is locked")]
    Locked,
}

impl DatabaseError {
    /// Whether retrying the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DatabaseError::Locked)
    }
}

/// Errors surfaced by the challenge lifecycle operations.
///
/// A duplicate submission is not an error; it is reported as
/// [`RecordOutcome::AlreadyExists`](crate::models::RecordOutcome).
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Every problem in the pool has been used.
    #[error("no unused problems remain in the pool")]
    PoolExhausted,

    /// Submit or reminder attempted before a challenge was posted for the date.
    #[error("no challenge has been posted for {date}")]
    NoChallengeToday { date: ChallengeDate },

    /// Administrative operation from a non-designated origin.
    #[error("origin {origin} is not authorized for this operation")]
    Unauthorized { origin: i64 },

    /// The durable store could not complete the operation.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] DatabaseError),
}

impl LifecycleError {
    /// Whether the caller may retry the whole logical operation.
    pub fn is_transient(&self) -> bool {
        match self {
            LifecycleError::StoreUnavailable(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Failures talking to Telegram or LeetCode.
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("HTTP request to {service} failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} rejected the request: {message}")]
    Api {
        service: &'static str,
        message: String,
    },

    #[error("unexpected {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

/// Problem catalog errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
                    DatabaseError::Duplicate(err.to_string())
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for LifecycleError {
    fn from(err: rusqlite::Error) -> Self {
        LifecycleError::StoreUnavailable(err.into())
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        CatalogError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
