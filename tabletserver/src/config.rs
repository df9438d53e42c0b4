//! Tablet configuration module.
//!
//! Loads the keyspace/shard target, session id and result limits from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `TABLET_KEYSPACE`: keyspace this tablet serves (default: `test_keyspace`)
//! - `TABLET_SHARD`: shard this tablet serves (default: `test_shard`)
//! - `TABLET_SESSION_ID`: session id handed out by `GetSessionId` (default: `5678`)
//! - `TABLET_MAX_RESULT_ROWS`: row limit for non-streaming execution (default: `10000`)
//! - `TABLET_STREAM_BATCH_ROWS`: rows per streamed fragment (default: `128`)
//!
//! # Invariants
//!
//! - `keyspace` and `shard` are never empty
//! - `session_id` is always positive
//! - `max_result_rows` and `stream_batch_rows` are always positive

use crate::types::SessionId;

const KEYSPACE_VAR: &str = "TABLET_KEYSPACE";
const SHARD_VAR: &str = "TABLET_SHARD";
const SESSION_ID_VAR: &str = "TABLET_SESSION_ID";
const MAX_RESULT_ROWS_VAR: &str = "TABLET_MAX_RESULT_ROWS";
const STREAM_BATCH_ROWS_VAR: &str = "TABLET_STREAM_BATCH_ROWS";

/// Tablet configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabletConfig {
    /// Keyspace accepted by `GetSessionId`.
    pub keyspace: String,
    /// Shard accepted by `GetSessionId`.
    pub shard: String,
    pub session_id: SessionId,
    /// Results with more rows affected than this fail `Execute`.
    pub max_result_rows: usize,
    /// Maximum rows carried by one streamed fragment.
    pub stream_batch_rows: usize,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for TabletConfig {
    fn default() -> Self {
        Self {
            keyspace: Self::DEFAULT_KEYSPACE.to_string(),
            shard: Self::DEFAULT_SHARD.to_string(),
            session_id: Self::DEFAULT_SESSION_ID,
            max_result_rows: Self::DEFAULT_MAX_RESULT_ROWS,
            stream_batch_rows: Self::DEFAULT_STREAM_BATCH_ROWS,
        }
    }
}

impl TabletConfig {
    pub const DEFAULT_KEYSPACE: &'static str = "test_keyspace";
    pub const DEFAULT_SHARD: &'static str = "test_shard";
    pub const DEFAULT_SESSION_ID: SessionId = SessionId(5678);
    pub const DEFAULT_MAX_RESULT_ROWS: usize = 10_000;
    pub const DEFAULT_STREAM_BATCH_ROWS: usize = 128;

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`from_lookup`](TabletConfig::from_lookup).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from `lookup`, which maps a variable name to its
    /// value. Unset variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `TABLET_KEYSPACE` or `TABLET_SHARD` is set but empty
    /// - `TABLET_SESSION_ID` is set but not a positive integer
    /// - a row count is set but not a positive integer
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let keyspace = load_name(&lookup, KEYSPACE_VAR, Self::DEFAULT_KEYSPACE)?;
        let shard = load_name(&lookup, SHARD_VAR, Self::DEFAULT_SHARD)?;
        let session_id = match lookup(SESSION_ID_VAR) {
            Some(value) => match value.trim().parse::<i64>() {
                Ok(id) if id > 0 => SessionId(id),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: SESSION_ID_VAR.to_string(),
                        message: format!("'{value}' is not a positive integer"),
                    });
                }
            },
            None => Self::DEFAULT_SESSION_ID,
        };
        let max_result_rows =
            load_row_count(&lookup, MAX_RESULT_ROWS_VAR, Self::DEFAULT_MAX_RESULT_ROWS)?;
        let stream_batch_rows =
            load_row_count(&lookup, STREAM_BATCH_ROWS_VAR, Self::DEFAULT_STREAM_BATCH_ROWS)?;

        Ok(Self {
            keyspace,
            shard,
            session_id,
            max_result_rows,
            stream_batch_rows,
        })
    }
}

fn load_name(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
) -> Result<String, ConfigError> {
    match lookup(name) {
        Some(value) if value.is_empty() => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: "must not be empty".to_string(),
        }),
        Some(value) => Ok(value),
        None => Ok(default.to_string()),
    }
}

fn load_row_count(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: usize,
) -> Result<usize, ConfigError> {
    let Some(value) = lookup(name) else {
        return Ok(default);
    };
    match value.trim().parse::<usize>() {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("'{value}' is not a positive integer"),
        }),
    }
}
