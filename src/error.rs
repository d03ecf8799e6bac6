use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::id::ExternalId;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Coarse classification of a [`FetchError`], used in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    RateLimited,
    Unavailable,
    ExhaustedRetries,
    Decode,
}

/// Upstream market-data failures.
///
/// `Transport` and `RateLimited` describe a single attempt and are retried;
/// callers of the client only ever see `Unavailable`, `ExhaustedRetries` or
/// `Decode`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited by upstream")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("upstream unavailable: HTTP {status} after {attempts} attempts")]
    Unavailable { status: u16, attempts: u32 },

    #[error("gave up after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: String },

    #[error("malformed upstream response: {0}")]
    Decode(String),
}

impl FetchError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) => FailureKind::Transport,
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::Unavailable { .. } => FailureKind::Unavailable,
            Self::ExhaustedRetries { .. } => FailureKind::ExhaustedRetries,
            Self::Decode(_) => FailureKind::Decode,
        }
    }
}

/// Errors that end a sync cycle.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The snapshot fetch failed; nothing was written this cycle.
    #[error("snapshot fetch failed, cycle aborted: {0}")]
    UpstreamUnavailable(#[source] FetchError),

    #[error("a sync cycle is already running")]
    AlreadyRunning,

    #[error("upstream does not know asset '{0}'")]
    UnknownAsset(ExternalId),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Error::ConstraintViolation(info.message().to_string())
            }
            other => Error::Database(other.to_string()),
        }
    }
}
