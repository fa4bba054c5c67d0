// Error kinds surfaced by the gang registry, duel ledger and scoreboard.

use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a [`ScoreError`], used by callers that map
/// failures onto HTTP statuses or reply text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Conflict,
    NotFound,
    Forbidden,
    TransientTransport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::TransientTransport => "transient_transport",
        }
    }
}

#[derive(Debug, Error)]
pub enum ScoreError {
    /// Empty name, negative score, self-duel and similar.
    #[error("{message}")]
    InvalidInput { field: &'static str, message: String },

    /// Duplicate gang name or an exhausted limit.
    #[error("{message}")]
    Conflict { field: &'static str, message: String },

    /// Unknown gang or duel, or a scoreboard message that no longer resolves.
    #[error("{message}")]
    NotFound { field: &'static str, message: String },

    #[error("{0}")]
    Forbidden(String),

    /// Network failure talking to the chat API, or storage unavailable.
    #[error("{0}")]
    TransientTransport(String),
}

impl ScoreError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ScoreError::InvalidInput {
            field,
            message: message.into(),
        }
    }

    pub fn conflict(field: &'static str, message: impl Into<String>) -> Self {
        ScoreError::Conflict {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(field: &'static str, message: impl Into<String>) -> Self {
        ScoreError::NotFound {
            field,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoreError::InvalidInput { .. } => ErrorKind::InvalidInput,
            ScoreError::Conflict { .. } => ErrorKind::Conflict,
            ScoreError::NotFound { .. } => ErrorKind::NotFound,
            ScoreError::Forbidden(_) => ErrorKind::Forbidden,
            ScoreError::TransientTransport(_) => ErrorKind::TransientTransport,
        }
    }

    /// The offending field, when the error names one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ScoreError::InvalidInput { field, .. }
            | ScoreError::Conflict { field, .. }
            | ScoreError::NotFound { field, .. } => Some(field),
            ScoreError::Forbidden(_) | ScoreError::TransientTransport(_) => None,
        }
    }
}

impl From<sqlx::Error> for ScoreError {
    fn from(e: sqlx::Error) -> Self {
        ScoreError::TransientTransport(format!("Storage unavailable: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, ScoreError>;

/// Whether a storage error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Whether a storage error is a FOREIGN KEY constraint violation.
pub(crate) fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}
