use thiserror::Error;

use crate::habit::HabitId;

/// A snapshot file that cannot be turned into habits.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid `{field}` for habit {id}: {reason}")]
    InvalidField {
        id: HabitId,
        field: &'static str,
        reason: String,
    },
}

/// The storage collaborator refused or failed to commit pending changes.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("commit rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum HabitError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("habit not found: {0}")]
    NotFound(HabitId),

    #[error("validation error: {0}")]
    Validation(String),
}

pub type HabitResult<T> = Result<T, HabitError>;
