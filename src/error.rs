// Error taxonomy for the data layer
// Every failure maps to a stable ErrorKind plus a human-readable message

use crate::entities::favorite::TargetKind;
use thiserror::Error;

/// Stable error kinds exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or empty required field
    Validation,
    /// Entity, user, target or favorite absent
    NotFound,
    /// Duplicate email, duplicate favorite, or target still referenced
    Conflict,
    /// Commit/transaction failure in the backing store
    StorageFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::StorageFailure => "storage_failure",
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("User with id {0} not found")]
    UserNotFound(i64),

    #[error("{kind} with id {id} not found")]
    TargetNotFound { kind: TargetKind, id: i64 },

    #[error("{kind} {id} is not a favorite of user {user_id}")]
    FavoriteNotFound {
        user_id: i64,
        kind: TargetKind,
        id: i64,
    },

    #[error("Duplicate key: {message}")]
    DuplicateKey { message: String },

    #[error("{kind} {id} is already a favorite of user {user_id}")]
    AlreadyFavorited {
        user_id: i64,
        kind: TargetKind,
        id: i64,
    },

    #[error("{kind} {id} is still referenced by {favorites} favorite(s)")]
    TargetInUse {
        kind: TargetKind,
        id: i64,
        favorites: i64,
    },

    #[error("Storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Storage failure: store session poisoned by a panicked request")]
    SessionPoisoned,
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation { .. } => ErrorKind::Validation,
            StoreError::NotFound { .. }
            | StoreError::UserNotFound(_)
            | StoreError::TargetNotFound { .. }
            | StoreError::FavoriteNotFound { .. } => ErrorKind::NotFound,
            StoreError::DuplicateKey { .. }
            | StoreError::AlreadyFavorited { .. }
            | StoreError::TargetInUse { .. } => ErrorKind::Conflict,
            StoreError::Storage(_) | StoreError::SessionPoisoned => ErrorKind::StorageFailure,
        }
    }

    /// Underlying storage cause, the only internal detail ever exposed
    pub fn cause(&self) -> Option<String> {
        match self {
            StoreError::Storage(e) => Some(e.to_string()),
            _ => None,
        }
    }

    /// True when the error is a SQLite constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StoreError::Storage(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
