//! Error taxonomy for the notas service.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotasError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("person {0} is already registered")]
    DuplicatePerson(String),

    #[error("ticket {0} was already submitted")]
    DuplicateTicket(String),

    #[error("agent {0} does not exist")]
    UnknownAgent(String),

    #[error("score {0} is outside 0..=10")]
    InvalidScore(i64),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("query rejected: {0}")]
    QueryRejected(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NotasResult<T> = Result<T, NotasError>;

/// Extended SQLite result code when `err` is a constraint violation.
pub(crate) fn constraint_violation(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    }
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        constraint_violation(err),
        Some(rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY) | Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
    )
}

pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    constraint_violation(err) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}

pub(crate) fn is_check_violation(err: &rusqlite::Error) -> bool {
    constraint_violation(err) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_CHECK)
}
