use seedbank_common::InvalidTransition;
use seedbank_db::DbError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Insufficient balance: {required} seeds required, {available} available")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(#[from] InvalidTransition),

    #[error("Database error: {0}")]
    Database(DbError),
}

impl EngineError {
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        EngineError::NotFound(format!("{} {} not found", kind, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => EngineError::NotFound(what),
            other => EngineError::Database(other),
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Database(DbError::Sqlx(err))
    }
}

impl From<seedbank_common::Error> for EngineError {
    fn from(err: seedbank_common::Error) -> Self {
        EngineError::Validation(err.to_string())
    }
}
