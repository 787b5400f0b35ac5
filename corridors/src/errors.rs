use thiserror::Error;
use torq_db::errors::DbSqlError;

#[derive(Debug, Error)]
pub enum CorridorError {
    #[error("database error: {0}")]
    Db(#[from] DbSqlError),

    #[error("unknown {0}")]
    NotFound(String),

    #[error("invalid tag target: {0}")]
    InvalidTarget(String),
}

pub type Result<T> = std::result::Result<T, CorridorError>;
