use sea_orm::DbErr;
use thiserror::Error;
use torq_db_entity::errors::DbEntityError;
use torq_types::errors::TypesError;

#[derive(Debug, Error)]
pub enum DbSqlError {
    #[error("failed to construct the database: {0}")]
    Construction(String),

    #[error("entry not found: {0}")]
    MissingEntry(String),

    #[error("logical error: {0}")]
    LogicalError(String),

    #[error("integer value out of range: {0}")]
    OutOfRange(#[from] std::num::TryFromIntError),

    #[error(transparent)]
    BackendError(#[from] DbErr),

    #[error(transparent)]
    EntityError(#[from] DbEntityError),

    #[error(transparent)]
    TypesError(#[from] TypesError),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbSqlError>;
