use thiserror::Error;
use torq_types::errors::TypesError;

#[derive(Debug, Error)]
pub enum DbEntityError {
    #[error("conversion error: {0}")]
    Conversion(String),

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error("malformed json column: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbEntityError>;
