use thiserror::Error;
use torq_db::errors::DbSqlError;
use torq_lightning_requests::errors::RequestError;
use torq_lightning_rpc::errors::RpcError;
use torq_types::errors::TypesError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("supervisor is already restarting")]
    AlreadyRestarting,

    #[error("supervisor is not running")]
    SupervisorClosed,

    #[error("stream of {0} ended")]
    StreamEnded(&'static str),

    #[error("invalid data from node: {0}")]
    InvalidData(String),

    #[error("block explorer: {0}")]
    Explorer(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error("database error: {0}")]
    Db(#[from] DbSqlError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
