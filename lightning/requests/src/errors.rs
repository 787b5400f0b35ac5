use std::time::Duration;

use thiserror::Error;
use torq_db::errors::DbSqlError;
use torq_lightning_rpc::errors::RpcError;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0}")]
    Validation(String),

    #[error("rate limiter: {0}")]
    RateLimited(String),

    #[error("unknown node {0}")]
    UnknownNode(i64),

    #[error("unknown channel {0}")]
    UnknownChannel(i64),

    #[error("{0} is not supported by this node implementation")]
    Unsupported(&'static str),

    #[error("request did not complete within {0:?}")]
    Timeout(Duration),

    #[error("node is busy, no request slot became free within {0:?}")]
    NoPermit(Duration),

    #[error("request router is not running")]
    RouterClosed,

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("database error: {0}")]
    Db(#[from] DbSqlError),
}

pub type Result<T> = std::result::Result<T, RequestError>;
