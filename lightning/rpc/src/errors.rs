use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("no connection details known for node {0}")]
    MissingConnectionDetails(i64),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("rpc failed with {}: {}", .0.code(), .0.message())]
    Status(#[from] tonic::Status),

    #[error("no answer within {0:?}")]
    Timeout(Duration),

    #[error("stream closed by the node")]
    StreamEnded,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// Error text as reported by the backing node, used to detect idempotent failures.
    pub fn node_message(&self) -> String {
        match self {
            RpcError::Status(status) => status.message().to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RpcError::Status(status) if status.code() == tonic::Code::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
