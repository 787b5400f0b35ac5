use torq_corridors::errors::CorridorError;
use torq_db::errors::DbSqlError;
use torq_lightning_services::errors::ServiceError;
use validator::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum TorqdError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Db(#[from] DbSqlError),

    #[error(transparent)]
    Corridor(#[from] CorridorError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no configuration provided")]
    NoConfiguration,
    #[error("failed to parse config file: {0}")]
    Parse(String),
    #[error("failed to validate config: {0}")]
    Validation(ValidationErrors),
}

pub type Result<T> = std::result::Result<T, TorqdError>;
