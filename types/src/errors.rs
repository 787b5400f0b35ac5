use thiserror::Error;

/// Errors raised while decoding or validating data model values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid channel point: {0}")]
    InvalidChannelPoint(String),

    #[error("invalid short channel id: {0}")]
    InvalidShortChannelId(String),

    #[error("unknown {kind} value: {value}")]
    UnknownEnumValue { kind: &'static str, value: i64 },

    #[error("unknown {kind}: {value}")]
    UnknownName { kind: &'static str, value: String },

    #[error("channel endpoints must differ, got node {0} on both sides")]
    SameChannelEndpoints(i64),
}

pub type Result<T> = std::result::Result<T, TypesError>;
