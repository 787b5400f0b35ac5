//! Shared data model of the Torq core.
//!
//! This crate contains the plain types exchanged between the cache, the persistence layer,
//! the corridor engine, the request router and the ingestion pipelines. It deliberately
//! has no knowledge of the LND or CLN wire formats; normalization into these types happens
//! at the edge of each ingestion pipeline.

pub mod activity;
pub mod channel;
pub mod corridor;
pub mod errors;
pub mod network;
pub mod node;
pub mod policy;
pub mod service;
pub mod settings;
pub mod tag;

#[cfg(test)]
mod tests;

/// Shorthand for the timestamp type used across the data model.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Implements the conversions between a field-less enum and its persisted integer form.
macro_rules! int_enum {
    ($name:ident { $($variant:ident = $value:expr),+ $(,)? }) => {
        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => $value),+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = $crate::errors::TypesError;

            fn try_from(value: i32) -> ::std::result::Result<Self, Self::Error> {
                match value {
                    $(v if v == $value => Ok($name::$variant),)+
                    other => Err($crate::errors::TypesError::UnknownEnumValue {
                        kind: stringify!($name),
                        value: other as i64,
                    }),
                }
            }
        }
    };
}

pub(crate) use int_enum;

#[doc(hidden)]
pub mod prelude {
    pub use super::Timestamp;
    pub use crate::{
        activity::*, channel::*, corridor::*, errors::TypesError, network::*, node::*, policy::*, service::*,
        settings::*, tag::*,
    };
}
