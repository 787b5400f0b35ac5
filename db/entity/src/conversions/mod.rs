//! Conversions between the database models and the `torq-types` data model.

pub mod activity;
pub mod channels;
pub mod corridors;
pub mod nodes;
pub mod policies;
pub mod tags;

use crate::errors::{DbEntityError, Result};

/// Converts a non-negative database integer into an unsigned value.
pub(crate) fn to_unsigned<T: TryFrom<i64>>(column: &'static str, value: i64) -> Result<T> {
    T::try_from(value).map_err(|_| DbEntityError::Conversion(format!("{column} out of range: {value}")))
}

/// Converts an unsigned value into a database integer.
pub fn to_db_int<T: TryInto<i64> + Copy + std::fmt::Display>(column: &'static str, value: T) -> Result<i64> {
    value
        .try_into()
        .map_err(|_| DbEntityError::Conversion(format!("{column} out of range: {value}")))
}
