//! Ingestion pipelines of Core Lightning nodes.
//!
//! CLN has no subscriptions for the data Torq follows, so every pipeline polls on its own
//! interval: an initial pass, then one pass per tick until cancelled.

pub mod channels;
pub mod funds;
pub mod nodes;
pub mod peers;
pub mod transactions;

use torq_lightning_rpc::proto::cln;

/// Public keys, transaction ids and colors are returned as raw bytes.
pub(crate) fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

pub(crate) fn sat(amount: Option<&cln::Amount>) -> i64 {
    i64::try_from(msat(amount) / 1000).unwrap_or(i64::MAX)
}

pub(crate) fn msat(amount: Option<&cln::Amount>) -> u64 {
    amount.map(|a| a.msat).unwrap_or_default()
}
