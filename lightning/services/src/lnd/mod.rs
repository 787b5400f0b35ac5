//! Ingestion pipelines of LND nodes.
//!
//! Every pipeline connects through the client pool, bootstraps what it needs, reports Active
//! and then follows a subscription or polls on its interval until cancelled. A message that
//! is being processed when the cancellation arrives is finished first.

pub mod balance_cache;
pub mod channel_events;
pub mod forwards;
pub mod graph;
pub mod htlcs;
pub mod in_flight;
pub mod invoices;
pub mod payments;
pub mod peers;
pub mod transactions;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use torq_lightning_rpc::RpcStream;
use torq_types::prelude::Timestamp;

use crate::{
    errors::{Result, ServiceError},
    lifecycle::until_cancelled,
};

/// Waits for the next message of the subscription.
///
/// `Ok(None)` means the service was cancelled; the end of the stream is an error since LND
/// only closes subscriptions when it shuts down.
pub(crate) async fn next_message<T>(
    cancel: &CancellationToken,
    stream: &mut RpcStream<T>,
    what: &'static str,
) -> Result<Option<T>> {
    match until_cancelled(cancel, stream.next()).await {
        None => Ok(None),
        Some(None) => Err(ServiceError::StreamEnded(what)),
        Some(Some(message)) => Ok(Some(message?)),
    }
}

pub(crate) fn from_unix_seconds(seconds: i64) -> Option<Timestamp> {
    if seconds <= 0 {
        return None;
    }
    chrono::DateTime::from_timestamp(seconds, 0)
}

pub(crate) fn from_unix_nanos(nanos: i64) -> Option<Timestamp> {
    if nanos <= 0 {
        return None;
    }
    Some(chrono::DateTime::from_timestamp_nanos(nanos))
}

/// LND reports unknown channels as zero.
pub(crate) fn non_zero(value: u64) -> Option<u64> {
    (value != 0).then_some(value)
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
