use tokio_util::sync::CancellationToken;
use torq_db::{TorqDbAllOperations, activity::TorqDbActivityOperations};
use torq_lightning_rpc::{LndConnection, proto::lnrpc};
use torq_types::prelude::Forward;

use crate::{
    context::ServiceContext,
    errors::Result,
    events::TorqEvent,
    lifecycle::{ServiceHandle, tick},
};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Imports the forwarding history since the last stored forward, then polls for new forwards.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.lnd(node_id).await?;

    let imported = import_forwards(ctx, &client, node_id, cancel).await?;
    tracing::debug!(node_id, imported, "forwarding history imported");
    handle.active();

    while tick(cancel, ctx.cfg.forwards_interval).await {
        import_forwards(ctx, &client, node_id, cancel).await?;
    }
    Ok(())
}

async fn import_forwards<Db>(
    ctx: &ServiceContext<Db>,
    client: &LndConnection,
    node_id: i64,
    cancel: &CancellationToken,
) -> Result<u64>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    // the history is queried by whole seconds, forwards of the last stored second are repeated
    let start_time = ctx
        .db
        .get_last_forward_time(None, node_id)
        .await?
        .map(|ns| u64::try_from(ns / NANOS_PER_SECOND).unwrap_or_default())
        .unwrap_or_default();
    let end_time = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default() + 1;
    let page_size = ctx.cfg.import_page_size.max(1);

    let mut index_offset = 0;
    let mut inserted = 0;
    while !cancel.is_cancelled() {
        let page = client
            .forwarding_history(lnrpc::ForwardingHistoryRequest {
                start_time,
                end_time,
                index_offset,
                num_max_events: page_size,
            })
            .await?;
        let count = page.forwarding_events.len();
        let forwards: Vec<Forward> = page
            .forwarding_events
            .into_iter()
            .map(|event| normalize(ctx, node_id, event))
            .collect();

        if !forwards.is_empty() {
            let stored = ctx.db.insert_forwards(None, forwards.clone()).await?;
            if stored > 0 {
                ctx.bus.publish(TorqEvent::ForwardsStored { node_id, forwards });
            }
            inserted += stored;
        }

        if count < page_size as usize || page.last_offset_index <= index_offset {
            break;
        }
        index_offset = page.last_offset_index;
    }
    Ok(inserted)
}

fn normalize<Db>(ctx: &ServiceContext<Db>, node_id: i64, event: lnrpc::ForwardingEvent) -> Forward {
    let channel_id = |lnd_short_channel_id: u64| {
        Some(ctx.cache.get_channel_id_by_lnd_short_channel_id(lnd_short_channel_id)).filter(|id| *id != 0)
    };

    Forward {
        node_id,
        time_ns: i64::try_from(event.timestamp_ns).unwrap_or(i64::MAX),
        incoming_channel_id: channel_id(event.chan_id_in),
        outgoing_channel_id: channel_id(event.chan_id_out),
        amount_in_msat: event.amt_in_msat,
        amount_out_msat: event.amt_out_msat,
        fee_msat: event.fee_msat,
    }
}
