use tokio_util::sync::CancellationToken;
use torq_db::TorqDbAllOperations;
use torq_lightning_rpc::proto::lnrpc;
use torq_types::prelude::{NodeEvent, RoutingPolicy, RoutingPolicyEvent};

use super::{from_unix_seconds, next_message};
use crate::{
    context::ServiceContext,
    errors::Result,
    graph::{record_node_event, record_routing_policy},
    lifecycle::ServiceHandle,
};

/// Follows the graph topology subscription.
///
/// Only edges of channels known to Torq and announcements of known nodes are recorded; the
/// rest of the network gossip is ignored.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.lnd(node_id).await?;
    let mut updates = client.subscribe_channel_graph().await?;
    handle.active();

    while let Some(update) = next_message(cancel, &mut updates, "graph updates").await? {
        process_graph_update(ctx, node_id, update).await?;
    }
    Ok(())
}

pub(crate) async fn process_graph_update<Db>(
    ctx: &ServiceContext<Db>,
    node_id: i64,
    update: lnrpc::GraphTopologyUpdate,
) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let (chain, network) = ctx.network_of(node_id);

    for edge in update.channel_updates {
        let channel_id = ctx.cache.get_channel_id_by_lnd_short_channel_id(edge.chan_id);
        if channel_id == 0 {
            continue;
        }
        let Some(policy) = edge.routing_policy else {
            continue;
        };
        let announcing_node_id = ctx.node_id_for(&edge.advertising_node, chain, network).await?;
        let connecting_node_id = ctx.node_id_for(&edge.connecting_node, chain, network).await?;

        record_routing_policy(
            ctx,
            RoutingPolicyEvent {
                timestamp: from_unix_seconds(i64::from(policy.last_update)).or_else(|| Some(chrono::Utc::now())),
                channel_id,
                announcing_node_id,
                connecting_node_id,
                node_id,
                policy: routing_policy(&policy),
            },
        )
        .await?;
    }

    for node in update.node_updates {
        let event_node_id = ctx.cache.get_node_id_by_public_key(&node.identity_key, chain, network);
        if event_node_id == 0 {
            continue;
        }
        let mut features: Vec<u32> = node.features.keys().copied().collect();
        features.sort_unstable();

        record_node_event(
            ctx,
            NodeEvent {
                timestamp: Some(chrono::Utc::now()),
                event_node_id,
                node_id,
                alias: node.alias,
                color: node.color,
                addresses: node.node_addresses.into_iter().map(|a| a.addr).collect(),
                features,
            },
        )
        .await?;
    }
    Ok(())
}

pub(crate) fn routing_policy(policy: &lnrpc::RoutingPolicy) -> RoutingPolicy {
    RoutingPolicy {
        disabled: policy.disabled,
        time_lock_delta: policy.time_lock_delta,
        min_htlc_msat: u64::try_from(policy.min_htlc).unwrap_or_default(),
        max_htlc_msat: policy.max_htlc_msat,
        fee_base_msat: policy.fee_base_msat,
        fee_rate_milli_msat: policy.fee_rate_milli_msat,
    }
}
