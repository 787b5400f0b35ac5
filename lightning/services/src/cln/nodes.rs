use tokio_util::sync::CancellationToken;
use torq_db::TorqDbAllOperations;
use torq_lightning_rpc::{ClnConnection, proto::cln};
use torq_types::prelude::{NodeEvent, RoutingPolicy, RoutingPolicyEvent};

use super::{msat, to_hex};
use crate::{
    context::ServiceContext,
    errors::{Result, ServiceError},
    graph::{record_node_event, record_routing_policy},
    lifecycle::{ServiceHandle, tick},
    lnd::from_unix_seconds,
};

/// Polls the gossip of the node itself and of its channel peers: their announcements and the
/// policies they announce for channels known to Torq.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.cln(node_id).await?;

    import_gossip(ctx, &client, node_id, cancel).await?;
    handle.active();

    while tick(cancel, ctx.cfg.cln_nodes_interval).await {
        import_gossip(ctx, &client, node_id, cancel).await?;
    }
    Ok(())
}

async fn import_gossip<Db>(
    ctx: &ServiceContext<Db>,
    client: &ClnConnection,
    node_id: i64,
    cancel: &CancellationToken,
) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let mut sources = vec![node_id];
    sources.extend(ctx.cache.get_channel_peer_node_ids(node_id));

    for source_node_id in sources {
        if cancel.is_cancelled() {
            break;
        }
        let public_key = ctx.cache.get_node_settings_by_node_id(source_node_id).public_key;
        let Ok(id) = hex::decode(&public_key) else {
            tracing::warn!(node_id = source_node_id, public_key, "skipping node with invalid public key");
            continue;
        };

        for node in client.list_nodes(Some(id.clone())).await? {
            record_node_event(ctx, node_event(node_id, source_node_id, node)).await?;
        }
        for channel in client.list_channels(Some(id)).await? {
            record_channel_policy(ctx, node_id, channel).await?;
        }
    }
    Ok(())
}

fn node_event(node_id: i64, event_node_id: i64, node: cln::ListnodesNodes) -> NodeEvent {
    NodeEvent {
        timestamp: node
            .last_timestamp
            .and_then(|t| from_unix_seconds(i64::from(t)))
            .or_else(|| Some(chrono::Utc::now())),
        event_node_id,
        node_id,
        alias: node.alias.unwrap_or_default(),
        color: node.color.map(|c| format!("#{}", to_hex(&c))).unwrap_or_default(),
        addresses: node
            .addresses
            .into_iter()
            .filter_map(|a| a.address.map(|address| format!("{address}:{}", a.port)))
            .collect(),
        features: feature_bits(node.features.as_deref().unwrap_or_default()),
    }
}

async fn record_channel_policy<Db>(ctx: &ServiceContext<Db>, node_id: i64, channel: cln::ListchannelsChannels) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let channel_id = ctx.cache.get_channel_id_by_short_channel_id(&normalized_scid(&channel.short_channel_id)?);
    if channel_id == 0 {
        return Ok(());
    }
    let (chain, network) = ctx.network_of(node_id);
    let announcing_node_id = ctx.node_id_for(&to_hex(&channel.source), chain, network).await?;
    let connecting_node_id = ctx.node_id_for(&to_hex(&channel.destination), chain, network).await?;

    record_routing_policy(
        ctx,
        RoutingPolicyEvent {
            timestamp: from_unix_seconds(i64::from(channel.last_update)).or_else(|| Some(chrono::Utc::now())),
            channel_id,
            announcing_node_id,
            connecting_node_id,
            node_id,
            policy: RoutingPolicy {
                disabled: !channel.active,
                time_lock_delta: channel.delay,
                min_htlc_msat: msat(channel.htlc_minimum_msat.as_ref()),
                max_htlc_msat: msat(channel.htlc_maximum_msat.as_ref()),
                fee_base_msat: i64::from(channel.base_fee_millisatoshi),
                fee_rate_milli_msat: i64::from(channel.fee_per_millionth),
            },
        },
    )
    .await?;
    Ok(())
}

fn normalized_scid(short_channel_id: &str) -> Result<String> {
    short_channel_id
        .parse::<torq_types::prelude::ShortChannelId>()
        .map(|scid| scid.to_string())
        .map_err(|_| ServiceError::InvalidData(format!("short channel id {short_channel_id}")))
}

/// Indices of the bits set in a big-endian feature bitfield, ascending.
fn feature_bits(bitfield: &[u8]) -> Vec<u32> {
    let mut bits = Vec::new();
    for (position, byte) in bitfield.iter().rev().enumerate() {
        for bit in 0..8 {
            if byte & (1 << bit) != 0 {
                bits.push(position as u32 * 8 + bit);
            }
        }
    }
    bits
}

#[cfg(test)]
mod tests {
    use torq_db::{
        channels::TorqDbChannelOperations, nodes::TorqDbNodeOperations, policies::TorqDbRoutingPolicyOperations,
    };
    use torq_lightning_rpc::test_utils::ClnScript;
    use torq_types::prelude::{Channel, ChannelStatus, Implementation, ServiceStatus, ServiceType};

    use super::*;
    use crate::test_support::{TestEnv, public_key, remote_node, status_reached};

    #[test]
    fn test_feature_bits() {
        assert_eq!(feature_bits(&[0x02, 0x81]), vec![0, 7, 9]);
        assert!(feature_bits(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_gossip_of_channel_peers_is_recorded() -> anyhow::Result<()> {
        let bob = hex::decode(public_key("03"))?;
        let alice = hex::decode(public_key("02"))?;
        let script = ClnScript {
            nodes: vec![cln::ListnodesNodes {
                nodeid: bob.clone(),
                last_timestamp: Some(1_700_000_000),
                alias: Some("bob".into()),
                color: Some(vec![0x33, 0x99, 0xff]),
                features: Some(vec![0x08, 0x00]),
                addresses: vec![cln::ListnodesNodesAddresses {
                    item_type: 1,
                    port: 9735,
                    address: Some("10.0.0.3".into()),
                }],
            }],
            channels: vec![
                cln::ListchannelsChannels {
                    source: bob.clone(),
                    destination: alice,
                    short_channel_id: "730000x3x1".into(),
                    active: true,
                    last_update: 1_700_000_000,
                    base_fee_millisatoshi: 1000,
                    fee_per_millionth: 42,
                    delay: 80,
                    ..Default::default()
                },
                cln::ListchannelsChannels {
                    source: bob,
                    destination: hex::decode(public_key("05"))?,
                    short_channel_id: "730001x1x0".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let env = TestEnv::new(Implementation::Cln, Default::default(), script, Default::default()).await?;
        let remote = remote_node(&env.ctx, "03").await?;
        let channel = env
            .ctx
            .db
            .insert_channel(
                None,
                Channel {
                    short_channel_id: Some("730000x3x1".into()),
                    funding_transaction_hash: "bb".repeat(32),
                    first_node_id: env.node_id,
                    second_node_id: remote,
                    status: ChannelStatus::Open,
                    ..Default::default()
                },
            )
            .await?;
        env.ctx.cache.set_channel(channel.clone());
        env.ctx.cache.set_channel_peer_node(env.node_id, remote);
        let mut events = env.ctx.bus.subscribe();

        let (ctx, handle, cancel) = env.service(ServiceType::ClnNodes);
        tokio::spawn(async move { run(&ctx, &handle, &cancel).await });
        status_reached(&mut events, ServiceType::ClnNodes, ServiceStatus::Active).await?;

        let announcement = env
            .ctx
            .db
            .get_latest_node_event(None, remote, env.node_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("node event expected"))?;
        assert_eq!(announcement.color, "#3399ff");
        assert_eq!(announcement.features, vec![11]);
        assert_eq!(announcement.addresses, vec!["10.0.0.3:9735".to_string()]);

        let policy = env
            .ctx
            .db
            .get_latest_routing_policy(None, channel.channel_id, remote, env.node_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("policy expected"))?;
        assert_eq!(policy.policy.fee_rate_milli_msat, 42);
        assert_eq!(policy.policy.time_lock_delta, 80);
        Ok(())
    }
}
