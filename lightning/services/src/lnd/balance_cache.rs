use async_broadcast::RecvError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use torq_db::{TorqDbAllOperations, policies::TorqDbRoutingPolicyOperations};
use torq_lightning_rpc::{LndConnection, proto::lnrpc};
use torq_types::prelude::{ChannelPoint, ChannelState, HtlcDirection, PendingHtlc, RoutingPolicy};

use crate::{context::ServiceContext, errors::Result, events::TorqEvent, lifecycle::ServiceHandle};

/// Keeps the channel states of the node in the cache.
///
/// The states are rebuilt from the open channels of the node on the balance interval and
/// whenever one of the node's pipelines publishes an event that moves funds.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.lnd(node_id).await?;
    let mut events = ctx.bus.subscribe();

    refresh(ctx, &client, node_id).await?;
    handle.active();

    let mut interval = tokio::time::interval(ctx.cfg.channel_balance_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        let stale = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            _ = interval.tick() => true,
            event = events.recv() => match event {
                Ok(event) => event.node_id() == Some(node_id) && event.moves_balance(),
                // events were lost, one of them may have moved funds
                Err(RecvError::Overflowed(_)) => true,
                Err(RecvError::Closed) => return Ok(()),
            },
        };
        if stale {
            refresh(ctx, &client, node_id).await?;
        }
    }
}

async fn refresh<Db>(ctx: &ServiceContext<Db>, client: &LndConnection, node_id: i64) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let channels = client.list_channels().await?;
    let mut states = Vec::with_capacity(channels.len());
    for channel in channels {
        if let Some(state) = channel_state(ctx, node_id, channel).await? {
            states.push(state);
        }
    }

    tracing::trace!(node_id, channels = states.len(), "channel balances refreshed");
    ctx.cache.set_channel_states(node_id, states.clone());
    ctx.bus.publish(TorqEvent::ChannelStatesUpdated { node_id, states });
    Ok(())
}

async fn channel_state<Db>(ctx: &ServiceContext<Db>, node_id: i64, channel: lnrpc::Channel) -> Result<Option<ChannelState>>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let point: ChannelPoint = channel.channel_point.parse()?;
    let channel_id = ctx
        .cache
        .get_channel_id_by_funding_transaction(&point.funding_transaction_hash, point.funding_output_index);
    if channel_id == 0 {
        // added by the channel events pipeline, picked up on the next refresh
        tracing::debug!(node_id, channel_point = %point, "balance of unknown channel skipped");
        return Ok(None);
    }

    let (chain, network) = ctx.network_of(node_id);
    let remote_node_id = ctx.node_id_for(&channel.remote_pubkey, chain, network).await?;
    let (local_policy, remote_policy) = match ctx.cache.get_channel_state(node_id, channel_id) {
        Some(previous) => (previous.local_policy, previous.remote_policy),
        None => (
            latest_policy(ctx, channel_id, node_id, remote_node_id).await?,
            latest_policy(ctx, channel_id, remote_node_id, node_id).await?,
        ),
    };

    Ok(Some(ChannelState {
        node_id,
        remote_node_id,
        channel_id,
        capacity: channel.capacity,
        local_balance: channel.local_balance,
        remote_balance: channel.remote_balance,
        unsettled_balance: channel.unsettled_balance,
        pending_htlcs: channel
            .pending_htlcs
            .iter()
            .map(|htlc| PendingHtlc {
                amount_msat: u64::try_from(htlc.amount).unwrap_or_default() * 1000,
                direction: if htlc.incoming {
                    HtlcDirection::Incoming
                } else {
                    HtlcDirection::Outgoing
                },
                expiration_height: htlc.expiration_height,
            })
            .collect(),
        commit_fee: channel.commit_fee,
        commit_weight: channel.commit_weight,
        num_updates: channel.num_updates,
        lifetime: channel.lifetime,
        active: channel.active,
        local_policy,
        remote_policy,
    }))
}

async fn latest_policy<Db>(
    ctx: &ServiceContext<Db>,
    channel_id: i64,
    announcing_node_id: i64,
    connecting_node_id: i64,
) -> Result<RoutingPolicy>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    Ok(ctx
        .db
        .get_latest_routing_policy(None, channel_id, announcing_node_id, connecting_node_id)
        .await?
        .map(|event| event.policy)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use torq_db::channels::TorqDbChannelOperations;
    use torq_lightning_rpc::test_utils::LndScript;
    use torq_types::prelude::{
        Channel, ChannelStatus, Forward, Implementation, RoutingPolicyEvent, ServiceStatus, ServiceType,
    };

    use super::*;
    use crate::test_support::{TestEnv, next_event, public_key, remote_node, status_reached};

    const FUNDING_TX: &str = "7700000000000000000000000000000000000000000000000000000000000077";

    fn lnd_channel(local_balance: i64) -> lnrpc::Channel {
        lnrpc::Channel {
            active: true,
            remote_pubkey: public_key("03"),
            channel_point: format!("{FUNDING_TX}:0"),
            capacity: 1_000_000,
            local_balance,
            remote_balance: 1_000_000 - local_balance - 10_000,
            commit_fee: 10_000,
            pending_htlcs: vec![lnrpc::Htlc {
                incoming: true,
                amount: 25,
                hash_lock: vec![1; 32],
                expiration_height: 800_100,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_states_follow_balance_moving_events() -> anyhow::Result<()> {
        let script = LndScript {
            channels: vec![
                lnd_channel(600_000),
                lnrpc::Channel {
                    channel_point: format!("{}:3", "88".repeat(32)),
                    ..lnd_channel(1)
                },
            ],
            ..Default::default()
        };
        let env = TestEnv::new(Implementation::Lnd, script, Default::default(), Default::default()).await?;
        let remote = remote_node(&env.ctx, "03").await?;
        let channel = env
            .ctx
            .db
            .insert_channel(
                None,
                Channel {
                    funding_transaction_hash: FUNDING_TX.into(),
                    funding_output_index: 0,
                    capacity: 1_000_000,
                    first_node_id: env.node_id,
                    second_node_id: remote,
                    status: ChannelStatus::Open,
                    ..Default::default()
                },
            )
            .await?;
        env.ctx.cache.set_channel(channel.clone());
        env.ctx
            .db
            .insert_routing_policy_if_changed(
                None,
                RoutingPolicyEvent {
                    timestamp: Some(chrono::Utc::now()),
                    channel_id: channel.channel_id,
                    announcing_node_id: env.node_id,
                    connecting_node_id: remote,
                    node_id: env.node_id,
                    policy: RoutingPolicy {
                        fee_base_msat: 500,
                        ..Default::default()
                    },
                },
            )
            .await?;
        let mut events = env.ctx.bus.subscribe();

        let (ctx, handle, cancel) = env.service(ServiceType::LndChannelBalanceCache);
        tokio::spawn(async move { run(&ctx, &handle, &cancel).await });
        status_reached(&mut events, ServiceType::LndChannelBalanceCache, ServiceStatus::Active).await?;

        // the channel unknown to Torq is left out
        let states = env.ctx.cache.get_channel_states(env.node_id);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].local_balance, 600_000);
        assert_eq!(states[0].local_policy.fee_base_msat, 500);
        assert_eq!(states[0].pending_htlcs[0].amount_msat, 25_000);
        assert_eq!(states[0].pending_htlcs[0].direction, HtlcDirection::Incoming);

        env.lnd.update_script(|s| s.channels = vec![lnd_channel(550_000)]);
        env.ctx.bus.publish(TorqEvent::ForwardsStored {
            node_id: env.node_id,
            forwards: vec![Forward {
                node_id: env.node_id,
                time_ns: 1,
                incoming_channel_id: Some(channel.channel_id),
                outgoing_channel_id: None,
                amount_in_msat: 50_001_000,
                amount_out_msat: 50_000_000,
                fee_msat: 1_000,
            }],
        });

        let updated = next_event(&mut events, |e| matches!(e, TorqEvent::ChannelStatesUpdated { .. })).await?;
        let TorqEvent::ChannelStatesUpdated { states, .. } = updated else {
            anyhow::bail!("unexpected event");
        };
        assert_eq!(states[0].local_balance, 550_000);
        // the policy is carried from the previous state
        assert_eq!(states[0].local_policy.fee_base_msat, 500);
        Ok(())
    }
}
