use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;
use torq_db::TorqDbAllOperations;
use torq_lightning_rpc::{ClnConnection, proto::cln};
use torq_types::prelude::{ChannelPoint, ChannelState, ChannelStatus, RoutingPolicy, ShortChannelId};

use super::{msat, sat, to_hex};
use crate::{
    channels::{ChannelUpdate, add_channel_or_update_channel_status},
    context::ServiceContext,
    errors::{Result, ServiceError},
    events::TorqEvent,
    lifecycle::{ServiceHandle, tick},
};

/// Polls the peer channels, reconciles their status and refreshes the channel states.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.cln(node_id).await?;

    let info = client.get_info().await?;
    let (chain, network) = ctx.network_of(node_id);
    ctx.cache.set_block_height(chain, network, info.blockheight);

    import_channels(ctx, &client, node_id).await?;
    handle.active();

    while tick(cancel, ctx.cfg.cln_channels_interval).await {
        import_channels(ctx, &client, node_id).await?;
    }
    Ok(())
}

async fn import_channels<Db>(ctx: &ServiceContext<Db>, client: &ClnConnection, node_id: i64) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let previously_open: BTreeSet<i64> = ctx.cache.get_open_channel_ids_by_node_id(node_id).into_iter().collect();
    let mut reported = BTreeSet::new();
    let mut states = Vec::new();

    for peer_channel in client.list_peer_channels().await? {
        let Some(update) = channel_update(ctx, node_id, &peer_channel).await? else {
            continue;
        };
        let channel = add_channel_or_update_channel_status(ctx, update).await?;
        reported.insert(channel.channel_id);

        if !channel.status.is_closing_or_later() {
            let remote_node_id = channel.other_node_id(node_id).unwrap_or(channel.second_node_id);
            states.push(channel_state(ctx, node_id, channel.channel_id, remote_node_id, &peer_channel));
        }
    }

    // CLN forgets channels some time after they are closed on chain
    for channel_id in previously_open.difference(&reported) {
        let channel = ctx.cache.get_channel_setting_by_channel_id(*channel_id);
        let Some(remote_node_id) = channel.other_node_id(node_id) else {
            continue;
        };
        tracing::info!(node_id, channel_id, "channel no longer reported, marking it closed");
        add_channel_or_update_channel_status(
            ctx,
            ChannelUpdate {
                node_id,
                remote_node_id,
                status: ChannelStatus::CooperativeClosed,
                channel_point: channel.channel_point(),
                ..Default::default()
            },
        )
        .await?;
    }

    ctx.cache.set_channel_states(node_id, states.clone());
    ctx.bus.publish(TorqEvent::ChannelStatesUpdated { node_id, states });
    Ok(())
}

async fn channel_update<Db>(
    ctx: &ServiceContext<Db>,
    node_id: i64,
    channel: &cln::ListpeerchannelsChannels,
) -> Result<Option<ChannelUpdate>>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let (Some(funding_txid), Some(funding_outnum)) = (channel.funding_txid.as_ref(), channel.funding_outnum) else {
        // not funded yet
        return Ok(None);
    };
    let short_channel_id = match channel
        .short_channel_id
        .as_deref()
        .map(str::parse::<ShortChannelId>)
        .transpose()
    {
        Ok(short_channel_id) => short_channel_id,
        Err(error) => {
            tracing::warn!(node_id, %error, "skipping channel with malformed short channel id");
            return Ok(None);
        }
    };
    let (chain, network) = ctx.network_of(node_id);
    let remote_node_id = ctx.node_id_for(&to_hex(&channel.peer_id), chain, network).await?;

    let side = |value: i32| match cln::ChannelSide::try_from(value) {
        Ok(cln::ChannelSide::Local) => Some(node_id),
        Ok(cln::ChannelSide::Remote) => Some(remote_node_id),
        Err(_) => None,
    };
    Ok(Some(
        ChannelUpdate {
            node_id,
            remote_node_id,
            status: channel_status(channel.state)?,
            channel_point: ChannelPoint::new(to_hex(funding_txid), funding_outnum),
            capacity: sat(channel.total_msat.as_ref()),
            private: channel.private.unwrap_or_default(),
            initiating_node_id: side(channel.opener),
            closing_node_id: channel.closer.and_then(side),
            ..Default::default()
        }
        .with_short_channel_id(short_channel_id),
    ))
}

fn channel_status(state: i32) -> Result<ChannelStatus> {
    use cln::ChannelState::*;

    let state = cln::ChannelState::try_from(state)
        .map_err(|_| ServiceError::InvalidData(format!("unknown CLN channel state {state}")))?;
    Ok(match state {
        Openingd | ChanneldAwaitingLockin | DualopendOpenInit | DualopendAwaitingLockin => ChannelStatus::Opening,
        ChanneldNormal | ChanneldAwaitingSplice => ChannelStatus::Open,
        ChanneldShuttingDown | ClosingdSigexchange | ClosingdComplete | AwaitingUnilateral | FundingSpendSeen => {
            ChannelStatus::Closing
        }
        // CLN does not tell how the channel was closed
        Onchain => ChannelStatus::CooperativeClosed,
    })
}

fn channel_state<Db>(
    ctx: &ServiceContext<Db>,
    node_id: i64,
    channel_id: i64,
    remote_node_id: i64,
    channel: &cln::ListpeerchannelsChannels,
) -> ChannelState {
    let capacity = sat(channel.total_msat.as_ref());
    let local_balance = sat(channel.to_us_msat.as_ref());
    let previous = ctx.cache.get_channel_state(node_id, channel_id);
    let remote_policy = previous.as_ref().map(|p| p.remote_policy).unwrap_or_default();
    // older nodes do not report their channel update, keep what is known
    let time_lock_delta = channel
        .updates
        .as_ref()
        .and_then(|u| u.local.as_ref())
        .map(|local| local.cltv_expiry_delta)
        .or_else(|| previous.map(|p| p.local_policy.time_lock_delta))
        .unwrap_or_default();

    ChannelState {
        node_id,
        remote_node_id,
        channel_id,
        capacity,
        local_balance,
        remote_balance: capacity - local_balance,
        active: channel.peer_connected && channel.state == cln::ChannelState::ChanneldNormal as i32,
        local_policy: RoutingPolicy {
            disabled: false,
            time_lock_delta,
            min_htlc_msat: msat(channel.minimum_htlc_out_msat.as_ref()),
            max_htlc_msat: msat(channel.maximum_htlc_out_msat.as_ref()),
            fee_base_msat: i64::try_from(msat(channel.fee_base_msat.as_ref())).unwrap_or(i64::MAX),
            fee_rate_milli_msat: i64::from(channel.fee_proportional_millionths.unwrap_or_default()),
        },
        remote_policy,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;
    use torq_db::channels::TorqDbChannelOperations;
    use torq_lightning_requests::{
        messages::RoutingPolicyUpdateRequest,
        policy::{self, PolicyField},
    };
    use torq_lightning_rpc::test_utils::ClnScript;
    use torq_types::prelude::{Implementation, ServiceStatus, ServiceType};

    use super::*;
    use crate::{
        config::ServicesConfig,
        test_support::{TestEnv, next_event, public_key, status_reached},
    };

    const FUNDING_TX: &str = "9900000000000000000000000000000000000000000000000000000000000099";

    fn peer_channel(state: cln::ChannelState) -> anyhow::Result<cln::ListpeerchannelsChannels> {
        Ok(cln::ListpeerchannelsChannels {
            peer_id: hex::decode(public_key("03"))?,
            peer_connected: true,
            state: state as i32,
            short_channel_id: Some("720000x12x0".into()),
            funding_txid: Some(hex::decode(FUNDING_TX)?),
            funding_outnum: Some(0),
            private: Some(false),
            opener: cln::ChannelSide::Local as i32,
            closer: None,
            to_us_msat: Some(cln::Amount { msat: 300_000_000 }),
            total_msat: Some(cln::Amount { msat: 2_000_000_000 }),
            fee_base_msat: Some(cln::Amount { msat: 1_000 }),
            fee_proportional_millionths: Some(10),
            minimum_htlc_out_msat: Some(cln::Amount { msat: 1 }),
            maximum_htlc_out_msat: Some(cln::Amount { msat: 1_980_000_000 }),
            updates: Some(cln::ListpeerchannelsChannelsUpdates {
                local: Some(cln::ListpeerchannelsChannelsUpdatesLocal {
                    cltv_expiry_delta: 34,
                    ..Default::default()
                }),
            }),
        })
    }

    #[rstest]
    #[case(cln::ChannelState::ChanneldAwaitingLockin, ChannelStatus::Opening)]
    #[case(cln::ChannelState::ChanneldNormal, ChannelStatus::Open)]
    #[case(cln::ChannelState::AwaitingUnilateral, ChannelStatus::Closing)]
    #[case(cln::ChannelState::Onchain, ChannelStatus::CooperativeClosed)]
    fn test_channel_states_are_mapped(
        #[case] state: cln::ChannelState,
        #[case] expected: ChannelStatus,
    ) -> anyhow::Result<()> {
        assert_eq!(channel_status(state as i32)?, expected);
        Ok(())
    }

    #[tokio::test]
    async fn test_channels_are_imported_and_closed_when_gone() -> anyhow::Result<()> {
        let script = ClnScript {
            info: cln::GetinfoResponse {
                blockheight: 720_500,
                ..Default::default()
            },
            peer_channels: vec![peer_channel(cln::ChannelState::ChanneldNormal)?],
            ..Default::default()
        };
        let cfg = ServicesConfig {
            cln_channels_interval: Duration::from_millis(20),
            ..Default::default()
        };
        let env = TestEnv::new(Implementation::Cln, Default::default(), script, cfg).await?;
        let mut events = env.ctx.bus.subscribe();

        let (ctx, handle, cancel) = env.service(ServiceType::ClnChannels);
        tokio::spawn(async move { run(&ctx, &handle, &cancel).await });
        status_reached(&mut events, ServiceType::ClnChannels, ServiceStatus::Active).await?;

        let channel_id = env.ctx.cache.get_channel_id_by_short_channel_id("720000x12x0");
        let channel = env
            .ctx
            .db
            .get_channel(None, channel_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("channel expected"))?;
        assert_eq!(channel.capacity, 2_000_000);
        assert_eq!(channel.funding_transaction_hash, FUNDING_TX);
        assert_eq!(channel.initiating_node_id, Some(env.node_id));

        let state = env
            .ctx
            .cache
            .get_channel_state(env.node_id, channel_id)
            .ok_or_else(|| anyhow::anyhow!("state expected"))?;
        assert_eq!(state.local_balance, 300_000);
        assert_eq!(state.remote_balance, 1_700_000);
        assert_eq!(state.local_policy.fee_rate_milli_msat, 10);
        assert_eq!(state.local_policy.time_lock_delta, 34);
        assert!(state.active);

        let fee_only = RoutingPolicyUpdateRequest {
            node_id: env.node_id,
            channel_id,
            fee_rate_milli_msat: Some(20),
            time_lock_delta: Some(34),
            ..Default::default()
        };
        assert_eq!(policy::changed_fields(&state.local_policy, &fee_only), vec![PolicyField::FeeRate]);

        env.cln.update_script(|s| s.peer_channels.clear());
        next_event(&mut events, |e| matches!(e, TorqEvent::ChannelStatesUpdated { states, .. } if states.is_empty()))
            .await?;
        assert_eq!(env.ctx.cache.get_channel_state(env.node_id, channel_id), None);
        let closed = env.ctx.db.get_channel(None, channel_id).await?;
        assert_eq!(closed.map(|c| c.status), Some(ChannelStatus::CooperativeClosed));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_short_channel_id_skips_only_that_channel() -> anyhow::Result<()> {
        let mut malformed = peer_channel(cln::ChannelState::ChanneldNormal)?;
        malformed.short_channel_id = Some("720000:12".into());
        malformed.funding_txid = Some(vec![0x77; 32]);
        let script = ClnScript {
            peer_channels: vec![malformed, peer_channel(cln::ChannelState::ChanneldNormal)?],
            ..Default::default()
        };
        let env = TestEnv::new(Implementation::Cln, Default::default(), script, ServicesConfig::default()).await?;
        let mut events = env.ctx.bus.subscribe();

        let (ctx, handle, cancel) = env.service(ServiceType::ClnChannels);
        tokio::spawn(async move { run(&ctx, &handle, &cancel).await });
        status_reached(&mut events, ServiceType::ClnChannels, ServiceStatus::Active).await?;

        assert_ne!(env.ctx.cache.get_channel_id_by_short_channel_id("720000x12x0"), 0);
        assert_eq!(env.ctx.cache.get_channel_id_by_funding_transaction(&"77".repeat(32), 0), 0);
        assert_eq!(env.ctx.cache.get_open_channel_ids_by_node_id(env.node_id).len(), 1);
        Ok(())
    }
}
