use tokio_util::sync::CancellationToken;
use torq_db::TorqDbAllOperations;
use torq_lightning_rpc::proto::lnrpc::{self, channel_event_update::Channel as ChannelEvent};
use torq_types::prelude::{ChannelPoint, ChannelStatus, ShortChannelId};

use super::{next_message, non_empty, non_zero};
use crate::{
    channels::{ChannelUpdate, add_channel_or_update_channel_status},
    context::ServiceContext,
    errors::{Result, ServiceError},
    lifecycle::ServiceHandle,
};

/// Imports the open channels, then follows the channel event subscription.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.lnd(node_id).await?;
    let (chain, network) = ctx.network_of(node_id);

    let info = client.get_info().await?;
    ctx.cache.set_block_height(chain, network, info.block_height);

    // subscribe first so nothing is lost between the import and the stream
    let mut events = client.subscribe_channel_events().await?;

    let channels = client.list_channels().await?;
    tracing::debug!(node_id, count = channels.len(), "importing open channels");
    for channel in &channels {
        let update = open_channel_update(ctx, node_id, channel).await?;
        add_channel_or_update_channel_status(ctx, update).await?;
    }
    handle.active();

    while let Some(event) = next_message(cancel, &mut events, "channel events").await? {
        process_channel_event(ctx, node_id, event).await?;
    }
    Ok(())
}

async fn process_channel_event<Db>(ctx: &ServiceContext<Db>, node_id: i64, event: lnrpc::ChannelEventUpdate) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    match event.channel {
        Some(ChannelEvent::OpenChannel(channel)) => {
            let update = open_channel_update(ctx, node_id, &channel).await?;
            add_channel_or_update_channel_status(ctx, update).await?;
        }
        Some(ChannelEvent::ClosedChannel(summary)) => {
            let update = closed_channel_update(ctx, node_id, &summary).await?;
            add_channel_or_update_channel_status(ctx, update).await?;
        }
        Some(ChannelEvent::PendingOpenChannel(pending)) => {
            let point = ChannelPoint::new(lnrpc::reversed_hex(&pending.txid), pending.output_index);
            let channel_id = ctx
                .cache
                .get_channel_id_by_funding_transaction(&point.funding_transaction_hash, point.funding_output_index);
            if channel_id == 0 {
                // the open event carries the peer, the channel is added then
                tracing::debug!(node_id, channel_point = %point, "pending channel not known yet");
                return Ok(());
            }
            let channel = ctx.cache.get_channel_setting_by_channel_id(channel_id);
            let remote_node_id = channel.other_node_id(node_id).unwrap_or(channel.second_node_id);
            add_channel_or_update_channel_status(
                ctx,
                ChannelUpdate {
                    node_id,
                    remote_node_id,
                    status: ChannelStatus::Opening,
                    channel_point: point,
                    ..Default::default()
                },
            )
            .await?;
        }
        Some(ChannelEvent::ActiveChannel(point)) => set_active(ctx, node_id, &point, true),
        Some(ChannelEvent::InactiveChannel(point)) => set_active(ctx, node_id, &point, false),
        Some(ChannelEvent::FullyResolvedChannel(_)) | None => {}
    }
    Ok(())
}

fn set_active<Db>(ctx: &ServiceContext<Db>, node_id: i64, point: &lnrpc::ChannelPoint, active: bool) {
    let Some(hash) = point.txid_hex() else {
        return;
    };
    let channel_id = ctx.cache.get_channel_id_by_funding_transaction(&hash, point.output_index);
    if let Some(mut state) = ctx.cache.get_channel_state(node_id, channel_id) {
        state.active = active;
        ctx.cache.set_channel_state(state);
    }
}

pub(crate) async fn open_channel_update<Db>(
    ctx: &ServiceContext<Db>,
    node_id: i64,
    channel: &lnrpc::Channel,
) -> Result<ChannelUpdate>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let (chain, network) = ctx.network_of(node_id);
    let remote_node_id = ctx.node_id_for(&channel.remote_pubkey, chain, network).await?;

    Ok(ChannelUpdate {
        node_id,
        remote_node_id,
        status: ChannelStatus::Open,
        channel_point: channel.channel_point.parse()?,
        capacity: channel.capacity,
        private: channel.private,
        initiating_node_id: Some(if channel.initiator { node_id } else { remote_node_id }),
        ..Default::default()
    }
    .with_short_channel_id(non_zero(channel.chan_id).map(ShortChannelId::from_lnd)))
}

async fn closed_channel_update<Db>(
    ctx: &ServiceContext<Db>,
    node_id: i64,
    summary: &lnrpc::ChannelCloseSummary,
) -> Result<ChannelUpdate>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let (chain, network) = ctx.network_of(node_id);
    let remote_node_id = ctx.node_id_for(&summary.remote_pubkey, chain, network).await?;

    let close_type = lnrpc::ClosureType::try_from(summary.close_type)
        .map_err(|_| ServiceError::InvalidData(format!("unknown closure type {}", summary.close_type)))?;
    let status = match close_type {
        lnrpc::ClosureType::CooperativeClose => ChannelStatus::CooperativeClosed,
        lnrpc::ClosureType::LocalForceClose => ChannelStatus::LocalForceClosed,
        lnrpc::ClosureType::RemoteForceClose => ChannelStatus::RemoteForceClosed,
        lnrpc::ClosureType::BreachClose => ChannelStatus::BreachClosed,
        lnrpc::ClosureType::FundingCanceled => ChannelStatus::FundingCancelledClosed,
        lnrpc::ClosureType::Abandoned => ChannelStatus::AbandonedClosed,
    };
    let initiator = |value: i32| match lnrpc::Initiator::try_from(value) {
        Ok(lnrpc::Initiator::Local) => Some(node_id),
        Ok(lnrpc::Initiator::Remote) => Some(remote_node_id),
        _ => None,
    };

    Ok(ChannelUpdate {
        node_id,
        remote_node_id,
        status,
        channel_point: summary.channel_point.parse()?,
        capacity: summary.capacity,
        initiating_node_id: initiator(summary.open_initiator),
        closing_transaction_hash: non_empty(summary.closing_tx_hash.clone()),
        closing_node_id: initiator(summary.close_initiator),
        closing_block_height: (summary.close_height > 0).then_some(summary.close_height),
        ..Default::default()
    }
    .with_short_channel_id(non_zero(summary.chan_id).map(ShortChannelId::from_lnd)))
}

#[cfg(test)]
mod tests {
    use torq_lightning_rpc::test_utils::LndScript;
    use torq_types::prelude::{Implementation, ServiceStatus, ServiceType};

    use super::*;
    use crate::{
        config::ServicesConfig,
        events::TorqEvent,
        test_support::{TestEnv, next_event, public_key, status_reached},
    };

    const FUNDING_TX: &str = "1100000000000000000000000000000000000000000000000000000000000011";
    const CLOSING_TX: &str = "2200000000000000000000000000000000000000000000000000000000000022";

    fn scid() -> ShortChannelId {
        ShortChannelId {
            block_height: 700000,
            tx_index: 5,
            output_index: 1,
        }
    }

    fn script() -> LndScript {
        LndScript {
            info: lnrpc::GetInfoResponse {
                block_height: 700100,
                ..Default::default()
            },
            channels: vec![lnrpc::Channel {
                active: true,
                remote_pubkey: public_key("03"),
                channel_point: format!("{FUNDING_TX}:1"),
                chan_id: scid().to_lnd(),
                capacity: 500_000,
                initiator: true,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_channels_are_imported_and_closed_from_events() -> anyhow::Result<()> {
        let env = TestEnv::new(Implementation::Lnd, script(), Default::default(), ServicesConfig::default()).await?;
        let feed = env.lnd.feed_channel_events();
        let mut events = env.ctx.bus.subscribe();

        let (ctx, handle, cancel) = env.service(ServiceType::LndChannelEvents);
        let task = tokio::spawn(async move { run(&ctx, &handle, &cancel).await });
        status_reached(&mut events, ServiceType::LndChannelEvents, ServiceStatus::Active).await?;

        let channel_id = env.ctx.cache.get_channel_id_by_short_channel_id("700000x5x1");
        assert_ne!(channel_id, 0);
        let imported = env.ctx.cache.get_channel_setting_by_channel_id(channel_id);
        assert_eq!(imported.status, ChannelStatus::Open);
        assert_eq!(imported.initiating_node_id, Some(env.node_id));
        assert_eq!(imported.lnd_short_channel_id, Some(scid().to_lnd()));

        let sent = feed.unbounded_send(lnrpc::ChannelEventUpdate {
            channel: Some(ChannelEvent::ClosedChannel(lnrpc::ChannelCloseSummary {
                channel_point: format!("{FUNDING_TX}:1"),
                chan_id: scid().to_lnd(),
                closing_tx_hash: CLOSING_TX.into(),
                remote_pubkey: public_key("03"),
                capacity: 500_000,
                close_height: 700200,
                close_type: lnrpc::ClosureType::RemoteForceClose as i32,
                open_initiator: lnrpc::Initiator::Local as i32,
                close_initiator: lnrpc::Initiator::Remote as i32,
            })),
            r#type: lnrpc::channel_event_update::UpdateType::ClosedChannel as i32,
        });
        assert!(sent.is_ok());

        let closed = next_event(&mut events, |e| {
            matches!(e, TorqEvent::ChannelUpdated(c) if c.status == ChannelStatus::RemoteForceClosed)
        })
        .await?;
        let TorqEvent::ChannelUpdated(closed) = closed else {
            anyhow::bail!("channel update expected");
        };
        assert_eq!(closed.channel_id, channel_id);
        assert_eq!(closed.closing_node_id, Some(imported.second_node_id));
        assert_eq!(closed.closing_transaction_hash.as_deref(), Some(CLOSING_TX));
        assert_eq!(closed.closing_block_height, Some(700200));

        // LND closing the subscription fails the service
        drop(feed);
        assert!(matches!(task.await?, Err(ServiceError::StreamEnded("channel events"))));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_stops_the_pipeline() -> anyhow::Result<()> {
        let env = TestEnv::new(Implementation::Lnd, script(), Default::default(), ServicesConfig::default()).await?;
        let mut events = env.ctx.bus.subscribe();

        let (ctx, handle, cancel) = env.service(ServiceType::LndChannelEvents);
        let stop = cancel.clone();
        let task = tokio::spawn(async move { run(&ctx, &handle, &cancel).await });
        status_reached(&mut events, ServiceType::LndChannelEvents, ServiceStatus::Active).await?;

        stop.cancel();
        assert!(task.await?.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_node_fails_bootstrap() -> anyhow::Result<()> {
        let env = TestEnv::lnd().await?;
        env.lnd.fail("get_info", tonic::Code::Unavailable, "connection refused");

        let (ctx, handle, cancel) = env.service(ServiceType::LndChannelEvents);
        assert!(matches!(run(&ctx, &handle, &cancel).await, Err(ServiceError::Rpc(_))));
        Ok(())
    }
}
