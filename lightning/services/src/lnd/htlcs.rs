use tokio_util::sync::CancellationToken;
use torq_db::{TorqDbAllOperations, activity::TorqDbActivityOperations};
use torq_lightning_rpc::proto::routerrpc::{self, htlc_event::Event};
use torq_types::prelude::{HtlcEvent, HtlcEventKind, HtlcEventType};

use super::{next_message, non_empty};
use crate::{context::ServiceContext, errors::Result, events::TorqEvent, lifecycle::ServiceHandle};

/// Appends every HTLC event of the node.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.lnd(node_id).await?;
    let mut events = client.subscribe_htlc_events().await?;
    handle.active();

    while let Some(event) = next_message(cancel, &mut events, "htlc events").await? {
        let event = normalize(ctx, node_id, event)?;
        ctx.db.insert_htlc_event(None, event.clone()).await?;
        ctx.bus.publish(TorqEvent::HtlcEvent(Box::new(event)));
    }
    Ok(())
}

fn normalize<Db>(ctx: &ServiceContext<Db>, node_id: i64, event: routerrpc::HtlcEvent) -> Result<HtlcEvent> {
    let channel_id = |lnd_short_channel_id: u64| {
        Some(ctx.cache.get_channel_id_by_lnd_short_channel_id(lnd_short_channel_id)).filter(|id| *id != 0)
    };
    let event_type = HtlcEventType::try_from(event.event_type)?;

    let mut htlc = HtlcEvent {
        node_id,
        time_ns: i64::try_from(event.timestamp_ns).unwrap_or(i64::MAX),
        event_type,
        incoming_channel_id: channel_id(event.incoming_channel_id),
        outgoing_channel_id: channel_id(event.outgoing_channel_id),
        // a send has no incoming htlc and a receive no outgoing one
        incoming_htlc_id: (event_type != HtlcEventType::Send).then_some(event.incoming_htlc_id),
        outgoing_htlc_id: (event_type != HtlcEventType::Receive).then_some(event.outgoing_htlc_id),
        ..Default::default()
    };

    let info = match event.event {
        Some(Event::ForwardEvent(forward)) => {
            htlc.kind = HtlcEventKind::Forward;
            forward.info
        }
        Some(Event::ForwardFailEvent(_)) => {
            htlc.kind = HtlcEventKind::ForwardFail;
            None
        }
        Some(Event::SettleEvent(_)) => {
            htlc.kind = HtlcEventKind::Settle;
            None
        }
        Some(Event::LinkFailEvent(fail)) => {
            htlc.kind = HtlcEventKind::LinkFail;
            htlc.wire_failure = Some(fail.wire_failure);
            htlc.failure_detail = Some(fail.failure_detail);
            htlc.failure_string = non_empty(fail.failure_string);
            fail.info
        }
        Some(Event::FinalHtlcEvent(result)) => {
            htlc.kind = HtlcEventKind::FinalHtlc;
            htlc.settled = Some(result.settled);
            htlc.offchain = Some(result.offchain);
            None
        }
        Some(Event::SubscribedEvent(_)) | None => {
            htlc.kind = HtlcEventKind::Subscribed;
            None
        }
    };

    if let Some(info) = info {
        htlc.incoming_amount_msat = Some(info.incoming_amt_msat);
        htlc.outgoing_amount_msat = Some(info.outgoing_amt_msat);
        htlc.incoming_timelock = Some(info.incoming_timelock);
        htlc.outgoing_timelock = Some(info.outgoing_timelock);
    }
    Ok(htlc)
}

#[cfg(test)]
mod tests {
    use torq_types::prelude::{Channel, ChannelStatus, ServiceStatus, ServiceType, ShortChannelId};

    use super::*;
    use crate::test_support::{TestEnv, next_event, status_reached};

    #[tokio::test]
    async fn test_link_failure_is_normalized() -> anyhow::Result<()> {
        let env = TestEnv::lnd().await?;
        let scid = ShortChannelId {
            block_height: 710000,
            tx_index: 4,
            output_index: 1,
        };
        env.ctx.cache.set_channel(Channel {
            channel_id: 8,
            short_channel_id: Some(scid.to_string()),
            lnd_short_channel_id: Some(scid.to_lnd()),
            funding_transaction_hash: "66".repeat(32),
            first_node_id: env.node_id,
            second_node_id: env.node_id + 1,
            status: ChannelStatus::Open,
            ..Default::default()
        });

        let event = normalize(
            &env.ctx,
            env.node_id,
            routerrpc::HtlcEvent {
                incoming_channel_id: scid.to_lnd(),
                outgoing_channel_id: 99,
                incoming_htlc_id: 3,
                outgoing_htlc_id: 0,
                timestamp_ns: 1_700_000_000_000_000_000,
                event_type: routerrpc::htlc_event::EventType::Forward as i32,
                event: Some(Event::LinkFailEvent(routerrpc::LinkFailEvent {
                    info: Some(routerrpc::HtlcInfo {
                        incoming_timelock: 800,
                        outgoing_timelock: 760,
                        incoming_amt_msat: 10_100,
                        outgoing_amt_msat: 10_000,
                    }),
                    wire_failure: 15,
                    failure_detail: 6,
                    failure_string: String::new(),
                })),
            },
        )?;

        assert_eq!(event.kind, HtlcEventKind::LinkFail);
        assert_eq!(event.incoming_channel_id, Some(8));
        assert_eq!(event.outgoing_channel_id, None);
        assert_eq!(event.incoming_htlc_id, Some(3));
        assert_eq!(event.outgoing_amount_msat, Some(10_000));
        assert_eq!(event.failure_string, None);
        assert_eq!(event.settled, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_settled_htlc_is_stored_and_moves_balance() -> anyhow::Result<()> {
        let env = TestEnv::lnd().await?;
        let feed = env.lnd.feed_htlc_events();
        let mut events = env.ctx.bus.subscribe();

        let (ctx, handle, cancel) = env.service(ServiceType::LndHtlcEvents);
        tokio::spawn(async move { run(&ctx, &handle, &cancel).await });
        status_reached(&mut events, ServiceType::LndHtlcEvents, ServiceStatus::Active).await?;

        let sent = feed.unbounded_send(routerrpc::HtlcEvent {
            timestamp_ns: 1_700_000_000_000_000_000,
            event_type: routerrpc::htlc_event::EventType::Receive as i32,
            incoming_htlc_id: 12,
            event: Some(Event::FinalHtlcEvent(routerrpc::FinalHtlcEvent {
                settled: true,
                offchain: true,
            })),
            ..Default::default()
        });
        assert!(sent.is_ok());

        let event = next_event(&mut events, |e| matches!(e, TorqEvent::HtlcEvent(_))).await?;
        assert!(event.moves_balance());

        let stored = env.ctx.db.get_htlc_events(None, env.node_id).await?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].event_type, HtlcEventType::Receive);
        assert_eq!(stored[0].outgoing_htlc_id, None);
        Ok(())
    }
}
