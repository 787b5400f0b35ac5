//! Recording of gossip: routing policies and node announcements.

use torq_db::TorqDbAllOperations;
use torq_types::prelude::{NodeEvent, RoutingPolicyEvent};

use crate::{context::ServiceContext, errors::Result, events::TorqEvent};

/// Stores the policy if it differs from the latest one of the edge and mirrors it into the
/// channel state of the observing node.
///
/// Returns `true` if a new version was stored.
pub async fn record_routing_policy<Db>(ctx: &ServiceContext<Db>, event: RoutingPolicyEvent) -> Result<bool>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    if event.announcing_node_id == event.node_id {
        ctx.cache
            .set_channel_state_routing_policy(event.node_id, event.channel_id, true, event.policy);
    } else if event.connecting_node_id == event.node_id {
        ctx.cache
            .set_channel_state_routing_policy(event.node_id, event.channel_id, false, event.policy);
    }

    let inserted = ctx.db.insert_routing_policy_if_changed(None, event.clone()).await?;
    if inserted {
        tracing::debug!(
            channel_id = event.channel_id,
            announcing_node_id = event.announcing_node_id,
            "routing policy changed"
        );
        ctx.bus.publish(TorqEvent::RoutingPolicyUpdated(event));
    }
    Ok(inserted)
}

/// Stores the announcement if alias, color, addresses or features changed.
pub async fn record_node_event<Db>(ctx: &ServiceContext<Db>, event: NodeEvent) -> Result<bool>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    if !event.alias.is_empty() {
        ctx.cache.set_node_alias(event.event_node_id, event.alias.clone());
    }

    let inserted = ctx.db.insert_node_event_if_changed(None, event.clone()).await?;
    if inserted {
        tracing::debug!(event_node_id = event.event_node_id, alias = %event.alias, "node announcement changed");
        ctx.bus.publish(TorqEvent::NodeAnnounced(event));
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use torq_db::channels::TorqDbChannelOperations;
    use torq_types::prelude::{Channel, ChannelState, ChannelStatus, RoutingPolicy};

    use super::*;
    use crate::test_support::{TestEnv, remote_node};

    #[tokio::test]
    async fn test_policy_is_recorded_once_and_mirrored() -> anyhow::Result<()> {
        let env = TestEnv::lnd().await?;
        let remote = remote_node(&env.ctx, "03").await?;
        let channel = env
            .ctx
            .db
            .insert_channel(
                None,
                Channel {
                    funding_transaction_hash: "55".repeat(32),
                    capacity: 100,
                    first_node_id: env.node_id,
                    second_node_id: remote,
                    status: ChannelStatus::Open,
                    ..Default::default()
                },
            )
            .await?;
        env.ctx.cache.set_channel_state(ChannelState {
            node_id: env.node_id,
            remote_node_id: remote,
            channel_id: channel.channel_id,
            capacity: 100,
            ..Default::default()
        });

        let event = RoutingPolicyEvent {
            timestamp: Some(chrono::Utc::now()),
            channel_id: channel.channel_id,
            announcing_node_id: remote,
            connecting_node_id: env.node_id,
            node_id: env.node_id,
            policy: RoutingPolicy {
                fee_rate_milli_msat: 250,
                time_lock_delta: 80,
                ..Default::default()
            },
        };
        assert!(record_routing_policy(&env.ctx, event.clone()).await?);
        assert!(!record_routing_policy(&env.ctx, event).await?);

        let state = env
            .ctx
            .cache
            .get_channel_state(env.node_id, channel.channel_id)
            .ok_or_else(|| anyhow::anyhow!("state expected"))?;
        assert_eq!(state.remote_policy.fee_rate_milli_msat, 250);
        assert_eq!(state.local_policy, RoutingPolicy::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_unchanged_announcement_is_skipped() -> anyhow::Result<()> {
        let env = TestEnv::lnd().await?;
        let remote = remote_node(&env.ctx, "03").await?;
        let event = NodeEvent {
            timestamp: Some(chrono::Utc::now()),
            event_node_id: remote,
            node_id: env.node_id,
            alias: "bob".into(),
            color: "#3399ff".into(),
            addresses: vec!["10.0.0.2:9735".into()],
            features: vec![1, 9],
        };

        assert!(record_node_event(&env.ctx, event.clone()).await?);
        assert!(!record_node_event(&env.ctx, event.clone()).await?);
        assert!(
            record_node_event(
                &env.ctx,
                NodeEvent {
                    color: "#000000".into(),
                    ..event
                }
            )
            .await?
        );
        assert_eq!(env.ctx.cache.get_node_alias(remote), "bob");
        Ok(())
    }
}
