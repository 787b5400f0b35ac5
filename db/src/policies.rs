use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use torq_db_entity::{prelude::RoutingPolicy, routing_policy};
use torq_types::prelude::RoutingPolicyEvent;

use crate::{
    DbTimestamp, OptTx, TorqDbGeneralModelOperations,
    db::TorqDb,
    errors::{DbSqlError, Result},
};

/// Defines DB API for the append-only routing policy history.
#[async_trait]
pub trait TorqDbRoutingPolicyOperations {
    /// Returns the most recent policy of the directed edge.
    async fn get_latest_routing_policy<'a>(
        &'a self,
        tx: OptTx<'a>,
        channel_id: i64,
        announcing_node_id: i64,
        connecting_node_id: i64,
    ) -> Result<Option<RoutingPolicyEvent>>;

    /// Appends the event unless its policy equals the latest stored policy of the edge.
    ///
    /// Returns `true` if a row was inserted.
    async fn insert_routing_policy_if_changed<'a>(&'a self, tx: OptTx<'a>, event: RoutingPolicyEvent) -> Result<bool>;

    /// Returns the policies announced by `announcing_node_id` for the channel since `since`, oldest first.
    async fn get_routing_policies_since<'a>(
        &'a self,
        tx: OptTx<'a>,
        channel_id: i64,
        announcing_node_id: i64,
        since: DbTimestamp,
    ) -> Result<Vec<RoutingPolicyEvent>>;
}

#[async_trait]
impl TorqDbRoutingPolicyOperations for TorqDb {
    async fn get_latest_routing_policy<'a>(
        &'a self,
        tx: OptTx<'a>,
        channel_id: i64,
        announcing_node_id: i64,
        connecting_node_id: i64,
    ) -> Result<Option<RoutingPolicyEvent>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Ok::<_, DbSqlError>(
                        RoutingPolicy::find()
                            .filter(routing_policy::Column::ChannelId.eq(channel_id))
                            .filter(routing_policy::Column::AnnouncingNodeId.eq(announcing_node_id))
                            .filter(routing_policy::Column::ConnectingNodeId.eq(connecting_node_id))
                            .order_by_desc(routing_policy::Column::Ts)
                            .order_by_desc(routing_policy::Column::Id)
                            .one(tx.as_ref())
                            .await?
                            .map(RoutingPolicyEvent::try_from)
                            .transpose()?,
                    )
                })
            })
            .await
    }

    async fn insert_routing_policy_if_changed<'a>(&'a self, tx: OptTx<'a>, event: RoutingPolicyEvent) -> Result<bool> {
        let myself = self.clone();
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let latest = myself
                        .get_latest_routing_policy(
                            Some(tx),
                            event.channel_id,
                            event.announcing_node_id,
                            event.connecting_node_id,
                        )
                        .await?;

                    let ts = event.timestamp.unwrap_or_else(chrono::Utc::now);
                    if let Some(latest) = latest {
                        if latest.policy == event.policy {
                            return Ok(false);
                        }
                        // History stays ordered by timestamp
                        if latest.timestamp.is_some_and(|latest_ts| latest_ts > ts) {
                            tracing::debug!(channel_id = event.channel_id, "dropping out of order routing policy");
                            return Ok(false);
                        }
                    }

                    routing_policy::ActiveModel {
                        ts: Set(ts),
                        channel_id: Set(event.channel_id),
                        announcing_node_id: Set(event.announcing_node_id),
                        connecting_node_id: Set(event.connecting_node_id),
                        node_id: Set(event.node_id),
                        disabled: Set(event.policy.disabled),
                        time_lock_delta: Set(i32::try_from(event.policy.time_lock_delta)?),
                        min_htlc_msat: Set(i64::try_from(event.policy.min_htlc_msat)?),
                        max_htlc_msat: Set(i64::try_from(event.policy.max_htlc_msat)?),
                        fee_base_msat: Set(event.policy.fee_base_msat),
                        fee_rate_milli_msat: Set(event.policy.fee_rate_milli_msat),
                        ..Default::default()
                    }
                    .insert(tx.as_ref())
                    .await?;

                    Ok::<_, DbSqlError>(true)
                })
            })
            .await
    }

    async fn get_routing_policies_since<'a>(
        &'a self,
        tx: OptTx<'a>,
        channel_id: i64,
        announcing_node_id: i64,
        since: DbTimestamp,
    ) -> Result<Vec<RoutingPolicyEvent>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    RoutingPolicy::find()
                        .filter(routing_policy::Column::ChannelId.eq(channel_id))
                        .filter(routing_policy::Column::AnnouncingNodeId.eq(announcing_node_id))
                        .filter(routing_policy::Column::Ts.gte(since))
                        .order_by_asc(routing_policy::Column::Ts)
                        .order_by_asc(routing_policy::Column::Id)
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| RoutingPolicyEvent::try_from(m).map_err(DbSqlError::from))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use torq_types::prelude::{Channel, Chain, Network, RoutingPolicy as Policy};

    use super::*;
    use crate::{channels::TorqDbChannelOperations, nodes::TorqDbNodeOperations};

    async fn channel_fixture(db: &TorqDb) -> anyhow::Result<(i64, i64, i64)> {
        let m = db
            .get_or_create_node(None, &format!("02{}", "1".repeat(64)), Chain::Bitcoin, Network::RegTest)
            .await?;
        let r = db
            .get_or_create_node(None, &format!("03{}", "2".repeat(64)), Chain::Bitcoin, Network::RegTest)
            .await?;
        let channel = db
            .insert_channel(
                None,
                Channel {
                    funding_transaction_hash: "cd".repeat(32),
                    first_node_id: m.node_id,
                    second_node_id: r.node_id,
                    ..Default::default()
                },
            )
            .await?;
        Ok((channel.channel_id, m.node_id, r.node_id))
    }

    fn event(channel_id: i64, from: i64, to: i64, fee_rate: i64, ago_secs: i64) -> RoutingPolicyEvent {
        RoutingPolicyEvent {
            timestamp: Some(chrono::Utc::now() - Duration::seconds(ago_secs)),
            channel_id,
            announcing_node_id: from,
            connecting_node_id: to,
            node_id: from,
            policy: Policy {
                time_lock_delta: 40,
                min_htlc_msat: 1000,
                max_htlc_msat: 990_000_000,
                fee_base_msat: 1000,
                fee_rate_milli_msat: fee_rate,
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_consecutive_identical_policies_are_not_stored() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let (c, m, r) = channel_fixture(&db).await?;

        assert!(db.insert_routing_policy_if_changed(None, event(c, m, r, 100, 30)).await?);
        assert!(!db.insert_routing_policy_if_changed(None, event(c, m, r, 100, 20)).await?);
        assert!(db.insert_routing_policy_if_changed(None, event(c, m, r, 200, 10)).await?);
        // the other direction is an independent edge
        assert!(db.insert_routing_policy_if_changed(None, event(c, r, m, 100, 10)).await?);

        let history = db
            .get_routing_policies_since(None, c, m, chrono::Utc::now() - Duration::seconds(300))
            .await?;
        let rates: Vec<_> = history.iter().map(|e| e.policy.fee_rate_milli_msat).collect();
        assert_eq!(rates, vec![100, 200]);

        for pair in history.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
            assert_ne!(pair[0].policy, pair[1].policy);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_policies_outside_window_are_ignored() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let (c, m, r) = channel_fixture(&db).await?;

        db.insert_routing_policy_if_changed(None, event(c, m, r, 100, 900)).await?;
        db.insert_routing_policy_if_changed(None, event(c, m, r, 200, 60)).await?;

        let history = db
            .get_routing_policies_since(None, c, m, chrono::Utc::now() - Duration::seconds(300))
            .await?;
        assert_eq!(history.len(), 1);
        Ok(())
    }
}
