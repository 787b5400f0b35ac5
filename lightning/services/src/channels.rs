//! Channel lifecycle bookkeeping shared by the LND and CLN channel pipelines.

use torq_db::{TorqDbAllOperations, channels::TorqDbChannelOperations};
use torq_types::prelude::{Channel, ChannelFlags, ChannelPoint, ChannelStatus, ShortChannelId};

use crate::{
    context::ServiceContext,
    errors::Result,
    events::TorqEvent,
    vector::{BlockDetails, TransactionLookup},
};

/// A channel as reported by a backing node, normalized across implementations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelUpdate {
    /// The managed node reporting the channel.
    pub node_id: i64,
    pub remote_node_id: i64,
    pub status: ChannelStatus,
    pub channel_point: ChannelPoint,
    pub short_channel_id: Option<String>,
    pub lnd_short_channel_id: Option<u64>,
    pub capacity: i64,
    pub private: bool,
    pub initiating_node_id: Option<i64>,
    pub closing_transaction_hash: Option<String>,
    pub closing_node_id: Option<i64>,
    pub closing_block_height: Option<u32>,
}

impl ChannelUpdate {
    /// Fills the textual and the LND short channel id from each other.
    pub fn with_short_channel_id(mut self, short_channel_id: Option<ShortChannelId>) -> Self {
        if let Some(scid) = short_channel_id {
            self.short_channel_id = Some(scid.to_string());
            self.lnd_short_channel_id = Some(scid.to_lnd());
        }
        self
    }

    fn to_channel(&self) -> Channel {
        let accepting_node_id = self.initiating_node_id.map(|initiator| {
            if initiator == self.node_id {
                self.remote_node_id
            } else {
                self.node_id
            }
        });

        Channel {
            channel_id: 0,
            short_channel_id: self.short_channel_id.clone(),
            lnd_short_channel_id: self.lnd_short_channel_id,
            funding_transaction_hash: self.channel_point.funding_transaction_hash.clone(),
            funding_output_index: self.channel_point.funding_output_index,
            closing_transaction_hash: self.closing_transaction_hash.clone(),
            capacity: self.capacity,
            private: self.private,
            first_node_id: self.node_id,
            second_node_id: self.remote_node_id,
            initiating_node_id: self.initiating_node_id,
            accepting_node_id,
            closing_node_id: self.closing_node_id,
            status: self.status,
            funding_block_height: self.funding_block_height(),
            funded_on: None,
            closing_block_height: self.closing_block_height,
            closed_on: None,
            flags: ChannelFlags::default(),
        }
    }

    fn funding_block_height(&self) -> Option<u32> {
        self.short_channel_id
            .as_deref()
            .and_then(|s| s.parse::<ShortChannelId>().ok())
            .map(|scid| scid.block_height)
    }

    /// Returns the existing channel with the fields of this update applied.
    ///
    /// Known facts are never erased and the status only moves forward.
    fn merge_into(&self, existing: &Channel) -> Channel {
        let mut merged = existing.clone();

        if existing.status.can_transition_to(self.status) {
            merged.status = self.status;
        } else {
            tracing::debug!(
                channel_id = existing.channel_id,
                current = ?existing.status,
                reported = ?self.status,
                "ignoring channel status regression"
            );
        }

        merged.short_channel_id = self.short_channel_id.clone().or(merged.short_channel_id);
        merged.lnd_short_channel_id = self.lnd_short_channel_id.or(merged.lnd_short_channel_id);
        merged.closing_transaction_hash = self
            .closing_transaction_hash
            .clone()
            .or(merged.closing_transaction_hash);
        merged.closing_node_id = self.closing_node_id.or(merged.closing_node_id);
        merged.closing_block_height = merged.closing_block_height.or(self.closing_block_height);
        merged.funding_block_height = merged.funding_block_height.or(self.funding_block_height());
        if merged.initiating_node_id.is_none() {
            let fresh = self.to_channel();
            merged.initiating_node_id = fresh.initiating_node_id;
            merged.accepting_node_id = fresh.accepting_node_id;
        }
        if self.capacity > 0 {
            merged.capacity = self.capacity;
        }
        merged
    }
}

/// Finds the channel by funding point or short channel id, in the cache first.
async fn find_channel<Db>(ctx: &ServiceContext<Db>, update: &ChannelUpdate) -> Result<Option<Channel>>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let point = &update.channel_point;
    let mut channel_id = ctx
        .cache
        .get_channel_id_by_funding_transaction(&point.funding_transaction_hash, point.funding_output_index);
    if channel_id == 0 {
        if let Some(scid) = update.short_channel_id.as_deref() {
            channel_id = ctx.cache.get_channel_id_by_short_channel_id(scid);
        }
    }
    if channel_id != 0 {
        let cached = ctx.cache.get_channel_setting_by_channel_id(channel_id);
        if cached.channel_id != 0 {
            return Ok(Some(cached));
        }
    }

    let found = ctx
        .db
        .find_channel_by_funding_transaction(None, &point.funding_transaction_hash, point.funding_output_index)
        .await?;
    if found.is_some() {
        return Ok(found);
    }
    match update.short_channel_id.as_deref() {
        Some(scid) => Ok(ctx.db.find_channel_by_short_channel_id(None, scid).await?),
        None => Ok(None),
    }
}

/// Fills the funding and closing block heights and times.
///
/// Data from the block explorer is authoritative and raises the matching flag. Without it the
/// current block height and time are recorded as provisional values, once, and the flag is cleared.
async fn enrich_block_data<Db>(ctx: &ServiceContext<Db>, node_id: i64, channel: &mut Channel)
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let (chain, network) = ctx.network_of(node_id);
    let current_height = Some(ctx.cache.get_block_height(chain, network)).filter(|h| *h > 0);

    if channel.status.rank() >= ChannelStatus::Open.rank() && !channel.flags.contains(ChannelFlags::FUNDED_ON) {
        let lookup = TransactionLookup {
            node_id,
            transaction_hash: channel.funding_transaction_hash.clone(),
            output_index: Some(channel.funding_output_index),
        };
        match block_details(ctx, lookup, current_height).await {
            Some(details) => {
                channel.funding_block_height = Some(details.block_height);
                channel.funded_on = Some(details.block_timestamp);
                channel.flags.add(ChannelFlags::FUNDED_ON);
            }
            None if channel.funded_on.is_none() => {
                channel.funding_block_height = channel.funding_block_height.or(current_height);
                channel.funded_on = Some(chrono::Utc::now());
                channel.flags.remove(ChannelFlags::FUNDED_ON);
            }
            None => {}
        }
    }

    if channel.status.is_closing_or_later() && !channel.flags.contains(ChannelFlags::CLOSED_ON) {
        let Some(closing_hash) = channel.closing_transaction_hash.clone() else {
            return;
        };
        let lookup = TransactionLookup {
            node_id,
            transaction_hash: closing_hash,
            output_index: None,
        };
        match block_details(ctx, lookup, current_height).await {
            Some(details) => {
                channel.closing_block_height = Some(details.block_height);
                channel.closed_on = Some(details.block_timestamp);
                channel.flags.add(ChannelFlags::CLOSED_ON);
            }
            None if channel.closed_on.is_none() => {
                channel.closing_block_height = channel.closing_block_height.or(current_height);
                channel.closed_on = Some(chrono::Utc::now());
                channel.flags.remove(ChannelFlags::CLOSED_ON);
            }
            None => {}
        }
    }
}

/// Asks the explorer for the block of the transaction.
///
/// A transaction the explorer did not know is not queried again before the block height moves.
async fn block_details<Db>(
    ctx: &ServiceContext<Db>,
    lookup: TransactionLookup,
    block_height: Option<u32>,
) -> Option<BlockDetails> {
    let explorer = ctx.explorer.as_ref()?;
    let block_height = block_height.unwrap_or_default();
    let transaction_hash = lookup.transaction_hash.clone();
    if ctx
        .explorer_misses
        .get(&transaction_hash)
        .is_some_and(|missed_at| *missed_at == block_height)
    {
        tracing::trace!(%transaction_hash, block_height, "transaction still unknown to the block explorer");
        return None;
    }

    match explorer.transaction_details(lookup).await {
        Ok(Some(details)) => {
            ctx.explorer_misses.remove(&transaction_hash);
            Some(details)
        }
        Ok(None) => {
            ctx.explorer_misses.insert(transaction_hash, block_height);
            None
        }
        Err(error) => {
            tracing::warn!(%transaction_hash, %error, "block explorer lookup failed");
            ctx.explorer_misses.insert(transaction_hash, block_height);
            None
        }
    }
}

/// Creates or updates the channel described by `update`.
///
/// The row is written only if a field changed. Afterwards the cached channel is refreshed
/// and, once the channel is closing, its runtime state is evicted.
#[tracing::instrument(level = "debug", skip(ctx, update), fields(node_id = update.node_id, channel_point = %update.channel_point))]
pub async fn add_channel_or_update_channel_status<Db>(ctx: &ServiceContext<Db>, update: ChannelUpdate) -> Result<Channel>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let channel = match find_channel(ctx, &update).await? {
        Some(existing) => {
            let mut merged = update.merge_into(&existing);
            enrich_block_data(ctx, update.node_id, &mut merged).await;

            if merged != existing {
                ctx.db.update_channel(None, merged.clone()).await?;
                tracing::info!(
                    channel_id = merged.channel_id,
                    status = ?merged.status,
                    "channel updated"
                );
                publish(ctx, &merged);
            }
            merged
        }
        None => {
            let mut fresh = update.to_channel();
            enrich_block_data(ctx, update.node_id, &mut fresh).await;

            let inserted = ctx.db.insert_channel(None, fresh).await?;
            tracing::info!(
                channel_id = inserted.channel_id,
                status = ?inserted.status,
                "channel added"
            );
            publish(ctx, &inserted);
            inserted
        }
    };

    ctx.cache.set_channel(channel.clone());
    ctx.cache.set_channel_peer_node(update.node_id, update.remote_node_id);
    if channel.status.is_closing_or_later() {
        ctx.cache.remove_channel_states_for_channel(channel.channel_id);
    }

    Ok(channel)
}

fn publish<Db>(ctx: &ServiceContext<Db>, channel: &Channel) {
    ctx.bus.publish(TorqEvent::ChannelUpdated(Box::new(channel.clone())));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use torq_types::prelude::{ChannelState, Network};

    use super::*;
    use crate::{
        test_support::{TestEnv, remote_node},
        vector::MockBlockExplorer,
    };

    const FUNDING_TX: &str = "ab00000000000000000000000000000000000000000000000000000000000001";
    const CLOSING_TX: &str = "cd00000000000000000000000000000000000000000000000000000000000002";

    fn open_update(node_id: i64, remote_node_id: i64) -> anyhow::Result<ChannelUpdate> {
        Ok(ChannelUpdate {
            node_id,
            remote_node_id,
            status: ChannelStatus::Open,
            channel_point: ChannelPoint::new(FUNDING_TX, 0),
            capacity: 1_000_000,
            initiating_node_id: Some(node_id),
            ..Default::default()
        }
        .with_short_channel_id(Some("700000x1x0".parse()?)))
    }

    #[tokio::test]
    async fn test_new_channel_is_added_once() -> anyhow::Result<()> {
        let env = TestEnv::lnd().await?;
        let remote = remote_node(&env.ctx, "03").await?;
        let mut events = env.ctx.bus.subscribe();

        let channel = add_channel_or_update_channel_status(&env.ctx, open_update(env.node_id, remote)?).await?;

        assert_ne!(channel.channel_id, 0);
        assert_eq!(channel.status, ChannelStatus::Open);
        assert_eq!(channel.first_node_id, env.node_id);
        assert_eq!(channel.second_node_id, remote);
        assert_eq!(channel.accepting_node_id, Some(remote));
        assert_eq!(channel.funding_block_height, Some(700000));
        assert!(channel.funded_on.is_some());
        assert!(!channel.flags.contains(ChannelFlags::FUNDED_ON));

        assert_eq!(env.ctx.cache.get_channel_id_by_short_channel_id("700000x1x0"), channel.channel_id);
        assert_eq!(env.ctx.cache.get_channel_peer_node_ids(env.node_id), vec![remote]);
        assert!(matches!(events.try_recv(), Ok(TorqEvent::ChannelUpdated(_))));

        let again = add_channel_or_update_channel_status(&env.ctx, open_update(env.node_id, remote)?).await?;
        assert_eq!(again, channel);
        // nothing changed, nothing announced
        assert!(events.try_recv().is_err());
        assert_eq!(env.ctx.db.get_channels(None, None).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_closing_uses_block_explorer_and_evicts_state() -> anyhow::Result<()> {
        let closed_at = chrono::DateTime::from_timestamp(1_700_000_000, 0).ok_or_else(|| anyhow::anyhow!("time"))?;
        let mut explorer = MockBlockExplorer::new();
        explorer
            .expect_transaction_details()
            .withf(|lookup| lookup.transaction_hash == CLOSING_TX)
            .returning(move |_| {
                Ok(Some(BlockDetails {
                    block_hash: "00aa".into(),
                    block_height: 700005,
                    block_timestamp: closed_at,
                    transaction_index: 1,
                    transaction_count: 10,
                }))
            });
        explorer
            .expect_transaction_details()
            .withf(|lookup| lookup.transaction_hash == FUNDING_TX)
            .returning(|_| Ok(None));

        let env = TestEnv::lnd().await?;
        let ctx = env.ctx.clone().with_explorer(Some(Arc::new(explorer)));
        let remote = remote_node(&ctx, "03").await?;

        let opened = add_channel_or_update_channel_status(&ctx, open_update(env.node_id, remote)?).await?;
        ctx.cache.set_channel_state(ChannelState {
            node_id: env.node_id,
            remote_node_id: remote,
            channel_id: opened.channel_id,
            capacity: 1_000_000,
            local_balance: 400_000,
            remote_balance: 600_000,
            ..Default::default()
        });

        let closed = add_channel_or_update_channel_status(
            &ctx,
            ChannelUpdate {
                status: ChannelStatus::CooperativeClosed,
                closing_transaction_hash: Some(CLOSING_TX.into()),
                closing_node_id: Some(remote),
                ..open_update(env.node_id, remote)?
            },
        )
        .await?;

        assert_eq!(closed.channel_id, opened.channel_id);
        assert_eq!(closed.status, ChannelStatus::CooperativeClosed);
        assert_eq!(closed.closing_transaction_hash.as_deref(), Some(CLOSING_TX));
        assert_eq!(closed.closing_block_height, Some(700005));
        assert_eq!(closed.closed_on, Some(closed_at));
        assert!(closed.flags.contains(ChannelFlags::CLOSED_ON));
        assert!(ctx.cache.get_channel_state(env.node_id, opened.channel_id).is_none());

        let stored = ctx
            .db
            .get_channel(None, opened.channel_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("channel must exist"))?;
        assert_eq!(stored.status, ChannelStatus::CooperativeClosed);
        assert_eq!(stored.closing_block_height, Some(700005));
        assert_eq!(stored.closing_node_id, Some(remote));
        assert!(stored.flags.contains(ChannelFlags::CLOSED_ON));
        Ok(())
    }

    #[tokio::test]
    async fn test_closed_channel_does_not_reopen() -> anyhow::Result<()> {
        let env = TestEnv::lnd().await?;
        env.ctx.cache.set_block_height(torq_types::prelude::Chain::Bitcoin, Network::RegTest, 700010);
        let remote = remote_node(&env.ctx, "03").await?;

        let closed = add_channel_or_update_channel_status(
            &env.ctx,
            ChannelUpdate {
                status: ChannelStatus::RemoteForceClosed,
                closing_transaction_hash: Some(CLOSING_TX.into()),
                ..open_update(env.node_id, remote)?
            },
        )
        .await?;
        // provisional closing data without the flag
        assert_eq!(closed.closing_block_height, Some(700010));
        assert!(closed.closed_on.is_some());
        assert!(!closed.flags.contains(ChannelFlags::CLOSED_ON));

        let after = add_channel_or_update_channel_status(&env.ctx, open_update(env.node_id, remote)?).await?;
        assert_eq!(after.status, ChannelStatus::RemoteForceClosed);
        Ok(())
    }

    #[tokio::test]
    async fn test_unmined_funding_is_queried_once_per_block() -> anyhow::Result<()> {
        let mut explorer = MockBlockExplorer::new();
        explorer
            .expect_transaction_details()
            .withf(|lookup| lookup.transaction_hash == FUNDING_TX)
            .times(2)
            .returning(|_| Ok(None));

        let env = TestEnv::lnd().await?;
        let ctx = env.ctx.clone().with_explorer(Some(Arc::new(explorer)));
        let chain = torq_types::prelude::Chain::Bitcoin;
        ctx.cache.set_block_height(chain, Network::RegTest, 700_000);
        let remote = remote_node(&ctx, "03").await?;

        add_channel_or_update_channel_status(&ctx, open_update(env.node_id, remote)?).await?;
        add_channel_or_update_channel_status(&ctx, open_update(env.node_id, remote)?).await?;
        assert_eq!(ctx.explorer_misses.get(FUNDING_TX).map(|h| *h), Some(700_000));

        ctx.cache.set_block_height(chain, Network::RegTest, 700_001);
        add_channel_or_update_channel_status(&ctx, open_update(env.node_id, remote)?).await?;
        add_channel_or_update_channel_status(&ctx, open_update(env.node_id, remote)?).await?;
        assert_eq!(ctx.explorer_misses.get(FUNDING_TX).map(|h| *h), Some(700_001));
        Ok(())
    }
}
