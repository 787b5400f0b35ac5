use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set};
use torq_db_entity::{channel, conversions::channels::apply_channel_fields, prelude::Channel};
use torq_types::prelude::{Channel as ChannelEntry, ChannelStatus};

use crate::{
    OptTx, TorqDbGeneralModelOperations,
    db::TorqDb,
    errors::{DbSqlError, Result},
};

/// Defines DB API for Lightning channels.
#[async_trait]
pub trait TorqDbChannelOperations {
    /// Inserts a new channel and returns it with its assigned id.
    async fn insert_channel<'a>(&'a self, tx: OptTx<'a>, channel: ChannelEntry) -> Result<ChannelEntry>;

    /// Writes all mutable fields of an existing channel.
    async fn update_channel<'a>(&'a self, tx: OptTx<'a>, channel: ChannelEntry) -> Result<()>;

    async fn get_channel<'a>(&'a self, tx: OptTx<'a>, channel_id: i64) -> Result<Option<ChannelEntry>>;

    async fn find_channel_by_funding_transaction<'a>(
        &'a self,
        tx: OptTx<'a>,
        funding_transaction_hash: &str,
        funding_output_index: u32,
    ) -> Result<Option<ChannelEntry>>;

    async fn find_channel_by_short_channel_id<'a>(
        &'a self,
        tx: OptTx<'a>,
        short_channel_id: &str,
    ) -> Result<Option<ChannelEntry>>;

    /// Returns all channels, optionally restricted to those having `node_id` as an endpoint.
    async fn get_channels<'a>(&'a self, tx: OptTx<'a>, node_id: Option<i64>) -> Result<Vec<ChannelEntry>>;

    /// Returns the channels of `node_id` whose status is below `Closing`.
    async fn get_open_channels<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<ChannelEntry>>;
}

fn endpoint_condition(node_id: i64) -> Condition {
    Condition::any()
        .add(channel::Column::FirstNodeId.eq(node_id))
        .add(channel::Column::SecondNodeId.eq(node_id))
}

fn to_entries(models: Vec<channel::Model>) -> Result<Vec<ChannelEntry>> {
    models
        .into_iter()
        .map(|m| ChannelEntry::try_from(m).map_err(DbSqlError::from))
        .collect()
}

#[async_trait]
impl TorqDbChannelOperations for TorqDb {
    async fn insert_channel<'a>(&'a self, tx: OptTx<'a>, channel: ChannelEntry) -> Result<ChannelEntry> {
        channel.validate_endpoints()?;

        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let now = chrono::Utc::now();
                    let mut model = channel::ActiveModel {
                        funding_transaction_hash: Set(channel.funding_transaction_hash.clone()),
                        funding_output_index: Set(i32::try_from(channel.funding_output_index)?),
                        first_node_id: Set(channel.first_node_id),
                        second_node_id: Set(channel.second_node_id),
                        created_on: Set(now),
                        updated_on: Set(now),
                        ..Default::default()
                    };
                    apply_channel_fields(&mut model, &channel);

                    let inserted = model.insert(tx.as_ref()).await?;
                    tracing::debug!(
                        channel_id = inserted.channel_id,
                        channel_point = %channel.channel_point(),
                        "channel inserted"
                    );

                    Ok::<_, DbSqlError>(ChannelEntry::try_from(inserted)?)
                })
            })
            .await
    }

    async fn update_channel<'a>(&'a self, tx: OptTx<'a>, channel: ChannelEntry) -> Result<()> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let existing = Channel::find_by_id(channel.channel_id)
                        .one(tx.as_ref())
                        .await?
                        .ok_or_else(|| DbSqlError::MissingEntry(format!("channel {}", channel.channel_id)))?;

                    let current = ChannelStatus::try_from(existing.status_id)?;
                    if !current.can_transition_to(channel.status) {
                        return Err(DbSqlError::LogicalError(format!(
                            "channel {} cannot move from {current:?} to {:?}",
                            channel.channel_id, channel.status
                        )));
                    }

                    let mut model = existing.into_active_model();
                    apply_channel_fields(&mut model, &channel);
                    model.updated_on = Set(chrono::Utc::now());
                    model.update(tx.as_ref()).await?;

                    Ok::<_, DbSqlError>(())
                })
            })
            .await
    }

    async fn get_channel<'a>(&'a self, tx: OptTx<'a>, channel_id: i64) -> Result<Option<ChannelEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Ok::<_, DbSqlError>(
                        Channel::find_by_id(channel_id)
                            .one(tx.as_ref())
                            .await?
                            .map(ChannelEntry::try_from)
                            .transpose()?,
                    )
                })
            })
            .await
    }

    async fn find_channel_by_funding_transaction<'a>(
        &'a self,
        tx: OptTx<'a>,
        funding_transaction_hash: &str,
        funding_output_index: u32,
    ) -> Result<Option<ChannelEntry>> {
        let hash = funding_transaction_hash.to_string();
        let index = i32::try_from(funding_output_index)?;
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Ok::<_, DbSqlError>(
                        Channel::find()
                            .filter(channel::Column::FundingTransactionHash.eq(hash))
                            .filter(channel::Column::FundingOutputIndex.eq(index))
                            .one(tx.as_ref())
                            .await?
                            .map(ChannelEntry::try_from)
                            .transpose()?,
                    )
                })
            })
            .await
    }

    async fn find_channel_by_short_channel_id<'a>(
        &'a self,
        tx: OptTx<'a>,
        short_channel_id: &str,
    ) -> Result<Option<ChannelEntry>> {
        let scid = short_channel_id.to_string();
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Ok::<_, DbSqlError>(
                        Channel::find()
                            .filter(channel::Column::ShortChannelId.eq(scid))
                            .one(tx.as_ref())
                            .await?
                            .map(ChannelEntry::try_from)
                            .transpose()?,
                    )
                })
            })
            .await
    }

    async fn get_channels<'a>(&'a self, tx: OptTx<'a>, node_id: Option<i64>) -> Result<Vec<ChannelEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let mut query = Channel::find().order_by_asc(channel::Column::ChannelId);
                    if let Some(node_id) = node_id {
                        query = query.filter(endpoint_condition(node_id));
                    }
                    to_entries(query.all(tx.as_ref()).await?)
                })
            })
            .await
    }

    async fn get_open_channels<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<ChannelEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let models = Channel::find()
                        .filter(endpoint_condition(node_id))
                        .filter(
                            channel::Column::StatusId
                                .is_in([i32::from(ChannelStatus::Opening), i32::from(ChannelStatus::Open)]),
                        )
                        .order_by_asc(channel::Column::ChannelId)
                        .all(tx.as_ref())
                        .await?;
                    to_entries(models)
                })
            })
            .await
    }
}
