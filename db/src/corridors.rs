use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Select, Set,
};
use torq_db_entity::{
    channel_group, corridor,
    prelude::{ChannelGroup, Corridor},
};
use torq_types::prelude::{
    ChannelGroup as ChannelGroupEntry, ChannelGroupOrigin, Corridor as CorridorEntry, CorridorDiscriminators,
    CorridorType,
};

use crate::{
    OptTx, TorqDbGeneralModelOperations,
    db::TorqDb,
    errors::{DbSqlError, Result},
};

/// Defines DB API for corridors and the channel group projection derived from them.
#[async_trait]
pub trait TorqDbCorridorOperations {
    /// Returns all corridors of one type.
    async fn get_corridors<'a>(&'a self, tx: OptTx<'a>, corridor_type: CorridorType) -> Result<Vec<CorridorEntry>>;

    /// Stores the corridor, or updates the flag of an existing corridor with the same
    /// type, reference and discriminators. The priority is always derived from the discriminators.
    async fn upsert_corridor<'a>(&'a self, tx: OptTx<'a>, corridor: CorridorEntry) -> Result<CorridorEntry>;

    /// Deletes the corridor with exactly these discriminators. Returns the number of deleted rows.
    async fn delete_corridor<'a>(
        &'a self,
        tx: OptTx<'a>,
        corridor_type: CorridorType,
        reference_id: i64,
        discriminators: CorridorDiscriminators,
    ) -> Result<u64>;

    async fn get_channel_groups<'a>(
        &'a self,
        tx: OptTx<'a>,
        origin: Option<ChannelGroupOrigin>,
    ) -> Result<Vec<ChannelGroupEntry>>;

    /// Deletes every channel group row of `origin` and inserts `groups` instead.
    async fn replace_channel_groups<'a>(
        &'a self,
        tx: OptTx<'a>,
        origin: ChannelGroupOrigin,
        groups: Vec<ChannelGroupEntry>,
    ) -> Result<()>;
}

fn find_exact(
    corridor_type: CorridorType,
    reference_id: i64,
    discriminators: &CorridorDiscriminators,
) -> Select<Corridor> {
    let column = |query: Select<Corridor>, col: corridor::Column, value: Option<i64>| match value {
        Some(v) => query.filter(col.eq(v)),
        None => query.filter(col.is_null()),
    };

    let query = Corridor::find()
        .filter(corridor::Column::CorridorTypeId.eq(i32::from(corridor_type)))
        .filter(corridor::Column::ReferenceId.eq(reference_id));
    let query = column(query, corridor::Column::FromTagId, discriminators.from_tag_id);
    let query = column(query, corridor::Column::FromNodeId, discriminators.from_node_id);
    let query = column(query, corridor::Column::ToTagId, discriminators.to_tag_id);
    let query = column(query, corridor::Column::ToNodeId, discriminators.to_node_id);
    column(query, corridor::Column::ChannelId, discriminators.channel_id)
}

#[async_trait]
impl TorqDbCorridorOperations for TorqDb {
    async fn get_corridors<'a>(&'a self, tx: OptTx<'a>, corridor_type: CorridorType) -> Result<Vec<CorridorEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Corridor::find()
                        .filter(corridor::Column::CorridorTypeId.eq(i32::from(corridor_type)))
                        .order_by_asc(corridor::Column::CorridorId)
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| CorridorEntry::try_from(m).map_err(DbSqlError::from))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await
    }

    async fn upsert_corridor<'a>(&'a self, tx: OptTx<'a>, corridor: CorridorEntry) -> Result<CorridorEntry> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let existing = find_exact(corridor.corridor_type, corridor.reference_id, &corridor.discriminators)
                        .one(tx.as_ref())
                        .await?;

                    let model = match existing {
                        Some(model) if model.flag == corridor.flag => model,
                        Some(model) => {
                            let mut active = model.into_active_model();
                            active.flag = Set(corridor.flag);
                            active.update(tx.as_ref()).await?
                        }
                        None => {
                            let d = corridor.discriminators;
                            corridor::ActiveModel {
                                corridor_type_id: Set(i32::from(corridor.corridor_type)),
                                reference_id: Set(corridor.reference_id),
                                flag: Set(corridor.flag),
                                inverse: Set(corridor.inverse),
                                priority: Set(i32::from(d.priority())),
                                from_tag_id: Set(d.from_tag_id),
                                from_node_id: Set(d.from_node_id),
                                to_tag_id: Set(d.to_tag_id),
                                to_node_id: Set(d.to_node_id),
                                channel_id: Set(d.channel_id),
                                created_on: Set(chrono::Utc::now()),
                                ..Default::default()
                            }
                            .insert(tx.as_ref())
                            .await?
                        }
                    };

                    Ok::<_, DbSqlError>(CorridorEntry::try_from(model)?)
                })
            })
            .await
    }

    async fn delete_corridor<'a>(
        &'a self,
        tx: OptTx<'a>,
        corridor_type: CorridorType,
        reference_id: i64,
        discriminators: CorridorDiscriminators,
    ) -> Result<u64> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let ids: Vec<i64> = find_exact(corridor_type, reference_id, &discriminators)
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| m.corridor_id)
                        .collect();
                    if ids.is_empty() {
                        return Ok(0);
                    }

                    let res = Corridor::delete_many()
                        .filter(corridor::Column::CorridorId.is_in(ids))
                        .exec(tx.as_ref())
                        .await?;
                    Ok::<_, DbSqlError>(res.rows_affected)
                })
            })
            .await
    }

    async fn get_channel_groups<'a>(
        &'a self,
        tx: OptTx<'a>,
        origin: Option<ChannelGroupOrigin>,
    ) -> Result<Vec<ChannelGroupEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let mut query = ChannelGroup::find().order_by_asc(channel_group::Column::Id);
                    if let Some(origin) = origin {
                        query = query.filter(channel_group::Column::OriginId.eq(i32::from(origin)));
                    }
                    query
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| ChannelGroupEntry::try_from(m).map_err(DbSqlError::from))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await
    }

    async fn replace_channel_groups<'a>(
        &'a self,
        tx: OptTx<'a>,
        origin: ChannelGroupOrigin,
        groups: Vec<ChannelGroupEntry>,
    ) -> Result<()> {
        if let Some(foreign) = groups.iter().find(|g| g.origin != origin) {
            return Err(DbSqlError::LogicalError(format!(
                "channel group of origin {:?} cannot replace origin {origin:?}",
                foreign.origin
            )));
        }

        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let deleted = ChannelGroup::delete_many()
                        .filter(channel_group::Column::OriginId.eq(i32::from(origin)))
                        .exec(tx.as_ref())
                        .await?
                        .rows_affected;

                    let count = groups.len();
                    if !groups.is_empty() {
                        ChannelGroup::insert_many(groups.into_iter().map(|g| channel_group::ActiveModel {
                            channel_id: Set(g.channel_id),
                            category_id: Set(g.category_id),
                            tag_id: Set(g.tag_id),
                            origin_id: Set(i32::from(g.origin)),
                            ..Default::default()
                        }))
                        .exec(tx.as_ref())
                        .await?;
                    }

                    tracing::debug!(?origin, deleted, inserted = count, "channel groups replaced");
                    Ok::<_, DbSqlError>(())
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_corridor_updates_flag_in_place() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let discriminators = CorridorDiscriminators {
            from_node_id: Some(7),
            ..Default::default()
        };

        let first = db
            .upsert_corridor(None, CorridorEntry::new(CorridorType::Tag, 3, discriminators, 1))
            .await?;
        let second = db
            .upsert_corridor(None, CorridorEntry::new(CorridorType::Tag, 3, discriminators, 0))
            .await?;

        assert_eq!(first.corridor_id, second.corridor_id);
        assert_eq!(second.flag, 0);
        assert_eq!(second.priority, discriminators.priority());
        assert_eq!(db.get_corridors(None, CorridorType::Tag).await?.len(), 1);
        assert!(db.get_corridors(None, CorridorType::AutoFee).await?.is_empty());

        assert_eq!(db.delete_corridor(None, CorridorType::Tag, 3, discriminators).await?, 1);
        assert_eq!(db.delete_corridor(None, CorridorType::Tag, 3, discriminators).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_channel_groups_only_touches_one_origin() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;

        let tag_group = |channel_id, tag_id| ChannelGroupEntry {
            channel_id,
            category_id: None,
            tag_id: Some(tag_id),
            origin: ChannelGroupOrigin::Tag,
        };
        let category_group = ChannelGroupEntry {
            channel_id: 1,
            category_id: Some(4),
            tag_id: None,
            origin: ChannelGroupOrigin::Category,
        };

        db.replace_channel_groups(None, ChannelGroupOrigin::Category, vec![category_group])
            .await?;
        db.replace_channel_groups(None, ChannelGroupOrigin::Tag, vec![tag_group(1, 2), tag_group(2, 2)])
            .await?;
        db.replace_channel_groups(None, ChannelGroupOrigin::Tag, vec![tag_group(2, 2)])
            .await?;

        assert_eq!(
            db.get_channel_groups(None, Some(ChannelGroupOrigin::Tag)).await?,
            vec![tag_group(2, 2)]
        );
        assert_eq!(
            db.get_channel_groups(None, Some(ChannelGroupOrigin::Category)).await?,
            vec![category_group]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_channel_groups_rejects_mixed_origins() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;

        let res = db
            .replace_channel_groups(
                None,
                ChannelGroupOrigin::Tag,
                vec![ChannelGroupEntry {
                    channel_id: 1,
                    category_id: Some(1),
                    tag_id: None,
                    origin: ChannelGroupOrigin::Category,
                }],
            )
            .await;

        assert!(matches!(res, Err(DbSqlError::LogicalError(_))));
        Ok(())
    }
}
