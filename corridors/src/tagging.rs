use torq_cache::TorqCache;
use torq_db::TorqDbAllOperations;
use torq_types::prelude::{Corridor, CorridorDiscriminators, CorridorType, TagTarget, TaggedEntity};

use crate::{
    engine::CorridorEngine,
    errors::{CorridorError, Result},
    groups::regenerate_channel_groups,
};

/// Flag of the corridor created when a tag is attached.
const TAGGED_FLAG: i32 = 1;

fn tag_corridor_discriminators(target: TagTarget) -> CorridorDiscriminators {
    match target {
        TagTarget::Node(node_id) => CorridorDiscriminators {
            from_node_id: Some(node_id),
            ..Default::default()
        },
        TagTarget::Channel(channel_id) => CorridorDiscriminators {
            channel_id: Some(channel_id),
            ..Default::default()
        },
    }
}

/// Attaches and detaches tags.
///
/// The Tag corridors are the source of truth for tag membership; the `tagged_entity`
/// rows list the explicit attachments and the `channel_group` rows are the projection
/// regenerated after every change.
#[derive(Debug, Clone)]
pub struct TagManager<Db> {
    db: Db,
    cache: TorqCache,
    engine: CorridorEngine,
}

impl<Db> TagManager<Db>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    pub fn new(db: Db, cache: TorqCache, engine: CorridorEngine) -> Self {
        Self { db, cache, engine }
    }

    pub async fn tag_node(&self, tag_id: i64, node_id: i64) -> Result<bool> {
        self.attach(TaggedEntity {
            tag_id,
            target: TagTarget::Node(node_id),
        })
        .await
    }

    pub async fn untag_node(&self, tag_id: i64, node_id: i64) -> Result<bool> {
        self.detach(TaggedEntity {
            tag_id,
            target: TagTarget::Node(node_id),
        })
        .await
    }

    pub async fn tag_channel(&self, tag_id: i64, channel_id: i64) -> Result<bool> {
        self.attach(TaggedEntity {
            tag_id,
            target: TagTarget::Channel(channel_id),
        })
        .await
    }

    pub async fn untag_channel(&self, tag_id: i64, channel_id: i64) -> Result<bool> {
        self.detach(TaggedEntity {
            tag_id,
            target: TagTarget::Channel(channel_id),
        })
        .await
    }

    /// Attaches the tag and records the matching Tag corridor.
    ///
    /// Returns `false` if the tag was already attached.
    #[tracing::instrument(level = "debug", skip(self), err)]
    pub async fn attach(&self, entity: TaggedEntity) -> Result<bool> {
        if self.db.get_tag(None, entity.tag_id).await?.is_none() {
            return Err(CorridorError::NotFound(format!("tag {}", entity.tag_id)));
        }
        match entity.target {
            TagTarget::Node(id) | TagTarget::Channel(id) if id <= 0 => {
                return Err(CorridorError::InvalidTarget(format!("{:?}", entity.target)));
            }
            _ => {}
        }

        let myself = self.db.clone();
        let inserted = self
            .db
            .begin_transaction()
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let inserted = myself.insert_tagged_entity(Some(tx), entity).await?;
                    myself
                        .upsert_corridor(
                            Some(tx),
                            Corridor::new(
                                CorridorType::Tag,
                                entity.tag_id,
                                tag_corridor_discriminators(entity.target),
                                TAGGED_FLAG,
                            ),
                        )
                        .await?;
                    Ok::<_, CorridorError>(inserted)
                })
            })
            .await?;

        self.after_change().await?;
        Ok(inserted)
    }

    /// Detaches the tag and removes the matching Tag corridor.
    ///
    /// Returns `false` if the tag was not attached.
    #[tracing::instrument(level = "debug", skip(self), err)]
    pub async fn detach(&self, entity: TaggedEntity) -> Result<bool> {
        let myself = self.db.clone();
        let deleted = self
            .db
            .begin_transaction()
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let deleted = myself.delete_tagged_entity(Some(tx), entity).await?;
                    myself
                        .delete_corridor(
                            Some(tx),
                            CorridorType::Tag,
                            entity.tag_id,
                            tag_corridor_discriminators(entity.target),
                        )
                        .await?;
                    Ok::<_, CorridorError>(deleted)
                })
            })
            .await?;

        self.after_change().await?;
        Ok(deleted)
    }

    /// Reloads the tags and their memberships into the cache.
    pub async fn refresh_tag_cache(&self) -> Result<()> {
        let tags = self.db.get_tags(None).await?;
        let memberships = self.db.get_tagged_entities(None).await?;
        self.cache.set_tags(tags, &memberships);
        Ok(())
    }

    async fn after_change(&self) -> Result<()> {
        self.engine
            .refresh_corridor_cache_by_type(&self.db, CorridorType::Tag)
            .await?;
        regenerate_channel_groups(&self.db, &self.engine).await?;
        self.refresh_tag_cache().await
    }
}

#[cfg(test)]
mod tests {
    use torq_db::{
        channels::TorqDbChannelOperations, corridors::TorqDbCorridorOperations, db::TorqDb,
        nodes::TorqDbNodeOperations, tags::TorqDbTagOperations,
    };
    use torq_types::prelude::{Chain, Channel, ChannelGroupOrigin, ChannelStatus, CorridorKey, Network};

    use super::*;

    async fn manager_with_channel() -> anyhow::Result<(TagManager<TorqDb>, Channel)> {
        let db = TorqDb::new_in_memory().await?;
        let local = db
            .get_or_create_node(None, &format!("02{}", "d".repeat(64)), Chain::Bitcoin, Network::MainNet)
            .await?;
        let remote = db
            .get_or_create_node(None, &format!("03{}", "e".repeat(64)), Chain::Bitcoin, Network::MainNet)
            .await?;
        let channel = db
            .insert_channel(
                None,
                Channel {
                    funding_transaction_hash: "0f".repeat(32),
                    first_node_id: local.node_id,
                    second_node_id: remote.node_id,
                    status: ChannelStatus::Open,
                    ..Default::default()
                },
            )
            .await?;

        Ok((TagManager::new(db, TorqCache::new(), CorridorEngine::new()), channel))
    }

    #[tokio::test]
    async fn test_tagging_a_node_groups_its_channels() -> anyhow::Result<()> {
        let (manager, channel) = manager_with_channel().await?;
        let tag = manager.db.insert_tag(None, "exchange", "primary", None).await?;

        assert!(manager.tag_node(tag.tag_id, channel.second_node_id).await?);
        assert!(!manager.tag_node(tag.tag_id, channel.second_node_id).await?);

        let key = CorridorKey::new(CorridorType::Tag, tag.tag_id).from_node(channel.second_node_id);
        assert_eq!(manager.engine.get_best_corridor_flag(&key), TAGGED_FLAG);
        assert_eq!(manager.cache.get_tag_ids_by_node_id(channel.second_node_id), vec![tag.tag_id]);
        assert_eq!(
            manager
                .db
                .get_channel_groups(None, Some(ChannelGroupOrigin::Tag))
                .await?
                .len(),
            1
        );

        assert!(manager.untag_node(tag.tag_id, channel.second_node_id).await?);
        assert_eq!(manager.engine.get_best_corridor_flag(&key), 0);
        assert!(manager.cache.get_tag_ids_by_node_id(channel.second_node_id).is_empty());
        assert!(manager.db.get_channel_groups(None, None).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_tagging_a_channel() -> anyhow::Result<()> {
        let (manager, channel) = manager_with_channel().await?;
        let category = manager.db.insert_category(None, "routing", "primary").await?;
        let tag = manager
            .db
            .insert_tag(None, "balanced", "success", Some(category.category_id))
            .await?;

        manager.tag_channel(tag.tag_id, channel.channel_id).await?;

        let groups = manager.db.get_channel_groups(None, None).await?;
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.channel_id == channel.channel_id));
        assert_eq!(manager.cache.get_tag_ids_by_channel_id(channel.channel_id), vec![tag.tag_id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tag_is_rejected() -> anyhow::Result<()> {
        let (manager, channel) = manager_with_channel().await?;

        assert!(matches!(
            manager.tag_channel(99, channel.channel_id).await,
            Err(CorridorError::NotFound(_))
        ));
        assert!(manager.db.get_tagged_entities(None).await?.is_empty());
        Ok(())
    }
}
