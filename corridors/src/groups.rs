use std::collections::BTreeSet;

use torq_db::TorqDbAllOperations;
use torq_types::prelude::{Channel, ChannelGroup, ChannelGroupOrigin, CorridorKey, CorridorType, Tag};

use crate::{
    engine::CorridorEngine,
    errors::{CorridorError, Result},
};

/// Number of rows written by one channel group regeneration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelGroupSummary {
    pub category_groups: usize,
    pub tag_groups: usize,
}

/// `true` if the tag applies to the channel in either direction.
fn tag_applies(engine: &CorridorEngine, tag_id: i64, channel: &Channel) -> bool {
    let forward = CorridorKey::new(CorridorType::Tag, tag_id)
        .from_node(channel.first_node_id)
        .to_node(channel.second_node_id)
        .channel(channel.channel_id);
    let backward = CorridorKey::new(CorridorType::Tag, tag_id)
        .from_node(channel.second_node_id)
        .to_node(channel.first_node_id)
        .channel(channel.channel_id);

    engine.get_best_corridor_flag(&forward) > 0 || engine.get_best_corridor_flag(&backward) > 0
}

/// Computes the channel group rows of both origins, sorted.
pub fn compute_channel_groups(
    engine: &CorridorEngine,
    channels: &[Channel],
    tags: &[Tag],
) -> (Vec<ChannelGroup>, Vec<ChannelGroup>) {
    let mut by_category = BTreeSet::new();
    let mut by_tag = BTreeSet::new();

    for channel in channels.iter().filter(|c| !c.status.is_closed()) {
        for tag in tags.iter().filter(|t| tag_applies(engine, t.tag_id, channel)) {
            by_tag.insert(ChannelGroup {
                channel_id: channel.channel_id,
                category_id: tag.category_id,
                tag_id: Some(tag.tag_id),
                origin: ChannelGroupOrigin::Tag,
            });
            if let Some(category_id) = tag.category_id {
                by_category.insert(ChannelGroup {
                    channel_id: channel.channel_id,
                    category_id: Some(category_id),
                    tag_id: None,
                    origin: ChannelGroupOrigin::Category,
                });
            }
        }
    }

    (by_category.into_iter().collect(), by_tag.into_iter().collect())
}

/// Rebuilds the `channel_group` projection from the live Tag corridors.
///
/// Runs in a single database transaction: either both origins are replaced or nothing changes.
#[tracing::instrument(level = "debug", skip_all, err)]
pub async fn regenerate_channel_groups<Db>(db: &Db, engine: &CorridorEngine) -> Result<ChannelGroupSummary>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let myself = db.clone();
    let engine = engine.clone();

    let summary = db
        .begin_transaction()
        .await?
        .perform(|tx| {
            Box::pin(async move {
                let channels = myself.get_channels(Some(tx), None).await?;
                let tags = myself.get_tags(Some(tx)).await?;

                let (by_category, by_tag) = compute_channel_groups(&engine, &channels, &tags);
                let summary = ChannelGroupSummary {
                    category_groups: by_category.len(),
                    tag_groups: by_tag.len(),
                };

                myself
                    .replace_channel_groups(Some(tx), ChannelGroupOrigin::Category, by_category)
                    .await?;
                myself
                    .replace_channel_groups(Some(tx), ChannelGroupOrigin::Tag, by_tag)
                    .await?;

                Ok::<_, CorridorError>(summary)
            })
        })
        .await?;

    tracing::info!(
        category_groups = summary.category_groups,
        tag_groups = summary.tag_groups,
        "channel groups regenerated"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use torq_db::{
        channels::TorqDbChannelOperations, corridors::TorqDbCorridorOperations, db::TorqDb,
        nodes::TorqDbNodeOperations, tags::TorqDbTagOperations,
    };
    use torq_types::prelude::{Chain, ChannelStatus, Corridor, CorridorDiscriminators, Network};

    use super::*;

    async fn fixture(db: &TorqDb) -> anyhow::Result<(Channel, Channel, Tag, Tag)> {
        let mut ids = Vec::new();
        for key in ["a", "b", "c"] {
            let node = db
                .get_or_create_node(None, &format!("02{}", key.repeat(64)), Chain::Bitcoin, Network::RegTest)
                .await?;
            ids.push(node.node_id);
        }

        let first = db
            .insert_channel(
                None,
                Channel {
                    funding_transaction_hash: "01".repeat(32),
                    first_node_id: ids[0],
                    second_node_id: ids[1],
                    status: ChannelStatus::Open,
                    ..Default::default()
                },
            )
            .await?;
        let second = db
            .insert_channel(
                None,
                Channel {
                    funding_transaction_hash: "02".repeat(32),
                    first_node_id: ids[2],
                    second_node_id: ids[0],
                    status: ChannelStatus::Open,
                    ..Default::default()
                },
            )
            .await?;

        let category = db.insert_category(None, "liquidity", "primary").await?;
        let sink = db.insert_tag(None, "sink", "error", Some(category.category_id)).await?;
        let loose = db.insert_tag(None, "watch", "warning", None).await?;
        Ok((first, second, sink, loose))
    }

    #[tokio::test]
    async fn test_node_tag_applies_in_both_directions() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let (first, second, sink, _) = fixture(&db).await?;

        // node b only takes part in the first channel, as second endpoint
        db.upsert_corridor(
            None,
            Corridor::new(
                CorridorType::Tag,
                sink.tag_id,
                CorridorDiscriminators {
                    from_node_id: Some(first.second_node_id),
                    ..Default::default()
                },
                1,
            ),
        )
        .await?;

        let engine = CorridorEngine::new();
        engine.refresh_all(&db).await?;
        let summary = regenerate_channel_groups(&db, &engine).await?;

        assert_eq!(
            summary,
            ChannelGroupSummary {
                category_groups: 1,
                tag_groups: 1
            }
        );
        let groups = db.get_channel_groups(None, None).await?;
        assert!(groups.iter().all(|g| g.channel_id == first.channel_id));
        assert!(!groups.iter().any(|g| g.channel_id == second.channel_id));
        Ok(())
    }

    #[tokio::test]
    async fn test_channel_override_removes_node_tag() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let (first, second, _, loose) = fixture(&db).await?;
        let shared_node = first.first_node_id;

        let engine = CorridorEngine::new();
        engine.load(
            CorridorType::Tag,
            vec![
                Corridor::new(
                    CorridorType::Tag,
                    loose.tag_id,
                    CorridorDiscriminators {
                        from_node_id: Some(shared_node),
                        ..Default::default()
                    },
                    1,
                ),
                Corridor::new(
                    CorridorType::Tag,
                    loose.tag_id,
                    CorridorDiscriminators {
                        from_node_id: Some(shared_node),
                        channel_id: Some(second.channel_id),
                        ..Default::default()
                    },
                    0,
                ),
            ],
        );

        regenerate_channel_groups(&db, &engine).await?;

        let groups = db.get_channel_groups(None, Some(ChannelGroupOrigin::Tag)).await?;
        assert_eq!(
            groups,
            vec![ChannelGroup {
                channel_id: first.channel_id,
                category_id: None,
                tag_id: Some(loose.tag_id),
                origin: ChannelGroupOrigin::Tag,
            }]
        );
        assert!(db.get_channel_groups(None, Some(ChannelGroupOrigin::Category)).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_regeneration_is_idempotent() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let (first, _, sink, _) = fixture(&db).await?;

        let engine = CorridorEngine::new();
        engine.load(
            CorridorType::Tag,
            vec![Corridor::new(
                CorridorType::Tag,
                sink.tag_id,
                CorridorDiscriminators {
                    channel_id: Some(first.channel_id),
                    ..Default::default()
                },
                1,
            )],
        );

        regenerate_channel_groups(&db, &engine).await?;
        let once = db.get_channel_groups(None, None).await?;
        regenerate_channel_groups(&db, &engine).await?;
        let twice = db.get_channel_groups(None, None).await?;

        assert_eq!(once.len(), 2);
        assert_eq!(once, twice);
        Ok(())
    }
}
