//! Fills the cache from the database before any service starts, and again on reload.

use std::collections::{BTreeSet, HashMap};

use torq_cache::TorqCache;
use torq_db::TorqDbAllOperations;
use torq_types::prelude::{NodeSettings, NodeStatus};

use crate::errors::Result;

/// Loads settings, nodes, managed node connection details and channels into `cache`.
///
/// Managed nodes that are deleted in the database, or were cached before and no longer have
/// connection details, are marked deleted and lose their connection details and peer sets.
/// Tags are loaded by the tag manager.
#[tracing::instrument(level = "debug", skip_all, err)]
pub async fn bootstrap_cache<Db>(db: &Db, cache: &TorqCache) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    cache.set_settings(db.get_settings(None).await?);

    let nodes = db.get_nodes(None).await?;
    for node in &nodes {
        cache.set_node(node);
    }

    let mut managed: HashMap<i64, BTreeSet<i64>> = HashMap::new();
    for details in db.get_all_node_connection_details(None, None).await? {
        if details.status == NodeStatus::Deleted {
            continue;
        }
        let Some(node) = nodes.iter().find(|n| n.node_id == details.node_id) else {
            tracing::warn!(node_id = details.node_id, "connection details without a node");
            continue;
        };

        cache.set_node_settings(NodeSettings {
            node_id: node.node_id,
            public_key: node.public_key.clone(),
            chain: node.chain,
            network: node.network,
            implementation: details.implementation,
            name: Some(details.name.clone()),
            status: details.status,
            ping_system: details.ping_system,
            torq_node: true,
        });
        cache.set_node_alias(node.node_id, details.name.clone());
        managed.insert(details.node_id, BTreeSet::new());
        cache.set_node_connection_details(details);
    }

    for node_id in cache.get_managed_node_ids() {
        if !managed.contains_key(&node_id) {
            tracing::info!(node_id, "managed node removed");
            cache.remove_managed_node(node_id);
        }
    }

    let channels = db.get_channels(None, None).await?;
    let channel_count = channels.len();
    for channel in channels {
        if !channel.status.is_closing_or_later() {
            for (local, remote) in [
                (channel.first_node_id, channel.second_node_id),
                (channel.second_node_id, channel.first_node_id),
            ] {
                if let Some(peers) = managed.get_mut(&local) {
                    peers.insert(remote);
                }
            }
        }
        cache.set_channel(channel);
    }

    let managed_count = managed.len();
    for (node_id, peers) in managed {
        cache.set_channel_peer_nodes(node_id, peers);
    }

    tracing::info!(
        nodes = nodes.len(),
        managed = managed_count,
        channels = channel_count,
        "cache bootstrapped"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use torq_db::{channels::TorqDbChannelOperations, db::TorqDb, nodes::TorqDbNodeOperations};
    use torq_types::prelude::{Chain, Channel, ChannelStatus, Implementation, Network, NodeConnectionDetails};

    use super::*;
    use crate::test_support::public_key;

    #[tokio::test]
    async fn test_managed_nodes_and_channels_are_cached() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let alice = db
            .get_or_create_node(None, &public_key("02"), Chain::Bitcoin, Network::RegTest)
            .await?;
        let bob = db
            .get_or_create_node(None, &public_key("03"), Chain::Bitcoin, Network::RegTest)
            .await?;
        let carol = db
            .get_or_create_node(None, &public_key("04"), Chain::Bitcoin, Network::RegTest)
            .await?;
        db.insert_node_connection_details(
            None,
            NodeConnectionDetails {
                node_id: alice.node_id,
                name: "alice".into(),
                implementation: Implementation::Cln,
                status: NodeStatus::Active,
                ..Default::default()
            },
        )
        .await?;
        let open = db
            .insert_channel(
                None,
                Channel {
                    short_channel_id: Some("800000x1x0".into()),
                    funding_transaction_hash: "01".repeat(32),
                    capacity: 1_000_000,
                    first_node_id: bob.node_id,
                    second_node_id: alice.node_id,
                    status: ChannelStatus::Open,
                    ..Default::default()
                },
            )
            .await?;
        db.insert_channel(
            None,
            Channel {
                funding_transaction_hash: "02".repeat(32),
                capacity: 1_000_000,
                first_node_id: alice.node_id,
                second_node_id: carol.node_id,
                status: ChannelStatus::CooperativeClosed,
                ..Default::default()
            },
        )
        .await?;

        let cache = TorqCache::new();
        bootstrap_cache(&db, &cache).await?;

        assert_eq!(cache.get_active_torq_node_ids(), vec![alice.node_id]);
        assert_eq!(cache.get_node_alias(alice.node_id), "alice");
        assert_eq!(cache.get_node_connection_details(alice.node_id).implementation, Implementation::Cln);
        assert!(!cache.get_node_settings_by_node_id(carol.node_id).torq_node);
        assert_eq!(cache.get_channel_id_by_short_channel_id("800000x1x0"), open.channel_id);
        assert_eq!(cache.get_channel_peer_node_ids(alice.node_id), vec![bob.node_id]);
        assert_eq!(cache.get_channels().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_reload_forgets_deleted_node_and_closed_channel_peers() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let alice = db
            .get_or_create_node(None, &public_key("02"), Chain::Bitcoin, Network::RegTest)
            .await?;
        let bob = db
            .get_or_create_node(None, &public_key("03"), Chain::Bitcoin, Network::RegTest)
            .await?;
        let dave = db
            .get_or_create_node(None, &public_key("05"), Chain::Bitcoin, Network::RegTest)
            .await?;
        for (node, name) in [(&alice, "alice"), (&dave, "dave")] {
            db.insert_node_connection_details(
                None,
                NodeConnectionDetails {
                    node_id: node.node_id,
                    name: name.into(),
                    implementation: Implementation::Lnd,
                    status: NodeStatus::Active,
                    ..Default::default()
                },
            )
            .await?;
        }
        let mut channel = db
            .insert_channel(
                None,
                Channel {
                    funding_transaction_hash: "03".repeat(32),
                    capacity: 1_000_000,
                    first_node_id: dave.node_id,
                    second_node_id: bob.node_id,
                    status: ChannelStatus::Open,
                    ..Default::default()
                },
            )
            .await?;

        let cache = TorqCache::new();
        bootstrap_cache(&db, &cache).await?;
        cache.set_connected_peer_node(alice.node_id, bob.node_id);
        assert_eq!(cache.get_active_torq_node_ids(), vec![alice.node_id, dave.node_id]);
        assert_eq!(cache.get_channel_peer_node_ids(dave.node_id), vec![bob.node_id]);

        db.set_node_connection_status(None, alice.node_id, NodeStatus::Deleted).await?;
        channel.status = ChannelStatus::CooperativeClosed;
        db.update_channel(None, channel).await?;
        bootstrap_cache(&db, &cache).await?;

        assert_eq!(cache.get_active_torq_node_ids(), vec![dave.node_id]);
        assert_eq!(cache.get_node_settings_by_node_id(alice.node_id).status, NodeStatus::Deleted);
        assert_eq!(cache.get_node_connection_details(alice.node_id).node_id, 0);
        assert!(cache.get_connected_peer_node_ids(alice.node_id).is_empty());
        assert!(cache.get_channel_peer_node_ids(dave.node_id).is_empty());
        Ok(())
    }
}
