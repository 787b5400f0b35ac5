use std::collections::{BTreeSet, HashMap};

use torq_types::prelude::{Tag, TagTarget, TaggedEntity};

use crate::TorqCache;

impl TorqCache {
    /// Replaces the known tags and the tag membership of nodes and channels.
    ///
    /// `memberships` holds every tag attachment in effect.
    pub fn set_tags(&self, tags: Vec<Tag>, memberships: &[TaggedEntity]) {
        let mut node_tags: HashMap<i64, BTreeSet<i64>> = HashMap::new();
        let mut channel_tags: HashMap<i64, BTreeSet<i64>> = HashMap::new();
        for membership in memberships {
            match membership.target {
                TagTarget::Node(node_id) => node_tags.entry(node_id).or_default().insert(membership.tag_id),
                TagTarget::Channel(channel_id) => channel_tags.entry(channel_id).or_default().insert(membership.tag_id),
            };
        }

        self.tables.tags.clear();
        for tag in tags {
            self.tables.tags.insert(tag.tag_id, tag);
        }

        self.tables.node_tags.retain(|id, _| node_tags.contains_key(id));
        for (node_id, tag_ids) in node_tags {
            self.tables.node_tags.insert(node_id, tag_ids);
        }
        self.tables.channel_tags.retain(|id, _| channel_tags.contains_key(id));
        for (channel_id, tag_ids) in channel_tags {
            self.tables.channel_tags.insert(channel_id, tag_ids);
        }
    }

    /// Returns the tag, or the sentinel with `tag_id == 0`.
    pub fn get_tag(&self, tag_id: i64) -> Tag {
        self.tables
            .tags
            .get(&tag_id)
            .map(|t| t.value().clone())
            .unwrap_or_default()
    }

    /// Tags attached to the node, sorted.
    pub fn get_tag_ids_by_node_id(&self, node_id: i64) -> Vec<i64> {
        self.tables
            .node_tags
            .get(&node_id)
            .map(|t| t.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Tags attached to the channel, sorted.
    pub fn get_tag_ids_by_channel_id(&self, channel_id: i64) -> Vec<i64> {
        self.tables
            .channel_tags
            .get(&channel_id)
            .map(|t| t.iter().copied().collect())
            .unwrap_or_default()
    }
}
