use serde::{Deserialize, Serialize};

use crate::{errors::TypesError, int_enum};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Category {
    pub category_id: i64,
    pub name: String,
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tag {
    pub tag_id: i64,
    pub name: String,
    pub style: String,
    pub category_id: Option<i64>,
}

/// Entity a tag is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagTarget {
    Node(i64),
    Channel(i64),
}

/// An explicit attachment of a tag to a node or channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedEntity {
    pub tag_id: i64,
    pub target: TagTarget,
}

impl TaggedEntity {
    /// Builds the entity from its persisted column pair, exactly one of which must be set.
    pub fn from_columns(tag_id: i64, node_id: Option<i64>, channel_id: Option<i64>) -> Result<Self, TypesError> {
        let target = match (node_id, channel_id) {
            (Some(node_id), None) => TagTarget::Node(node_id),
            (None, Some(channel_id)) => TagTarget::Channel(channel_id),
            _ => {
                return Err(TypesError::UnknownName {
                    kind: "tag target",
                    value: format!("node={node_id:?} channel={channel_id:?}"),
                });
            }
        };
        Ok(Self { tag_id, target })
    }
}

/// What produced a channel group row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelGroupOrigin {
    Category,
    Tag,
}

int_enum!(ChannelGroupOrigin { Category = 1, Tag = 2 });

/// Projection row stating that a channel belongs to a category and/or tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelGroup {
    pub channel_id: i64,
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub origin: ChannelGroupOrigin,
}
