use torq_types::prelude::{Category, ChannelGroup, ChannelGroupOrigin, Tag, TaggedEntity};

use crate::{category, channel_group, errors::DbEntityError, tag, tagged_entity};

impl From<category::Model> for Category {
    fn from(value: category::Model) -> Self {
        Self {
            category_id: value.category_id,
            name: value.name,
            style: value.style,
        }
    }
}

impl From<tag::Model> for Tag {
    fn from(value: tag::Model) -> Self {
        Self {
            tag_id: value.tag_id,
            name: value.name,
            style: value.style,
            category_id: value.category_id,
        }
    }
}

impl TryFrom<tagged_entity::Model> for TaggedEntity {
    type Error = DbEntityError;

    fn try_from(value: tagged_entity::Model) -> Result<Self, Self::Error> {
        Ok(TaggedEntity::from_columns(value.tag_id, value.node_id, value.channel_id)?)
    }
}

impl TryFrom<channel_group::Model> for ChannelGroup {
    type Error = DbEntityError;

    fn try_from(value: channel_group::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            channel_id: value.channel_id,
            category_id: value.category_id,
            tag_id: value.tag_id,
            origin: ChannelGroupOrigin::try_from(value.origin_id)?,
        })
    }
}
