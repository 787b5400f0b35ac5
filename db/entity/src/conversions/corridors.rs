use torq_types::prelude::{Corridor, CorridorDiscriminators, CorridorType};

use super::to_unsigned;
use crate::{corridor, errors::DbEntityError};

impl TryFrom<corridor::Model> for Corridor {
    type Error = DbEntityError;

    /// Keeps the persisted priority as-is; callers compare it with the computed one.
    fn try_from(value: corridor::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            corridor_id: value.corridor_id,
            corridor_type: CorridorType::try_from(value.corridor_type_id)?,
            reference_id: value.reference_id,
            flag: value.flag,
            inverse: value.inverse,
            priority: to_unsigned("priority", i64::from(value.priority))?,
            discriminators: CorridorDiscriminators {
                from_tag_id: value.from_tag_id,
                from_node_id: value.from_node_id,
                to_tag_id: value.to_tag_id,
                to_node_id: value.to_node_id,
                channel_id: value.channel_id,
            },
        })
    }
}
