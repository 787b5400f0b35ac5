use sea_orm::Set;
use torq_types::prelude::{Channel, ChannelFlags, ChannelStatus};

use super::to_unsigned;
use crate::{channel, errors::DbEntityError};

impl TryFrom<channel::Model> for Channel {
    type Error = DbEntityError;

    fn try_from(value: channel::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            channel_id: value.channel_id,
            short_channel_id: value.short_channel_id,
            lnd_short_channel_id: value
                .lnd_short_channel_id
                .map(|v| to_unsigned("lnd_short_channel_id", v))
                .transpose()?,
            funding_transaction_hash: value.funding_transaction_hash,
            funding_output_index: to_unsigned("funding_output_index", i64::from(value.funding_output_index))?,
            closing_transaction_hash: value.closing_transaction_hash,
            capacity: value.capacity,
            private: value.private,
            first_node_id: value.first_node_id,
            second_node_id: value.second_node_id,
            initiating_node_id: value.initiating_node_id,
            accepting_node_id: value.accepting_node_id,
            closing_node_id: value.closing_node_id,
            status: ChannelStatus::try_from(value.status_id)?,
            funding_block_height: value
                .funding_block_height
                .map(|v| to_unsigned("funding_block_height", i64::from(v)))
                .transpose()?,
            funded_on: value.funded_on,
            closing_block_height: value
                .closing_block_height
                .map(|v| to_unsigned("closing_block_height", i64::from(v)))
                .transpose()?,
            closed_on: value.closed_on,
            flags: ChannelFlags(to_unsigned("flags", i64::from(value.flags))?),
        })
    }
}

/// Copies every mutable field of `channel` into the active model.
///
/// The identity columns (`channel_id`, funding point and endpoints) are left untouched.
pub fn apply_channel_fields(model: &mut channel::ActiveModel, channel: &Channel) {
    model.short_channel_id = Set(channel.short_channel_id.clone());
    model.lnd_short_channel_id = Set(channel.lnd_short_channel_id.map(|v| v as i64));
    model.closing_transaction_hash = Set(channel.closing_transaction_hash.clone());
    model.capacity = Set(channel.capacity);
    model.private = Set(channel.private);
    model.initiating_node_id = Set(channel.initiating_node_id);
    model.accepting_node_id = Set(channel.accepting_node_id);
    model.closing_node_id = Set(channel.closing_node_id);
    model.status_id = Set(channel.status.into());
    model.funding_block_height = Set(channel.funding_block_height.map(|v| v as i32));
    model.funded_on = Set(channel.funded_on);
    model.closing_block_height = Set(channel.closing_block_height.map(|v| v as i32));
    model.closed_on = Set(channel.closed_on);
    model.flags = Set(channel.flags.0 as i32);
}
