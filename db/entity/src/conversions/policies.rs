use torq_types::prelude::{RoutingPolicy, RoutingPolicyEvent};

use super::to_unsigned;
use crate::{errors::DbEntityError, routing_policy};

impl TryFrom<routing_policy::Model> for RoutingPolicyEvent {
    type Error = DbEntityError;

    fn try_from(value: routing_policy::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp: Some(value.ts),
            channel_id: value.channel_id,
            announcing_node_id: value.announcing_node_id,
            connecting_node_id: value.connecting_node_id,
            node_id: value.node_id,
            policy: RoutingPolicy {
                disabled: value.disabled,
                time_lock_delta: to_unsigned("time_lock_delta", i64::from(value.time_lock_delta))?,
                min_htlc_msat: to_unsigned("min_htlc_msat", value.min_htlc_msat)?,
                max_htlc_msat: to_unsigned("max_htlc_msat", value.max_htlc_msat)?,
                fee_base_msat: value.fee_base_msat,
                fee_rate_milli_msat: value.fee_rate_milli_msat,
            },
        })
    }
}
