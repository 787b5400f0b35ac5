use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Policy advertised by one endpoint of a channel for traffic leaving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RoutingPolicy {
    pub disabled: bool,
    pub time_lock_delta: u32,
    pub min_htlc_msat: u64,
    pub max_htlc_msat: u64,
    pub fee_base_msat: i64,
    pub fee_rate_milli_msat: i64,
}

/// One persisted version of a routing policy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoutingPolicyEvent {
    pub timestamp: Option<Timestamp>,
    pub channel_id: i64,
    pub announcing_node_id: i64,
    pub connecting_node_id: i64,
    /// The managed node through which the update was observed.
    pub node_id: i64,
    pub policy: RoutingPolicy,
}

/// Direction of a pending HTLC relative to the managed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HtlcDirection {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingHtlc {
    pub amount_msat: u64,
    pub direction: HtlcDirection,
    pub expiration_height: u32,
}

/// Runtime balance and policy state of one channel, seen from one managed node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelState {
    pub node_id: i64,
    pub remote_node_id: i64,
    pub channel_id: i64,
    pub capacity: i64,
    pub local_balance: i64,
    pub remote_balance: i64,
    pub unsettled_balance: i64,
    pub pending_htlcs: Vec<PendingHtlc>,
    pub commit_fee: i64,
    pub commit_weight: i64,
    pub num_updates: u64,
    pub lifetime: i64,
    pub active: bool,
    pub local_policy: RoutingPolicy,
    pub remote_policy: RoutingPolicy,
}

impl ChannelState {
    /// Returns `true` when the balances fit within the capacity.
    pub fn balances_within_capacity(&self) -> bool {
        self.local_balance
            .checked_add(self.remote_balance)
            .and_then(|v| v.checked_add(self.unsettled_balance))
            .is_some_and(|total| total <= self.capacity)
    }
}

/// On-chain wallet balance of a managed node, in satoshis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WalletBalance {
    pub total_balance: i64,
    pub confirmed_balance: i64,
    pub unconfirmed_balance: i64,
    pub locked_balance: i64,
}
