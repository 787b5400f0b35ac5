use std::collections::HashSet;

use torq_types::prelude::{Channel, ChannelPoint, ChannelState, RoutingPolicy};

use crate::TorqCache;

impl TorqCache {
    /// Stores the channel settings and keeps the lookup indices in sync.
    ///
    /// A channel that reached `Closing` or later loses its runtime state.
    pub fn set_channel(&self, channel: Channel) {
        let channel_id = channel.channel_id;
        if channel_id == 0 {
            tracing::warn!("refusing to cache a channel without id");
            return;
        }

        let previous = self.tables.channels.insert(channel_id, channel.clone());

        if let Some(previous) = previous {
            if previous.short_channel_id != channel.short_channel_id {
                if let Some(scid) = previous.short_channel_id {
                    self.tables
                        .channel_ids_by_short_channel_id
                        .remove_if(&scid, |_, id| *id == channel_id);
                }
            }
            if previous.lnd_short_channel_id != channel.lnd_short_channel_id {
                if let Some(scid) = previous.lnd_short_channel_id {
                    self.tables
                        .channel_ids_by_lnd_short_channel_id
                        .remove_if(&scid, |_, id| *id == channel_id);
                }
            }
        }

        if let Some(scid) = &channel.short_channel_id {
            self.tables
                .channel_ids_by_short_channel_id
                .insert(scid.clone(), channel_id);
        }
        if let Some(scid) = channel.lnd_short_channel_id {
            self.tables.channel_ids_by_lnd_short_channel_id.insert(scid, channel_id);
        }
        self.tables
            .channel_ids_by_channel_point
            .insert(channel.channel_point(), channel_id);

        if channel.status.is_closing_or_later() {
            self.remove_channel_states_for_channel(channel_id);
        }
    }

    /// Returns the cached channel, or the sentinel with `channel_id == 0`.
    pub fn get_channel_setting_by_channel_id(&self, channel_id: i64) -> Channel {
        self.tables
            .channels
            .get(&channel_id)
            .map(|c| c.value().clone())
            .unwrap_or_default()
    }

    /// Returns `0` if the short channel id is unknown.
    pub fn get_channel_id_by_short_channel_id(&self, short_channel_id: &str) -> i64 {
        self.tables
            .channel_ids_by_short_channel_id
            .get(short_channel_id)
            .map(|id| *id)
            .unwrap_or(0)
    }

    /// Returns `0` if the LND short channel id is unknown.
    pub fn get_channel_id_by_lnd_short_channel_id(&self, lnd_short_channel_id: u64) -> i64 {
        self.tables
            .channel_ids_by_lnd_short_channel_id
            .get(&lnd_short_channel_id)
            .map(|id| *id)
            .unwrap_or(0)
    }

    /// Returns `0` if the funding outpoint is unknown.
    pub fn get_channel_id_by_funding_transaction(&self, funding_transaction_hash: &str, output_index: u32) -> i64 {
        self.tables
            .channel_ids_by_channel_point
            .get(&ChannelPoint::new(funding_transaction_hash, output_index))
            .map(|id| *id)
            .unwrap_or(0)
    }

    /// Ids of all cached channels having `node_id` as an endpoint, sorted.
    pub fn get_channel_ids_by_node_id(&self, node_id: i64) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .tables
            .channels
            .iter()
            .filter(|c| c.has_endpoint(node_id))
            .map(|c| c.channel_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of the channels of `node_id` that are not closing or closed, sorted.
    pub fn get_open_channel_ids_by_node_id(&self, node_id: i64) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .tables
            .channels
            .iter()
            .filter(|c| c.has_endpoint(node_id) && !c.status.is_closing_or_later())
            .map(|c| c.channel_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// All cached channels.
    pub fn get_channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self.tables.channels.iter().map(|c| c.value().clone()).collect();
        channels.sort_unstable_by_key(|c| c.channel_id);
        channels
    }

    pub fn remove_channel(&self, channel_id: i64) {
        if let Some((_, channel)) = self.tables.channels.remove(&channel_id) {
            if let Some(scid) = channel.short_channel_id.as_deref() {
                self.tables
                    .channel_ids_by_short_channel_id
                    .remove_if(scid, |_, id| *id == channel_id);
            }
            if let Some(scid) = channel.lnd_short_channel_id {
                self.tables
                    .channel_ids_by_lnd_short_channel_id
                    .remove_if(&scid, |_, id| *id == channel_id);
            }
            self.tables
                .channel_ids_by_channel_point
                .remove_if(&channel.channel_point(), |_, id| *id == channel_id);
        }
        self.remove_channel_states_for_channel(channel_id);
    }

    /// Replaces the runtime state of all channels of the managed node.
    ///
    /// States whose balances exceed the channel capacity are dropped.
    pub fn set_channel_states(&self, node_id: i64, states: Vec<ChannelState>) {
        let mut kept = HashSet::with_capacity(states.len());
        for state in states {
            if state.node_id != node_id {
                tracing::warn!(node_id, state_node_id = state.node_id, "channel state of another node ignored");
                continue;
            }
            if !state.balances_within_capacity() {
                tracing::warn!(
                    node_id,
                    channel_id = state.channel_id,
                    capacity = state.capacity,
                    "channel state exceeds capacity, ignored"
                );
                continue;
            }
            kept.insert(state.channel_id);
            self.tables.channel_states.insert((node_id, state.channel_id), state);
        }

        self.tables
            .channel_states
            .retain(|(state_node_id, channel_id), _| *state_node_id != node_id || kept.contains(channel_id));
    }

    /// Stores the runtime state of a single channel.
    pub fn set_channel_state(&self, state: ChannelState) {
        if !state.balances_within_capacity() {
            tracing::warn!(
                node_id = state.node_id,
                channel_id = state.channel_id,
                "channel state exceeds capacity, ignored"
            );
            return;
        }
        self.tables
            .channel_states
            .insert((state.node_id, state.channel_id), state);
    }

    pub fn get_channel_state(&self, node_id: i64, channel_id: i64) -> Option<ChannelState> {
        self.tables
            .channel_states
            .get(&(node_id, channel_id))
            .map(|s| s.value().clone())
    }

    /// Runtime state of all channels of the managed node, sorted by channel id.
    pub fn get_channel_states(&self, node_id: i64) -> Vec<ChannelState> {
        let mut states: Vec<ChannelState> = self
            .tables
            .channel_states
            .iter()
            .filter(|s| s.key().0 == node_id)
            .map(|s| s.value().clone())
            .collect();
        states.sort_unstable_by_key(|s| s.channel_id);
        states
    }

    /// Replaces the local or remote policy of a cached channel state. Unknown states are ignored.
    pub fn set_channel_state_routing_policy(&self, node_id: i64, channel_id: i64, local: bool, policy: RoutingPolicy) {
        if let Some(mut state) = self.tables.channel_states.get_mut(&(node_id, channel_id)) {
            if local {
                state.local_policy = policy;
            } else {
                state.remote_policy = policy;
            }
        }
    }

    /// Updates the balances of a cached channel state. Unknown states and
    /// balances exceeding the capacity are ignored.
    pub fn set_channel_state_balances(&self, node_id: i64, channel_id: i64, local_balance: i64, remote_balance: i64) {
        if let Some(mut state) = self.tables.channel_states.get_mut(&(node_id, channel_id)) {
            let mut updated = state.clone();
            updated.local_balance = local_balance;
            updated.remote_balance = remote_balance;
            if updated.balances_within_capacity() {
                *state = updated;
            } else {
                tracing::warn!(node_id, channel_id, "channel balance update exceeds capacity, ignored");
            }
        }
    }

    /// Evicts the runtime state of the channel from every managed node.
    pub fn remove_channel_states_for_channel(&self, channel_id: i64) {
        self.tables.channel_states.retain(|(_, id), _| *id != channel_id);
    }

    pub fn remove_channel_states_for_node(&self, node_id: i64) {
        self.tables.channel_states.retain(|(id, _), _| *id != node_id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use torq_types::prelude::ChannelStatus;

    use super::*;

    const FUNDING_TX: &str = "ab00000000000000000000000000000000000000000000000000000000000001";

    fn channel(channel_id: i64, status: ChannelStatus) -> Channel {
        Channel {
            channel_id,
            short_channel_id: Some("700000x1x0".into()),
            lnd_short_channel_id: Some((700_000u64 << 40) | (1 << 16)),
            funding_transaction_hash: FUNDING_TX.into(),
            capacity: 1_000_000,
            first_node_id: 1,
            second_node_id: 2,
            status,
            ..Default::default()
        }
    }

    fn state(node_id: i64, channel_id: i64, local: i64) -> ChannelState {
        ChannelState {
            node_id,
            remote_node_id: 2,
            channel_id,
            capacity: 1_000_000,
            local_balance: local,
            remote_balance: 1_000_000 - local,
            active: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_channel_lookups_yield_zero() {
        let cache = TorqCache::new();

        assert_eq!(cache.get_channel_id_by_short_channel_id("700000x1x0"), 0);
        assert_eq!(cache.get_channel_id_by_funding_transaction(FUNDING_TX, 0), 0);
        assert_eq!(cache.get_channel_setting_by_channel_id(42).channel_id, 0);
        assert!(cache.get_channel_state(1, 42).is_none());
    }

    #[test]
    fn test_channel_indices_follow_updates() {
        let cache = TorqCache::new();
        cache.set_channel(channel(5, ChannelStatus::Open));

        assert_eq!(cache.get_channel_id_by_short_channel_id("700000x1x0"), 5);
        assert_eq!(cache.get_channel_id_by_funding_transaction(FUNDING_TX, 0), 5);
        assert_eq!(cache.get_channel_id_by_lnd_short_channel_id((700_000u64 << 40) | (1 << 16)), 5);
        assert_eq!(cache.get_channel_ids_by_node_id(2), vec![5]);

        let mut moved = channel(5, ChannelStatus::Open);
        moved.short_channel_id = Some("700001x1x0".into());
        cache.set_channel(moved);

        assert_eq!(cache.get_channel_id_by_short_channel_id("700000x1x0"), 0);
        assert_eq!(cache.get_channel_id_by_short_channel_id("700001x1x0"), 5);

        cache.remove_channel(5);
        assert_eq!(cache.get_channel_id_by_funding_transaction(FUNDING_TX, 0), 0);
        assert!(cache.get_channels().is_empty());
    }

    #[test]
    fn test_removed_channel_leaves_no_index_entries() {
        let cache = TorqCache::new();
        cache.set_channel(channel(5, ChannelStatus::Open));
        cache.set_channel_state(state(1, 5, 100));

        cache.remove_channel(5);

        assert_eq!(cache.get_channel_id_by_short_channel_id("700000x1x0"), 0);
        assert_eq!(cache.get_channel_id_by_lnd_short_channel_id((700_000u64 << 40) | (1 << 16)), 0);
        assert_eq!(cache.get_channel_id_by_funding_transaction(FUNDING_TX, 0), 0);
        assert!(cache.get_channel_state(1, 5).is_none());
        assert!(cache.get_channel_ids_by_node_id(1).is_empty());
    }

    #[test]
    fn test_closing_channel_evicts_runtime_state() {
        let cache = TorqCache::new();
        cache.set_channel(channel(5, ChannelStatus::Open));
        cache.set_channel_states(1, vec![state(1, 5, 400_000)]);
        assert!(cache.get_channel_state(1, 5).is_some());

        cache.set_channel(channel(5, ChannelStatus::Closing));

        assert!(cache.get_channel_state(1, 5).is_none());
        assert!(cache.get_open_channel_ids_by_node_id(1).is_empty());
        assert_eq!(cache.get_channel_ids_by_node_id(1), vec![5]);
    }

    #[test]
    fn test_set_channel_states_replaces_node_states() {
        let cache = TorqCache::new();
        cache.set_channel_states(1, vec![state(1, 5, 10), state(1, 6, 20)]);
        cache.set_channel_states(3, vec![state(3, 5, 30)]);

        let mut over_capacity = state(1, 7, 10);
        over_capacity.unsettled_balance = 1;
        cache.set_channel_states(1, vec![state(1, 6, 25), over_capacity]);

        let states = cache.get_channel_states(1);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].local_balance, 25);
        assert_eq!(cache.get_channel_states(3).len(), 1);
    }

    #[test]
    fn test_policy_and_balance_patches() {
        let cache = TorqCache::new();
        cache.set_channel_state(state(1, 5, 100));

        let policy = RoutingPolicy {
            fee_rate_milli_msat: 250,
            ..Default::default()
        };
        cache.set_channel_state_routing_policy(1, 5, true, policy);
        cache.set_channel_state_balances(1, 5, 600_000, 400_000);
        cache.set_channel_state_balances(1, 5, 900_000, 400_000);

        let current = cache.get_channel_state(1, 5).unwrap();
        assert_eq!(current.local_policy, policy);
        assert_eq!(current.local_balance, 600_000);
        assert_eq!(current.remote_balance, 400_000);
    }

    #[test]
    fn test_readers_never_observe_torn_channel_state() {
        let cache = TorqCache::new();
        cache.set_channel_state(state(1, 5, 0));
        let done = AtomicBool::new(false);

        std::thread::scope(|s| {
            s.spawn(|| {
                for local in (0..1_000_000).step_by(997) {
                    cache.set_channel_state_balances(1, 5, local, 1_000_000 - local);
                }
                done.store(true, Ordering::SeqCst);
            });

            for _ in 0..2 {
                s.spawn(|| {
                    while !done.load(Ordering::SeqCst) {
                        if let Some(s) = cache.get_channel_state(1, 5) {
                            assert_eq!(s.local_balance + s.remote_balance, 1_000_000);
                        }
                    }
                });
            }
        });
    }
}
