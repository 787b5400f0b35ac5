use std::collections::BTreeSet;

use torq_types::prelude::{Chain, Network, Node, NodeConnectionDetails, NodeSettings, NodeStatus, WalletBalance};

use crate::TorqCache;

impl TorqCache {
    /// Stores the settings of a node and indexes its public key.
    pub fn set_node_settings(&self, settings: NodeSettings) {
        if settings.node_id == 0 {
            tracing::warn!("refusing to cache a node without id");
            return;
        }
        self.tables.node_ids_by_public_key.insert(
            (settings.public_key.clone(), settings.chain, settings.network),
            settings.node_id,
        );
        self.tables.node_settings.insert(settings.node_id, settings);
    }

    /// Registers the identity of a node seen on the network.
    ///
    /// Settings already cached for the node, in particular those of managed nodes, are kept.
    pub fn set_node(&self, node: &Node) {
        if node.node_id == 0 {
            return;
        }
        self.tables
            .node_ids_by_public_key
            .insert((node.public_key.clone(), node.chain, node.network), node.node_id);
        self.tables
            .node_settings
            .entry(node.node_id)
            .or_insert_with(|| NodeSettings {
                node_id: node.node_id,
                public_key: node.public_key.clone(),
                chain: node.chain,
                network: node.network,
                ..Default::default()
            });
    }

    /// Returns the node settings, or the sentinel with `node_id == 0`.
    pub fn get_node_settings_by_node_id(&self, node_id: i64) -> NodeSettings {
        self.tables
            .node_settings
            .get(&node_id)
            .map(|s| s.value().clone())
            .unwrap_or_default()
    }

    /// Returns `0` if the node is unknown.
    pub fn get_node_id_by_public_key(&self, public_key: &str, chain: Chain, network: Network) -> i64 {
        self.tables
            .node_ids_by_public_key
            .get(&(public_key.to_string(), chain, network))
            .map(|id| *id)
            .unwrap_or(0)
    }

    /// Ids of the managed nodes of the network that are not deleted, sorted.
    pub fn get_all_torq_node_ids(&self, chain: Chain, network: Network) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .tables
            .node_settings
            .iter()
            .filter(|s| s.torq_node && s.chain == chain && s.network == network && s.status != NodeStatus::Deleted)
            .map(|s| s.node_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of the managed nodes with status `Active`, over all networks, sorted.
    pub fn get_active_torq_node_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .tables
            .node_settings
            .iter()
            .filter(|s| s.torq_node && s.status == NodeStatus::Active)
            .map(|s| s.node_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of every managed node that is not deleted, over all networks, sorted.
    pub fn get_managed_node_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .tables
            .node_settings
            .iter()
            .filter(|s| s.torq_node && s.status != NodeStatus::Deleted)
            .map(|s| s.node_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Marks the managed node as deleted and drops its connection details and runtime data.
    ///
    /// The node identity stays cached, it remains a channel endpoint.
    pub fn remove_managed_node(&self, node_id: i64) {
        self.set_node_status(node_id, NodeStatus::Deleted);
        self.tables.node_connection_details.remove(&node_id);
        self.tables.channel_peers.remove(&node_id);
        self.tables.connected_peers.remove(&node_id);
        self.tables.wallet_balances.remove(&node_id);
        self.remove_channel_states_for_node(node_id);
    }

    /// Updates the status of a cached node. Unknown nodes are ignored.
    pub fn set_node_status(&self, node_id: i64, status: NodeStatus) {
        if let Some(mut settings) = self.tables.node_settings.get_mut(&node_id) {
            settings.status = status;
        }
    }

    pub fn set_node_alias(&self, node_id: i64, alias: impl Into<String>) {
        self.tables.node_aliases.insert(node_id, alias.into());
    }

    /// Returns an empty string if the alias is unknown.
    pub fn get_node_alias(&self, node_id: i64) -> String {
        self.tables
            .node_aliases
            .get(&node_id)
            .map(|a| a.value().clone())
            .unwrap_or_default()
    }

    pub fn set_node_connection_details(&self, details: NodeConnectionDetails) {
        self.tables.node_connection_details.insert(details.node_id, details);
    }

    /// Returns the connection details, or the sentinel with `node_id == 0`.
    pub fn get_node_connection_details(&self, node_id: i64) -> NodeConnectionDetails {
        self.tables
            .node_connection_details
            .get(&node_id)
            .map(|d| d.value().clone())
            .unwrap_or_default()
    }

    pub fn remove_node_connection_details(&self, node_id: i64) {
        self.tables.node_connection_details.remove(&node_id);
    }

    pub fn set_wallet_balance(&self, node_id: i64, balance: WalletBalance) {
        self.tables.wallet_balances.insert(node_id, balance);
    }

    pub fn get_wallet_balance(&self, node_id: i64) -> WalletBalance {
        self.tables
            .wallet_balances
            .get(&node_id)
            .map(|b| *b.value())
            .unwrap_or_default()
    }

    /// Stores the best block height of the network. Lower heights are ignored.
    pub fn set_block_height(&self, chain: Chain, network: Network, block_height: u32) {
        self.tables
            .block_heights
            .entry((chain, network))
            .and_modify(|h| *h = (*h).max(block_height))
            .or_insert(block_height);
    }

    /// Returns `0` if no block height was observed yet.
    pub fn get_block_height(&self, chain: Chain, network: Network) -> u32 {
        self.tables
            .block_heights
            .get(&(chain, network))
            .map(|h| *h)
            .unwrap_or(0)
    }

    /// Records `peer_node_id` as a channel peer of the managed node.
    pub fn set_channel_peer_node(&self, node_id: i64, peer_node_id: i64) {
        self.tables.channel_peers.entry(node_id).or_default().insert(peer_node_id);
    }

    /// Replaces the set of channel peers of the managed node.
    pub fn set_channel_peer_nodes(&self, node_id: i64, peer_node_ids: BTreeSet<i64>) {
        self.tables.channel_peers.insert(node_id, peer_node_ids);
    }

    /// Channel peers of the managed node, sorted.
    pub fn get_channel_peer_node_ids(&self, node_id: i64) -> Vec<i64> {
        self.tables
            .channel_peers
            .get(&node_id)
            .map(|p| p.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Records `peer_node_id` as connected to the managed node.
    pub fn set_connected_peer_node(&self, node_id: i64, peer_node_id: i64) {
        self.tables
            .connected_peers
            .entry(node_id)
            .or_default()
            .insert(peer_node_id);
    }

    pub fn remove_connected_peer_node(&self, node_id: i64, peer_node_id: i64) {
        if let Some(mut peers) = self.tables.connected_peers.get_mut(&node_id) {
            peers.remove(&peer_node_id);
        }
    }

    /// Replaces the set of peers connected to the managed node.
    pub fn set_connected_peer_nodes(&self, node_id: i64, peer_node_ids: BTreeSet<i64>) {
        self.tables.connected_peers.insert(node_id, peer_node_ids);
    }

    pub fn is_connected_peer_node(&self, node_id: i64, peer_node_id: i64) -> bool {
        self.tables
            .connected_peers
            .get(&node_id)
            .is_some_and(|p| p.contains(&peer_node_id))
    }

    /// Peers connected to the managed node, sorted.
    pub fn get_connected_peer_node_ids(&self, node_id: i64) -> Vec<i64> {
        self.tables
            .connected_peers
            .get(&node_id)
            .map(|p| p.iter().copied().collect())
            .unwrap_or_default()
    }
}
