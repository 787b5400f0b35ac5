use serde::{Deserialize, Serialize};

use crate::{
    Timestamp, int_enum,
    network::{Chain, Implementation, Network},
};

/// Identity of a Lightning node, managed or not.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Node {
    pub node_id: i64,
    pub public_key: String,
    pub chain: Chain,
    pub network: Network,
    pub created_on: Option<Timestamp>,
}

/// Operator-controlled status of a managed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeStatus {
    #[default]
    Inactive,
    Active,
    Deleted,
    Archived,
}

int_enum!(NodeStatus {
    Inactive = 0,
    Active = 1,
    Deleted = 3,
    Archived = 5,
});

/// Bitmap of external ping services enabled for a managed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PingSystem(pub u32);

impl PingSystem {
    pub const AMBOSS: PingSystem = PingSystem(1);
    pub const VECTOR: PingSystem = PingSystem(1 << 1);

    pub fn contains(&self, other: PingSystem) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A node the operator configured credentials for.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeConnectionDetails {
    pub node_id: i64,
    pub name: String,
    pub implementation: Implementation,
    pub grpc_address: Option<String>,
    pub tls_data: Option<Vec<u8>>,
    pub macaroon_data: Option<Vec<u8>>,
    pub certificate_data: Option<Vec<u8>>,
    pub key_data: Option<Vec<u8>>,
    pub status: NodeStatus,
    pub ping_system: PingSystem,
    pub created_on: Option<Timestamp>,
    pub updated_on: Option<Timestamp>,
}

impl std::fmt::Debug for NodeConnectionDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeConnectionDetails")
            .field("node_id", &self.node_id)
            .field("name", &self.name)
            .field("implementation", &self.implementation)
            .field("grpc_address", &self.grpc_address)
            .field("status", &self.status)
            .field("ping_system", &self.ping_system)
            .finish_non_exhaustive()
    }
}

impl NodeConnectionDetails {
    /// Returns `true` if connecting with `other` means talking to a different endpoint or
    /// presenting different credentials.
    pub fn credentials_differ(&self, other: &NodeConnectionDetails) -> bool {
        self.implementation != other.implementation
            || self.grpc_address != other.grpc_address
            || self.tls_data != other.tls_data
            || self.macaroon_data != other.macaroon_data
            || self.certificate_data != other.certificate_data
            || self.key_data != other.key_data
    }
}

/// Cached settings of a node: its identity plus, for managed nodes, the connection basics.
///
/// A record with `node_id == 0` is the "unknown node" sentinel returned by the cache.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeSettings {
    pub node_id: i64,
    pub public_key: String,
    pub chain: Chain,
    pub network: Network,
    pub implementation: Implementation,
    pub name: Option<String>,
    pub status: NodeStatus,
    pub ping_system: PingSystem,
    /// `true` when the node is managed (has connection details).
    pub torq_node: bool,
}

/// Snapshot of the announced node information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeEvent {
    pub timestamp: Option<Timestamp>,
    /// The node the announcement is about.
    pub event_node_id: i64,
    /// The managed node that observed the announcement.
    pub node_id: i64,
    pub alias: String,
    pub color: String,
    pub addresses: Vec<String>,
    pub features: Vec<u32>,
}

impl NodeEvent {
    /// Returns `true` if the announced tuple differs from `other`.
    pub fn differs_from(&self, other: &NodeEvent) -> bool {
        self.alias != other.alias
            || self.color != other.color
            || self.addresses != other.addresses
            || self.features != other.features
    }
}

/// Connectivity status of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PeerConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

int_enum!(PeerConnectionStatus {
    Disconnected = 0,
    Connected = 1,
});

/// Reconnect preference of the operator for a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PeerConnectionSetting {
    #[default]
    AlwaysReconnect,
    DisableReconnect,
}

int_enum!(PeerConnectionSetting {
    AlwaysReconnect = 0,
    DisableReconnect = 1,
});

/// One row of the append-only peer connection history.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeerConnection {
    pub node_id: i64,
    pub peer_node_id: i64,
    pub timestamp: Option<Timestamp>,
    pub address: Option<String>,
    pub setting: PeerConnectionSetting,
    pub status: PeerConnectionStatus,
}
