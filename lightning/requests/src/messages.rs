//! Operator requests and their responses.
//!
//! Responses never carry errors as values: every failure is reported as an
//! [`ResponseStatus::Inactive`] response with an explanatory `error` text.

use serde::{Deserialize, Serialize};
use torq_types::prelude::{Chain, Implementation, Network, WalletBalance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResponseStatus {
    #[default]
    Inactive,
    Active,
}

/// Outcome of one request against a managed node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Response<T> {
    pub node_id: i64,
    pub status: ResponseStatus,
    pub message: Option<String>,
    pub error: Option<String>,
    pub data: T,
}

impl<T: Default> Response<T> {
    pub fn active(node_id: i64, data: T) -> Self {
        Self {
            node_id,
            status: ResponseStatus::Active,
            message: None,
            error: None,
            data,
        }
    }

    pub fn inactive(node_id: i64, error: impl ToString) -> Self {
        Self {
            node_id,
            status: ResponseStatus::Inactive,
            message: None,
            error: Some(error.to_string()),
            data: T::default(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: T) -> Self {
        self.data = data;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ResponseStatus::Active
    }
}

/// Changes the local routing policy of one channel.
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoutingPolicyUpdateRequest {
    pub node_id: i64,
    pub channel_id: i64,
    pub fee_rate_milli_msat: Option<i64>,
    pub fee_base_msat: Option<i64>,
    pub max_htlc_msat: Option<u64>,
    pub min_htlc_msat: Option<u64>,
    pub time_lock_delta: Option<u32>,
    /// Overrides the configured rate limit window.
    pub rate_limit_seconds: Option<u32>,
    /// Overrides the configured number of distinct values allowed per field within the window.
    pub rate_limit_count: Option<u32>,
}

impl RoutingPolicyUpdateRequest {
    pub fn has_changes(&self) -> bool {
        self.fee_rate_milli_msat.is_some()
            || self.fee_base_msat.is_some()
            || self.max_htlc_msat.is_some()
            || self.min_htlc_msat.is_some()
            || self.time_lock_delta.is_some()
    }
}

/// A channel edge the backing node refused to update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FailedRoutingPolicyUpdate {
    pub channel_id: i64,
    pub reason: String,
    pub error: String,
}

pub type RoutingPolicyUpdateResponse = Response<Vec<FailedRoutingPolicyUpdate>>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectPeerRequest {
    pub node_id: i64,
    pub public_key: String,
    /// `host:port` of the peer.
    pub host: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisconnectPeerRequest {
    pub node_id: i64,
    pub public_key: String,
}

/// Set when the node refused the request because the peer already is in the requested state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeerRequestFlags {
    pub request_failed_currently_connected: bool,
    pub request_failed_currently_disconnected: bool,
}

pub type ConnectPeerResponse = Response<PeerRequestFlags>;
pub type DisconnectPeerResponse = Response<PeerRequestFlags>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AddressType {
    #[default]
    P2wkh,
    NestedP2wkh,
    P2tr,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewAddressRequest {
    pub node_id: i64,
    pub address_type: AddressType,
    pub account: Option<String>,
}

pub type NewAddressResponse = Response<String>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewInvoiceRequest {
    pub node_id: i64,
    pub memo: Option<String>,
    /// `None` creates an invoice for any amount.
    pub value_msat: Option<u64>,
    pub expiry_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreatedInvoice {
    pub payment_request: String,
    /// Hex encoded.
    pub payment_hash: String,
    pub add_index: Option<u64>,
}

pub type NewInvoiceResponse = Response<CreatedInvoice>;

pub type WalletBalanceResponse = Response<WalletBalance>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeerInfo {
    pub public_key: String,
    pub address: Option<String>,
    pub connected: bool,
    pub inbound: Option<bool>,
    pub bytes_sent: Option<u64>,
    pub bytes_received: Option<u64>,
    pub ping_time_us: Option<i64>,
}

pub type ListPeersResponse = Response<Vec<PeerInfo>>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignMessageRequest {
    pub node_id: i64,
    pub message: String,
}

/// The zbase32 encoded signature.
pub type SignMessageResponse = Response<String>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignatureVerificationRequest {
    pub node_id: i64,
    pub message: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignatureVerification {
    pub valid: bool,
    pub public_key: String,
}

pub type SignatureVerificationResponse = Response<SignatureVerification>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeInformation {
    pub implementation: Implementation,
    pub version: String,
    pub public_key: String,
    pub alias: String,
    pub color: String,
    pub chain: Chain,
    pub network: Network,
    pub block_height: u32,
    pub num_peers: u32,
    pub num_active_channels: u32,
    pub num_inactive_channels: u32,
    pub num_pending_channels: u32,
}

pub type InformationResponse = Response<NodeInformation>;
