//! Messages of the `lnrpc.Lightning` service used by the core.
//!
//! Only the fields consumed by the ingestion pipelines and the request router are declared;
//! unknown fields sent by the node are skipped by the decoder.

use std::collections::HashMap;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetInfoRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetInfoResponse {
    #[prost(string, tag = "1")]
    pub identity_pubkey: String,
    #[prost(string, tag = "2")]
    pub alias: String,
    #[prost(uint32, tag = "3")]
    pub num_pending_channels: u32,
    #[prost(uint32, tag = "4")]
    pub num_active_channels: u32,
    #[prost(uint32, tag = "5")]
    pub num_peers: u32,
    #[prost(uint32, tag = "6")]
    pub block_height: u32,
    #[prost(string, tag = "8")]
    pub block_hash: String,
    #[prost(bool, tag = "9")]
    pub synced_to_chain: bool,
    #[prost(int64, tag = "13")]
    pub best_header_timestamp: i64,
    #[prost(string, tag = "14")]
    pub version: String,
    #[prost(uint32, tag = "15")]
    pub num_inactive_channels: u32,
    #[prost(message, repeated, tag = "16")]
    pub chains: Vec<Chain>,
    #[prost(string, tag = "17")]
    pub color: String,
    #[prost(bool, tag = "18")]
    pub synced_to_graph: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Chain {
    #[prost(string, tag = "1")]
    pub chain: String,
    #[prost(string, tag = "2")]
    pub network: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WalletBalanceRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WalletBalanceResponse {
    #[prost(int64, tag = "1")]
    pub total_balance: i64,
    #[prost(int64, tag = "2")]
    pub confirmed_balance: i64,
    #[prost(int64, tag = "3")]
    pub unconfirmed_balance: i64,
    #[prost(int64, tag = "5")]
    pub locked_balance: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AddressType {
    WitnessPubkeyHash = 0,
    NestedPubkeyHash = 1,
    UnusedWitnessPubkeyHash = 2,
    UnusedNestedPubkeyHash = 3,
    TaprootPubkey = 4,
    UnusedTaprootPubkey = 5,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NewAddressRequest {
    #[prost(enumeration = "AddressType", tag = "1")]
    pub r#type: i32,
    #[prost(string, tag = "2")]
    pub account: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NewAddressResponse {
    #[prost(string, tag = "1")]
    pub address: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum InvoiceState {
    Open = 0,
    Settled = 1,
    Canceled = 2,
    Accepted = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Invoice {
    #[prost(string, tag = "1")]
    pub memo: String,
    #[prost(bytes = "vec", tag = "3")]
    pub r_preimage: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub r_hash: Vec<u8>,
    #[prost(int64, tag = "5")]
    pub value: i64,
    #[prost(int64, tag = "7")]
    pub creation_date: i64,
    #[prost(int64, tag = "8")]
    pub settle_date: i64,
    #[prost(string, tag = "9")]
    pub payment_request: String,
    #[prost(int64, tag = "11")]
    pub expiry: i64,
    #[prost(bool, tag = "15")]
    pub private: bool,
    #[prost(uint64, tag = "16")]
    pub add_index: u64,
    #[prost(uint64, tag = "17")]
    pub settle_index: u64,
    #[prost(int64, tag = "20")]
    pub amt_paid_msat: i64,
    #[prost(enumeration = "InvoiceState", tag = "21")]
    pub state: i32,
    #[prost(int64, tag = "23")]
    pub value_msat: i64,
    #[prost(bool, tag = "25")]
    pub is_keysend: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AddInvoiceResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub r_hash: Vec<u8>,
    #[prost(string, tag = "2")]
    pub payment_request: String,
    #[prost(uint64, tag = "16")]
    pub add_index: u64,
    #[prost(bytes = "vec", tag = "17")]
    pub payment_addr: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InvoiceSubscription {
    #[prost(uint64, tag = "1")]
    pub add_index: u64,
    #[prost(uint64, tag = "2")]
    pub settle_index: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListInvoiceRequest {
    #[prost(bool, tag = "1")]
    pub pending_only: bool,
    #[prost(uint64, tag = "4")]
    pub index_offset: u64,
    #[prost(uint64, tag = "5")]
    pub num_max_invoices: u64,
    #[prost(bool, tag = "6")]
    pub reversed: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListInvoiceResponse {
    #[prost(message, repeated, tag = "1")]
    pub invoices: Vec<Invoice>,
    #[prost(uint64, tag = "2")]
    pub last_index_offset: u64,
    #[prost(uint64, tag = "3")]
    pub first_index_offset: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LightningAddress {
    #[prost(string, tag = "1")]
    pub pubkey: String,
    #[prost(string, tag = "2")]
    pub host: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectPeerRequest {
    #[prost(message, optional, tag = "1")]
    pub addr: Option<LightningAddress>,
    #[prost(bool, tag = "2")]
    pub perm: bool,
    #[prost(uint64, tag = "3")]
    pub timeout: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectPeerResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DisconnectPeerRequest {
    #[prost(string, tag = "1")]
    pub pub_key: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DisconnectPeerResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListPeersRequest {
    #[prost(bool, tag = "1")]
    pub latest_error: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListPeersResponse {
    #[prost(message, repeated, tag = "1")]
    pub peers: Vec<Peer>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Peer {
    #[prost(string, tag = "1")]
    pub pub_key: String,
    #[prost(string, tag = "3")]
    pub address: String,
    #[prost(uint64, tag = "4")]
    pub bytes_sent: u64,
    #[prost(uint64, tag = "5")]
    pub bytes_recv: u64,
    #[prost(bool, tag = "8")]
    pub inbound: bool,
    #[prost(int64, tag = "9")]
    pub ping_time: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignMessageRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub msg: Vec<u8>,
    #[prost(bool, tag = "2")]
    pub single_hash: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignMessageResponse {
    #[prost(string, tag = "1")]
    pub signature: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VerifyMessageRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub msg: Vec<u8>,
    #[prost(string, tag = "2")]
    pub signature: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VerifyMessageResponse {
    #[prost(bool, tag = "1")]
    pub valid: bool,
    #[prost(string, tag = "2")]
    pub pubkey: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelPoint {
    #[prost(oneof = "channel_point::FundingTxid", tags = "1, 2")]
    pub funding_txid: Option<channel_point::FundingTxid>,
    #[prost(uint32, tag = "3")]
    pub output_index: u32,
}

pub mod channel_point {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum FundingTxid {
        /// Transaction hash in internal (reversed) byte order.
        #[prost(bytes, tag = "1")]
        FundingTxidBytes(Vec<u8>),
        #[prost(string, tag = "2")]
        FundingTxidStr(String),
    }
}

impl ChannelPoint {
    pub fn from_str_txid(txid: impl Into<String>, output_index: u32) -> Self {
        Self {
            funding_txid: Some(channel_point::FundingTxid::FundingTxidStr(txid.into())),
            output_index,
        }
    }

    /// Returns the funding transaction hash in its displayed (big endian) hex form.
    pub fn txid_hex(&self) -> Option<String> {
        match self.funding_txid.as_ref()? {
            channel_point::FundingTxid::FundingTxidStr(s) => Some(s.clone()),
            channel_point::FundingTxid::FundingTxidBytes(b) => Some(reversed_hex(b)),
        }
    }
}

/// Encodes a transaction hash given in internal byte order as displayed hex.
pub fn reversed_hex(bytes: &[u8]) -> String {
    let mut reversed = bytes.to_vec();
    reversed.reverse();
    hex::encode(reversed)
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OutPoint {
    #[prost(bytes = "vec", tag = "1")]
    pub txid_bytes: Vec<u8>,
    #[prost(string, tag = "2")]
    pub txid_str: String,
    #[prost(uint32, tag = "3")]
    pub output_index: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PolicyUpdateRequest {
    #[prost(oneof = "policy_update_request::Scope", tags = "1, 2")]
    pub scope: Option<policy_update_request::Scope>,
    #[prost(int64, tag = "3")]
    pub base_fee_msat: i64,
    #[prost(double, tag = "4")]
    pub fee_rate: f64,
    #[prost(uint32, tag = "5")]
    pub time_lock_delta: u32,
    #[prost(uint64, tag = "6")]
    pub max_htlc_msat: u64,
    #[prost(uint64, tag = "7")]
    pub min_htlc_msat: u64,
    #[prost(bool, tag = "8")]
    pub min_htlc_msat_specified: bool,
    #[prost(uint32, tag = "9")]
    pub fee_rate_ppm: u32,
}

pub mod policy_update_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Scope {
        #[prost(bool, tag = "1")]
        Global(bool),
        #[prost(message, tag = "2")]
        ChanPoint(super::ChannelPoint),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum UpdateFailure {
    Unknown = 0,
    Pending = 1,
    NotFound = 2,
    InternalErr = 3,
    InvalidParameter = 4,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FailedUpdate {
    #[prost(message, optional, tag = "1")]
    pub outpoint: Option<OutPoint>,
    #[prost(enumeration = "UpdateFailure", tag = "2")]
    pub reason: i32,
    #[prost(string, tag = "3")]
    pub update_error: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PolicyUpdateResponse {
    #[prost(message, repeated, tag = "1")]
    pub failed_updates: Vec<FailedUpdate>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Htlc {
    #[prost(bool, tag = "1")]
    pub incoming: bool,
    #[prost(int64, tag = "2")]
    pub amount: i64,
    #[prost(bytes = "vec", tag = "3")]
    pub hash_lock: Vec<u8>,
    #[prost(uint32, tag = "4")]
    pub expiration_height: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Channel {
    #[prost(bool, tag = "1")]
    pub active: bool,
    #[prost(string, tag = "2")]
    pub remote_pubkey: String,
    #[prost(string, tag = "3")]
    pub channel_point: String,
    #[prost(uint64, tag = "4")]
    pub chan_id: u64,
    #[prost(int64, tag = "5")]
    pub capacity: i64,
    #[prost(int64, tag = "6")]
    pub local_balance: i64,
    #[prost(int64, tag = "7")]
    pub remote_balance: i64,
    #[prost(int64, tag = "8")]
    pub commit_fee: i64,
    #[prost(int64, tag = "9")]
    pub commit_weight: i64,
    #[prost(int64, tag = "11")]
    pub unsettled_balance: i64,
    #[prost(uint64, tag = "14")]
    pub num_updates: u64,
    #[prost(message, repeated, tag = "15")]
    pub pending_htlcs: Vec<Htlc>,
    #[prost(bool, tag = "17")]
    pub private: bool,
    #[prost(bool, tag = "18")]
    pub initiator: bool,
    #[prost(int64, tag = "23")]
    pub lifetime: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListChannelsRequest {
    #[prost(bool, tag = "1")]
    pub active_only: bool,
    #[prost(bool, tag = "2")]
    pub inactive_only: bool,
    #[prost(bool, tag = "3")]
    pub public_only: bool,
    #[prost(bool, tag = "4")]
    pub private_only: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListChannelsResponse {
    #[prost(message, repeated, tag = "11")]
    pub channels: Vec<Channel>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ClosureType {
    CooperativeClose = 0,
    LocalForceClose = 1,
    RemoteForceClose = 2,
    BreachClose = 3,
    FundingCanceled = 4,
    Abandoned = 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Initiator {
    Unknown = 0,
    Local = 1,
    Remote = 2,
    Both = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelCloseSummary {
    #[prost(string, tag = "1")]
    pub channel_point: String,
    #[prost(uint64, tag = "2")]
    pub chan_id: u64,
    #[prost(string, tag = "4")]
    pub closing_tx_hash: String,
    #[prost(string, tag = "5")]
    pub remote_pubkey: String,
    #[prost(int64, tag = "6")]
    pub capacity: i64,
    #[prost(uint32, tag = "7")]
    pub close_height: u32,
    #[prost(enumeration = "ClosureType", tag = "10")]
    pub close_type: i32,
    #[prost(enumeration = "Initiator", tag = "11")]
    pub open_initiator: i32,
    #[prost(enumeration = "Initiator", tag = "12")]
    pub close_initiator: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PendingUpdate {
    /// Transaction hash in internal (reversed) byte order.
    #[prost(bytes = "vec", tag = "1")]
    pub txid: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub output_index: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelEventSubscription {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelEventUpdate {
    #[prost(oneof = "channel_event_update::Channel", tags = "1, 2, 3, 4, 6, 7")]
    pub channel: Option<channel_event_update::Channel>,
    #[prost(enumeration = "channel_event_update::UpdateType", tag = "5")]
    pub r#type: i32,
}

pub mod channel_event_update {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Channel {
        #[prost(message, tag = "1")]
        OpenChannel(super::Channel),
        #[prost(message, tag = "2")]
        ClosedChannel(super::ChannelCloseSummary),
        #[prost(message, tag = "3")]
        ActiveChannel(super::ChannelPoint),
        #[prost(message, tag = "4")]
        InactiveChannel(super::ChannelPoint),
        #[prost(message, tag = "6")]
        PendingOpenChannel(super::PendingUpdate),
        #[prost(message, tag = "7")]
        FullyResolvedChannel(super::ChannelPoint),
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum UpdateType {
        OpenChannel = 0,
        ClosedChannel = 1,
        ActiveChannel = 2,
        InactiveChannel = 3,
        PendingOpenChannel = 4,
        FullyResolvedChannel = 5,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GraphTopologySubscription {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeAddress {
    #[prost(string, tag = "1")]
    pub network: String,
    #[prost(string, tag = "2")]
    pub addr: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Feature {
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(bool, tag = "3")]
    pub is_required: bool,
    #[prost(bool, tag = "4")]
    pub is_known: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeUpdate {
    #[prost(string, tag = "2")]
    pub identity_key: String,
    #[prost(string, tag = "4")]
    pub alias: String,
    #[prost(string, tag = "5")]
    pub color: String,
    #[prost(map = "uint32, message", tag = "6")]
    pub features: HashMap<u32, Feature>,
    #[prost(message, repeated, tag = "7")]
    pub node_addresses: Vec<NodeAddress>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoutingPolicy {
    #[prost(uint32, tag = "1")]
    pub time_lock_delta: u32,
    #[prost(int64, tag = "2")]
    pub min_htlc: i64,
    #[prost(int64, tag = "3")]
    pub fee_base_msat: i64,
    #[prost(int64, tag = "4")]
    pub fee_rate_milli_msat: i64,
    #[prost(bool, tag = "5")]
    pub disabled: bool,
    #[prost(uint64, tag = "6")]
    pub max_htlc_msat: u64,
    #[prost(uint32, tag = "7")]
    pub last_update: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelEdgeUpdate {
    #[prost(uint64, tag = "1")]
    pub chan_id: u64,
    #[prost(message, optional, tag = "2")]
    pub chan_point: Option<ChannelPoint>,
    #[prost(int64, tag = "3")]
    pub capacity: i64,
    #[prost(message, optional, tag = "4")]
    pub routing_policy: Option<RoutingPolicy>,
    #[prost(string, tag = "5")]
    pub advertising_node: String,
    #[prost(string, tag = "6")]
    pub connecting_node: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClosedChannelUpdate {
    #[prost(uint64, tag = "1")]
    pub chan_id: u64,
    #[prost(int64, tag = "2")]
    pub capacity: i64,
    #[prost(uint32, tag = "3")]
    pub closed_height: u32,
    #[prost(message, optional, tag = "4")]
    pub chan_point: Option<ChannelPoint>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GraphTopologyUpdate {
    #[prost(message, repeated, tag = "1")]
    pub node_updates: Vec<NodeUpdate>,
    #[prost(message, repeated, tag = "2")]
    pub channel_updates: Vec<ChannelEdgeUpdate>,
    #[prost(message, repeated, tag = "3")]
    pub closed_chans: Vec<ClosedChannelUpdate>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTransactionsRequest {
    #[prost(int32, tag = "1")]
    pub start_height: i32,
    #[prost(int32, tag = "2")]
    pub end_height: i32,
    #[prost(string, tag = "3")]
    pub account: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Transaction {
    #[prost(string, tag = "1")]
    pub tx_hash: String,
    #[prost(int64, tag = "2")]
    pub amount: i64,
    #[prost(int32, tag = "3")]
    pub num_confirmations: i32,
    #[prost(string, tag = "4")]
    pub block_hash: String,
    #[prost(int32, tag = "5")]
    pub block_height: i32,
    #[prost(int64, tag = "6")]
    pub time_stamp: i64,
    #[prost(int64, tag = "7")]
    pub total_fees: i64,
    #[prost(string, repeated, tag = "8")]
    pub dest_addresses: Vec<String>,
    #[prost(string, tag = "9")]
    pub raw_tx_hex: String,
    #[prost(string, tag = "10")]
    pub label: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionDetails {
    #[prost(message, repeated, tag = "1")]
    pub transactions: Vec<Transaction>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ForwardingHistoryRequest {
    #[prost(uint64, tag = "1")]
    pub start_time: u64,
    #[prost(uint64, tag = "2")]
    pub end_time: u64,
    #[prost(uint32, tag = "3")]
    pub index_offset: u32,
    #[prost(uint32, tag = "4")]
    pub num_max_events: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ForwardingEvent {
    #[prost(uint64, tag = "2")]
    pub chan_id_in: u64,
    #[prost(uint64, tag = "4")]
    pub chan_id_out: u64,
    #[prost(uint64, tag = "8")]
    pub fee_msat: u64,
    #[prost(uint64, tag = "9")]
    pub amt_in_msat: u64,
    #[prost(uint64, tag = "10")]
    pub amt_out_msat: u64,
    #[prost(uint64, tag = "11")]
    pub timestamp_ns: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ForwardingHistoryResponse {
    #[prost(message, repeated, tag = "1")]
    pub forwarding_events: Vec<ForwardingEvent>,
    #[prost(uint32, tag = "2")]
    pub last_offset_index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PaymentStatus {
    Unknown = 0,
    InFlight = 1,
    Succeeded = 2,
    Failed = 3,
    Initiated = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PaymentFailureReason {
    FailureReasonNone = 0,
    FailureReasonTimeout = 1,
    FailureReasonNoRoute = 2,
    FailureReasonError = 3,
    FailureReasonIncorrectPaymentDetails = 4,
    FailureReasonInsufficientBalance = 5,
    FailureReasonCanceled = 6,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HtlcAttempt {
    #[prost(uint64, tag = "7")]
    pub attempt_id: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Payment {
    #[prost(string, tag = "1")]
    pub payment_hash: String,
    #[prost(string, tag = "6")]
    pub payment_preimage: String,
    #[prost(int64, tag = "8")]
    pub value_msat: i64,
    #[prost(string, tag = "9")]
    pub payment_request: String,
    #[prost(enumeration = "PaymentStatus", tag = "10")]
    pub status: i32,
    #[prost(int64, tag = "12")]
    pub fee_msat: i64,
    #[prost(int64, tag = "13")]
    pub creation_time_ns: i64,
    #[prost(message, repeated, tag = "14")]
    pub htlcs: Vec<HtlcAttempt>,
    #[prost(uint64, tag = "15")]
    pub payment_index: u64,
    #[prost(enumeration = "PaymentFailureReason", tag = "16")]
    pub failure_reason: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListPaymentsRequest {
    #[prost(bool, tag = "1")]
    pub include_incomplete: bool,
    #[prost(uint64, tag = "2")]
    pub index_offset: u64,
    #[prost(uint64, tag = "3")]
    pub max_payments: u64,
    #[prost(bool, tag = "4")]
    pub reversed: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListPaymentsResponse {
    #[prost(message, repeated, tag = "1")]
    pub payments: Vec<Payment>,
    #[prost(uint64, tag = "2")]
    pub first_index_offset: u64,
    #[prost(uint64, tag = "3")]
    pub last_index_offset: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PeerEventSubscription {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PeerEvent {
    #[prost(string, tag = "1")]
    pub pub_key: String,
    #[prost(enumeration = "peer_event::EventType", tag = "2")]
    pub r#type: i32,
}

pub mod peer_event {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum EventType {
        PeerOnline = 0,
        PeerOffline = 1,
    }
}
