//! Messages of the `cln.Node` service used by the core.

#[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
pub struct Amount {
    #[prost(uint64, tag = "1")]
    pub msat: u64,
}

impl Amount {
    pub fn from_msat(msat: u64) -> Self {
        Self { msat }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetinfoRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetinfoResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub id: Vec<u8>,
    #[prost(string, optional, tag = "2")]
    pub alias: Option<String>,
    #[prost(bytes = "vec", tag = "3")]
    pub color: Vec<u8>,
    #[prost(uint32, tag = "4")]
    pub num_peers: u32,
    #[prost(uint32, tag = "5")]
    pub num_pending_channels: u32,
    #[prost(uint32, tag = "6")]
    pub num_active_channels: u32,
    #[prost(uint32, tag = "7")]
    pub num_inactive_channels: u32,
    #[prost(string, tag = "8")]
    pub version: String,
    #[prost(uint32, tag = "11")]
    pub blockheight: u32,
    #[prost(string, tag = "12")]
    pub network: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListpeersRequest {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub id: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListpeersPeers {
    #[prost(bytes = "vec", tag = "1")]
    pub id: Vec<u8>,
    #[prost(bool, tag = "2")]
    pub connected: bool,
    #[prost(string, repeated, tag = "5")]
    pub netaddr: Vec<String>,
    #[prost(string, optional, tag = "7")]
    pub remote_addr: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListpeersResponse {
    #[prost(message, repeated, tag = "1")]
    pub peers: Vec<ListpeersPeers>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ChannelState {
    Openingd = 0,
    ChanneldAwaitingLockin = 1,
    ChanneldNormal = 2,
    ChanneldShuttingDown = 3,
    ClosingdSigexchange = 4,
    ClosingdComplete = 5,
    AwaitingUnilateral = 6,
    FundingSpendSeen = 7,
    Onchain = 8,
    DualopendOpenInit = 9,
    DualopendAwaitingLockin = 10,
    ChanneldAwaitingSplice = 11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ChannelSide {
    Local = 0,
    Remote = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListpeerchannelsRequest {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub id: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListpeerchannelsChannels {
    #[prost(bytes = "vec", tag = "1")]
    pub peer_id: Vec<u8>,
    #[prost(bool, tag = "2")]
    pub peer_connected: bool,
    #[prost(enumeration = "ChannelState", tag = "3")]
    pub state: i32,
    #[prost(string, optional, tag = "8")]
    pub short_channel_id: Option<String>,
    /// Funding transaction hash in displayed byte order.
    #[prost(bytes = "vec", optional, tag = "10")]
    pub funding_txid: Option<Vec<u8>>,
    #[prost(uint32, optional, tag = "11")]
    pub funding_outnum: Option<u32>,
    #[prost(bool, optional, tag = "18")]
    pub private: Option<bool>,
    #[prost(enumeration = "ChannelSide", tag = "19")]
    pub opener: i32,
    #[prost(enumeration = "ChannelSide", optional, tag = "20")]
    pub closer: Option<i32>,
    #[prost(message, optional, tag = "23")]
    pub to_us_msat: Option<Amount>,
    #[prost(message, optional, tag = "26")]
    pub total_msat: Option<Amount>,
    #[prost(message, optional, tag = "27")]
    pub fee_base_msat: Option<Amount>,
    #[prost(uint32, optional, tag = "28")]
    pub fee_proportional_millionths: Option<u32>,
    #[prost(message, optional, tag = "35")]
    pub minimum_htlc_out_msat: Option<Amount>,
    #[prost(message, optional, tag = "37")]
    pub maximum_htlc_out_msat: Option<Amount>,
    /// Channel update parameters announced by each side.
    #[prost(message, optional, tag = "55")]
    pub updates: Option<ListpeerchannelsChannelsUpdates>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListpeerchannelsChannelsUpdates {
    #[prost(message, optional, tag = "1")]
    pub local: Option<ListpeerchannelsChannelsUpdatesLocal>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListpeerchannelsChannelsUpdatesLocal {
    #[prost(message, optional, tag = "1")]
    pub htlc_minimum_msat: Option<Amount>,
    #[prost(message, optional, tag = "2")]
    pub htlc_maximum_msat: Option<Amount>,
    #[prost(uint32, tag = "3")]
    pub cltv_expiry_delta: u32,
    #[prost(message, optional, tag = "4")]
    pub fee_base_msat: Option<Amount>,
    #[prost(uint32, tag = "5")]
    pub fee_proportional_millionths: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListpeerchannelsResponse {
    #[prost(message, repeated, tag = "1")]
    pub channels: Vec<ListpeerchannelsChannels>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListfundsRequest {
    #[prost(bool, optional, tag = "1")]
    pub spent: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OutputStatus {
    Unconfirmed = 0,
    Confirmed = 1,
    Spent = 2,
    Immature = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListfundsOutputs {
    #[prost(bytes = "vec", tag = "1")]
    pub txid: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub output: u32,
    #[prost(message, optional, tag = "3")]
    pub amount_msat: Option<Amount>,
    #[prost(enumeration = "OutputStatus", tag = "7")]
    pub status: i32,
    #[prost(uint32, optional, tag = "8")]
    pub blockheight: Option<u32>,
    #[prost(bool, tag = "9")]
    pub reserved: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListfundsChannels {
    #[prost(bytes = "vec", tag = "1")]
    pub peer_id: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub our_amount_msat: Option<Amount>,
    #[prost(message, optional, tag = "3")]
    pub amount_msat: Option<Amount>,
    #[prost(bytes = "vec", tag = "4")]
    pub funding_txid: Vec<u8>,
    #[prost(uint32, tag = "5")]
    pub funding_output: u32,
    #[prost(bool, tag = "6")]
    pub connected: bool,
    #[prost(enumeration = "ChannelState", tag = "7")]
    pub state: i32,
    #[prost(string, optional, tag = "8")]
    pub short_channel_id: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListfundsResponse {
    #[prost(message, repeated, tag = "1")]
    pub outputs: Vec<ListfundsOutputs>,
    #[prost(message, repeated, tag = "2")]
    pub channels: Vec<ListfundsChannels>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListnodesRequest {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub id: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListnodesNodesAddresses {
    #[prost(int32, tag = "1")]
    pub item_type: i32,
    #[prost(uint32, tag = "2")]
    pub port: u32,
    #[prost(string, optional, tag = "3")]
    pub address: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListnodesNodes {
    #[prost(bytes = "vec", tag = "1")]
    pub nodeid: Vec<u8>,
    #[prost(uint32, optional, tag = "2")]
    pub last_timestamp: Option<u32>,
    #[prost(string, optional, tag = "3")]
    pub alias: Option<String>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub color: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub features: Option<Vec<u8>>,
    #[prost(message, repeated, tag = "6")]
    pub addresses: Vec<ListnodesNodesAddresses>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListnodesResponse {
    #[prost(message, repeated, tag = "1")]
    pub nodes: Vec<ListnodesNodes>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListchannelsRequest {
    #[prost(string, optional, tag = "1")]
    pub short_channel_id: Option<String>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub source: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub destination: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListchannelsChannels {
    #[prost(bytes = "vec", tag = "1")]
    pub source: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub destination: Vec<u8>,
    #[prost(string, tag = "3")]
    pub short_channel_id: String,
    #[prost(bool, tag = "4")]
    pub public: bool,
    #[prost(message, optional, tag = "5")]
    pub amount_msat: Option<Amount>,
    #[prost(bool, tag = "8")]
    pub active: bool,
    #[prost(uint32, tag = "9")]
    pub last_update: u32,
    #[prost(uint32, tag = "10")]
    pub base_fee_millisatoshi: u32,
    #[prost(uint32, tag = "11")]
    pub fee_per_millionth: u32,
    #[prost(uint32, tag = "12")]
    pub delay: u32,
    #[prost(message, optional, tag = "13")]
    pub htlc_minimum_msat: Option<Amount>,
    #[prost(message, optional, tag = "14")]
    pub htlc_maximum_msat: Option<Amount>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListchannelsResponse {
    #[prost(message, repeated, tag = "1")]
    pub channels: Vec<ListchannelsChannels>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListtransactionsRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListtransactionsTransactionsOutputs {
    #[prost(uint32, tag = "1")]
    pub index: u32,
    #[prost(message, optional, tag = "6")]
    pub amount_msat: Option<Amount>,
    #[prost(bytes = "vec", tag = "7")]
    pub script_pub_key: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListtransactionsTransactions {
    #[prost(bytes = "vec", tag = "1")]
    pub hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub rawtx: Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub blockheight: u32,
    #[prost(uint32, tag = "4")]
    pub txindex: u32,
    #[prost(message, repeated, tag = "10")]
    pub outputs: Vec<ListtransactionsTransactionsOutputs>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListtransactionsResponse {
    #[prost(message, repeated, tag = "1")]
    pub transactions: Vec<ListtransactionsTransactions>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectRequest {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, optional, tag = "2")]
    pub host: Option<String>,
    #[prost(uint32, optional, tag = "3")]
    pub port: Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub id: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DisconnectRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub id: Vec<u8>,
    #[prost(bool, optional, tag = "2")]
    pub force: Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DisconnectResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetchannelRequest {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(message, optional, tag = "2")]
    pub feebase: Option<Amount>,
    #[prost(uint32, optional, tag = "3")]
    pub feeppm: Option<u32>,
    #[prost(message, optional, tag = "4")]
    pub htlcmin: Option<Amount>,
    #[prost(message, optional, tag = "5")]
    pub htlcmax: Option<Amount>,
    #[prost(uint32, optional, tag = "6")]
    pub enforcedelay: Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetchannelChannels {
    #[prost(bytes = "vec", tag = "1")]
    pub peer_id: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub channel_id: Vec<u8>,
    #[prost(string, optional, tag = "3")]
    pub short_channel_id: Option<String>,
    #[prost(string, optional, tag = "7")]
    pub warning_htlcmin_too_low: Option<String>,
    #[prost(string, optional, tag = "9")]
    pub warning_htlcmax_too_high: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetchannelResponse {
    #[prost(message, repeated, tag = "1")]
    pub channels: Vec<SetchannelChannels>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum NewaddrAddresstype {
    Bech32 = 0,
    All = 2,
    P2tr = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NewaddrRequest {
    #[prost(enumeration = "NewaddrAddresstype", optional, tag = "3")]
    pub addresstype: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NewaddrResponse {
    #[prost(string, optional, tag = "1")]
    pub bech32: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub p2tr: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AmountOrAny {
    #[prost(oneof = "amount_or_any::Value", tags = "1, 2")]
    pub value: Option<amount_or_any::Value>,
}

pub mod amount_or_any {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(message, tag = "1")]
        Amount(super::Amount),
        #[prost(bool, tag = "2")]
        Any(bool),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InvoiceRequest {
    #[prost(string, tag = "2")]
    pub description: String,
    #[prost(string, tag = "3")]
    pub label: String,
    #[prost(uint64, optional, tag = "7")]
    pub expiry: Option<u64>,
    #[prost(message, optional, tag = "10")]
    pub amount_msat: Option<AmountOrAny>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InvoiceResponse {
    #[prost(string, tag = "1")]
    pub bolt11: String,
    #[prost(bytes = "vec", tag = "2")]
    pub payment_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub payment_secret: Vec<u8>,
    #[prost(uint64, tag = "4")]
    pub expires_at: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignmessageRequest {
    #[prost(string, tag = "1")]
    pub message: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignmessageResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub signature: Vec<u8>,
    #[prost(string, tag = "3")]
    pub zbase: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckmessageRequest {
    #[prost(string, tag = "1")]
    pub message: String,
    #[prost(string, tag = "2")]
    pub zbase: String,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub pubkey: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckmessageResponse {
    #[prost(bool, tag = "1")]
    pub verified: bool,
    #[prost(bytes = "vec", tag = "2")]
    pub pubkey: Vec<u8>,
}
