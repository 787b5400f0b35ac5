//! Payment activity and on-chain transactions of managed nodes.

use serde::{Deserialize, Serialize};

use crate::{Timestamp, int_enum};

/// Bitmap of authoritative transaction facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TransactionFlags(pub u32);

impl TransactionFlags {
    /// The timestamp is the block timestamp reported by the block explorer.
    pub const BLOCK_TIMESTAMP: TransactionFlags = TransactionFlags(1);

    pub fn contains(&self, other: TransactionFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// On-chain wallet transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transaction {
    pub node_id: i64,
    pub tx_hash: String,
    pub timestamp: Option<Timestamp>,
    pub amount: i64,
    pub total_fees: i64,
    pub num_confirmations: i32,
    pub block_height: u32,
    pub block_hash: Option<String>,
    pub dest_addresses: Vec<String>,
    pub raw_tx_hex: Option<String>,
    pub label: Option<String>,
    pub flags: TransactionFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InvoiceState {
    #[default]
    Open,
    Settled,
    Canceled,
    Accepted,
}

int_enum!(InvoiceState {
    Open = 0,
    Settled = 1,
    Canceled = 2,
    Accepted = 3,
});

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Invoice {
    pub node_id: i64,
    pub payment_hash: String,
    pub payment_request: String,
    pub memo: String,
    pub value_msat: i64,
    pub amount_paid_msat: i64,
    pub state: InvoiceState,
    pub creation_date: Option<Timestamp>,
    pub settle_date: Option<Timestamp>,
    pub add_index: u64,
    pub settle_index: u64,
    pub expiry: i64,
    pub private: bool,
    pub is_keysend: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    Unknown,
    InFlight,
    Succeeded,
    Failed,
    Initiated,
}

int_enum!(PaymentStatus {
    Unknown = 0,
    InFlight = 1,
    Succeeded = 2,
    Failed = 3,
    Initiated = 4,
});

impl PaymentStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded | PaymentStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payment {
    pub node_id: i64,
    pub payment_hash: String,
    pub payment_index: u64,
    pub value_msat: i64,
    pub fee_msat: i64,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub creation_time: Option<Timestamp>,
    pub payment_preimage: Option<String>,
    pub payment_request: Option<String>,
    pub htlc_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Forward {
    pub node_id: i64,
    /// Nanoseconds since the unix epoch.
    pub time_ns: i64,
    pub incoming_channel_id: Option<i64>,
    pub outgoing_channel_id: Option<i64>,
    pub amount_in_msat: u64,
    pub amount_out_msat: u64,
    pub fee_msat: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HtlcEventType {
    #[default]
    Unknown,
    Send,
    Receive,
    Forward,
}

int_enum!(HtlcEventType {
    Unknown = 0,
    Send = 1,
    Receive = 2,
    Forward = 3,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HtlcEventKind {
    #[default]
    Subscribed,
    Forward,
    ForwardFail,
    Settle,
    LinkFail,
    FinalHtlc,
}

int_enum!(HtlcEventKind {
    Subscribed = 0,
    Forward = 1,
    ForwardFail = 2,
    Settle = 3,
    LinkFail = 4,
    FinalHtlc = 5,
});

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HtlcEvent {
    pub node_id: i64,
    pub time_ns: i64,
    pub event_type: HtlcEventType,
    pub kind: HtlcEventKind,
    pub incoming_channel_id: Option<i64>,
    pub outgoing_channel_id: Option<i64>,
    pub incoming_htlc_id: Option<u64>,
    pub outgoing_htlc_id: Option<u64>,
    pub incoming_amount_msat: Option<u64>,
    pub outgoing_amount_msat: Option<u64>,
    pub incoming_timelock: Option<u32>,
    pub outgoing_timelock: Option<u32>,
    pub wire_failure: Option<i32>,
    pub failure_detail: Option<i32>,
    pub failure_string: Option<String>,
    pub settled: Option<bool>,
    pub offchain: Option<bool>,
}
