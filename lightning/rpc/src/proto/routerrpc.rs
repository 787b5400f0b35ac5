//! Messages of the `routerrpc.Router` service used by the core.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscribeHtlcEventsRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HtlcInfo {
    #[prost(uint32, tag = "1")]
    pub incoming_timelock: u32,
    #[prost(uint32, tag = "2")]
    pub outgoing_timelock: u32,
    #[prost(uint64, tag = "3")]
    pub incoming_amt_msat: u64,
    #[prost(uint64, tag = "4")]
    pub outgoing_amt_msat: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ForwardEvent {
    #[prost(message, optional, tag = "1")]
    pub info: Option<HtlcInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ForwardFailEvent {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SettleEvent {
    #[prost(bytes = "vec", tag = "1")]
    pub preimage: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LinkFailEvent {
    #[prost(message, optional, tag = "1")]
    pub info: Option<HtlcInfo>,
    #[prost(int32, tag = "2")]
    pub wire_failure: i32,
    #[prost(int32, tag = "3")]
    pub failure_detail: i32,
    #[prost(string, tag = "4")]
    pub failure_string: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscribedEvent {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FinalHtlcEvent {
    #[prost(bool, tag = "1")]
    pub settled: bool,
    #[prost(bool, tag = "2")]
    pub offchain: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HtlcEvent {
    #[prost(uint64, tag = "1")]
    pub incoming_channel_id: u64,
    #[prost(uint64, tag = "2")]
    pub outgoing_channel_id: u64,
    #[prost(uint64, tag = "3")]
    pub incoming_htlc_id: u64,
    #[prost(uint64, tag = "4")]
    pub outgoing_htlc_id: u64,
    #[prost(uint64, tag = "5")]
    pub timestamp_ns: u64,
    #[prost(enumeration = "htlc_event::EventType", tag = "6")]
    pub event_type: i32,
    #[prost(oneof = "htlc_event::Event", tags = "7, 8, 9, 10, 11, 12")]
    pub event: Option<htlc_event::Event>,
}

pub mod htlc_event {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum EventType {
        Unknown = 0,
        Send = 1,
        Receive = 2,
        Forward = 3,
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Event {
        #[prost(message, tag = "7")]
        ForwardEvent(super::ForwardEvent),
        #[prost(message, tag = "8")]
        ForwardFailEvent(super::ForwardFailEvent),
        #[prost(message, tag = "9")]
        SettleEvent(super::SettleEvent),
        #[prost(message, tag = "10")]
        LinkFailEvent(super::LinkFailEvent),
        #[prost(message, tag = "11")]
        SubscribedEvent(super::SubscribedEvent),
        #[prost(message, tag = "12")]
        FinalHtlcEvent(super::FinalHtlcEvent),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TrackPaymentRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub payment_hash: Vec<u8>,
    #[prost(bool, tag = "2")]
    pub no_inflight_updates: bool,
}
