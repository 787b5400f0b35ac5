//! Hand-maintained protobuf messages of the backing node gRPC services.
//!
//! The messages mirror the upstream `.proto` definitions field by field (same tags and wire
//! types) but declare only what the core reads or writes.

pub mod cln;
pub mod lnrpc;
pub mod routerrpc;
