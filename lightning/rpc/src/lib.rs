//! This crate contains the gRPC clients of the backing Lightning nodes and the client pool.
//!
//! The two implementations are exposed through the [`LndRpc`] and [`ClnRpc`] traits. Their
//! methods are thin wrappers over the upstream RPCs and return the upstream messages from
//! [`proto`]; normalizing them into the data model is left to the ingestion pipelines and the
//! request router.
//!
//! Connections are obtained from a [`pool::ClientPool`], which keeps one connection per managed
//! node and rebuilds it whenever the credentials stored in the cache change.

pub mod client;
pub mod errors;
pub mod pool;
pub mod proto;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{
    errors::Result,
    proto::{cln, lnrpc, routerrpc},
};

/// Server-streamed RPC response.
pub type RpcStream<T> = BoxStream<'static, Result<T>>;

/// Shared handle to an LND node.
pub type LndConnection = Arc<dyn LndRpc>;

/// Shared handle to a CLN node.
pub type ClnConnection = Arc<dyn ClnRpc>;

/// Operations of the LND `lnrpc.Lightning` and `routerrpc.Router` services used by the core.
#[async_trait]
pub trait LndRpc: Send + Sync {
    async fn get_info(&self) -> Result<lnrpc::GetInfoResponse>;

    async fn wallet_balance(&self) -> Result<lnrpc::WalletBalanceResponse>;

    async fn new_address(&self, request: lnrpc::NewAddressRequest) -> Result<lnrpc::NewAddressResponse>;

    async fn add_invoice(&self, invoice: lnrpc::Invoice) -> Result<lnrpc::AddInvoiceResponse>;

    async fn connect_peer(&self, request: lnrpc::ConnectPeerRequest) -> Result<()>;

    async fn disconnect_peer(&self, pub_key: String) -> Result<()>;

    async fn list_peers(&self) -> Result<Vec<lnrpc::Peer>>;

    /// Signs the message with the node key and returns the zbase32 encoded signature.
    async fn sign_message(&self, message: Vec<u8>) -> Result<String>;

    async fn verify_message(&self, message: Vec<u8>, signature: String) -> Result<lnrpc::VerifyMessageResponse>;

    async fn update_channel_policy(&self, request: lnrpc::PolicyUpdateRequest) -> Result<lnrpc::PolicyUpdateResponse>;

    async fn list_channels(&self) -> Result<Vec<lnrpc::Channel>>;

    /// Returns the wallet transactions mined at or above `start_height`, unconfirmed ones included.
    async fn get_transactions(&self, start_height: i32) -> Result<Vec<lnrpc::Transaction>>;

    async fn list_invoices(&self, request: lnrpc::ListInvoiceRequest) -> Result<lnrpc::ListInvoiceResponse>;

    async fn forwarding_history(
        &self,
        request: lnrpc::ForwardingHistoryRequest,
    ) -> Result<lnrpc::ForwardingHistoryResponse>;

    async fn list_payments(&self, request: lnrpc::ListPaymentsRequest) -> Result<lnrpc::ListPaymentsResponse>;

    async fn subscribe_channel_events(&self) -> Result<RpcStream<lnrpc::ChannelEventUpdate>>;

    async fn subscribe_channel_graph(&self) -> Result<RpcStream<lnrpc::GraphTopologyUpdate>>;

    async fn subscribe_transactions(&self) -> Result<RpcStream<lnrpc::Transaction>>;

    async fn subscribe_invoices(&self, add_index: u64, settle_index: u64) -> Result<RpcStream<lnrpc::Invoice>>;

    async fn subscribe_peer_events(&self) -> Result<RpcStream<lnrpc::PeerEvent>>;

    async fn subscribe_htlc_events(&self) -> Result<RpcStream<routerrpc::HtlcEvent>>;

    /// Follows one payment until it reaches a final state.
    async fn track_payment(&self, payment_hash: Vec<u8>) -> Result<RpcStream<lnrpc::Payment>>;
}

/// Operations of the CLN `cln.Node` service used by the core.
#[async_trait]
pub trait ClnRpc: Send + Sync {
    async fn get_info(&self) -> Result<cln::GetinfoResponse>;

    async fn list_peers(&self) -> Result<Vec<cln::ListpeersPeers>>;

    async fn list_peer_channels(&self) -> Result<Vec<cln::ListpeerchannelsChannels>>;

    async fn list_funds(&self) -> Result<cln::ListfundsResponse>;

    async fn list_nodes(&self, id: Option<Vec<u8>>) -> Result<Vec<cln::ListnodesNodes>>;

    /// Returns the gossip known for the channels announced by `source` (all channels if `None`).
    async fn list_channels(&self, source: Option<Vec<u8>>) -> Result<Vec<cln::ListchannelsChannels>>;

    async fn list_transactions(&self) -> Result<Vec<cln::ListtransactionsTransactions>>;

    async fn connect(&self, request: cln::ConnectRequest) -> Result<()>;

    async fn disconnect(&self, id: Vec<u8>, force: bool) -> Result<()>;

    async fn set_channel(&self, request: cln::SetchannelRequest) -> Result<cln::SetchannelResponse>;

    async fn new_address(&self, request: cln::NewaddrRequest) -> Result<cln::NewaddrResponse>;

    async fn invoice(&self, request: cln::InvoiceRequest) -> Result<cln::InvoiceResponse>;

    async fn sign_message(&self, message: String) -> Result<cln::SignmessageResponse>;

    async fn check_message(&self, request: cln::CheckmessageRequest) -> Result<cln::CheckmessageResponse>;
}
