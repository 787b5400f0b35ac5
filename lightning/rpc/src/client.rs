use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use http::uri::PathAndQuery;
use serde::{Deserialize, Serialize};
use tonic::{
    codec::ProstCodec,
    metadata::{Ascii, MetadataValue},
    transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity},
};
use torq_types::prelude::{Implementation, NodeConnectionDetails};

use crate::{
    ClnConnection, ClnRpc, LndConnection, LndRpc, RpcStream,
    errors::{Result, RpcError},
    pool::Connector,
    proto::{cln, lnrpc, routerrpc},
};

/// Transport settings shared by all backing node connections.
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, smart_default::SmartDefault, Serialize, Deserialize)]
#[serde(default)]
pub struct GrpcConfig {
    /// Deadline of the TLS handshake when a connection is opened.
    #[default(Duration::from_secs(15))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub connect_timeout: Duration,
    #[default(Duration::from_secs(60))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub keep_alive_interval: Duration,
    /// Name checked against the node certificate. LND certificates are issued for `localhost`.
    #[default(Some("localhost".to_string()))]
    pub tls_domain_name: Option<String>,
}

/// The part of the connection details a connection is opened with.
///
/// Two connections are interchangeable exactly when their credentials are equal.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub grpc_address: String,
    pub tls_certificate: Vec<u8>,
    pub macaroon: Option<Vec<u8>>,
    pub client_certificate: Option<Vec<u8>>,
    pub client_key: Option<Vec<u8>>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("grpc_address", &self.grpc_address)
            .field("has_macaroon", &self.macaroon.is_some())
            .field("has_client_identity", &self.client_certificate.is_some())
            .finish_non_exhaustive()
    }
}

impl TryFrom<&NodeConnectionDetails> for Credentials {
    type Error = RpcError;

    fn try_from(details: &NodeConnectionDetails) -> Result<Self> {
        let grpc_address = details
            .grpc_address
            .clone()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| RpcError::InvalidCredentials(format!("node {} has no gRPC address", details.node_id)))?;
        let tls_certificate = details
            .tls_data
            .clone()
            .ok_or_else(|| RpcError::InvalidCredentials(format!("node {} has no TLS certificate", details.node_id)))?;

        let credentials = Self {
            grpc_address,
            tls_certificate,
            macaroon: details.macaroon_data.clone(),
            client_certificate: details.certificate_data.clone(),
            client_key: details.key_data.clone(),
        };

        match details.implementation {
            Implementation::Lnd if credentials.macaroon.is_none() => Err(RpcError::InvalidCredentials(format!(
                "LND node {} has no macaroon",
                details.node_id
            ))),
            Implementation::Cln if credentials.client_certificate.is_none() || credentials.client_key.is_none() => {
                Err(RpcError::InvalidCredentials(format!(
                    "CLN node {} has no client certificate and key",
                    details.node_id
                )))
            }
            _ => Ok(credentials),
        }
    }
}

/// Opens a TLS channel to the node and waits for the handshake to complete.
pub async fn open_channel(credentials: &Credentials, cfg: &GrpcConfig) -> Result<Channel> {
    let mut tls = ClientTlsConfig::new().ca_certificate(Certificate::from_pem(&credentials.tls_certificate));
    if let (Some(certificate), Some(key)) = (&credentials.client_certificate, &credentials.client_key) {
        tls = tls.identity(Identity::from_pem(certificate, key));
    }
    if let Some(domain) = &cfg.tls_domain_name {
        tls = tls.domain_name(domain.clone());
    }

    let uri = if credentials.grpc_address.starts_with("https://") {
        credentials.grpc_address.clone()
    } else {
        format!("https://{}", credentials.grpc_address)
    };

    let endpoint = Endpoint::from_shared(uri)?
        .tls_config(tls)?
        .connect_timeout(cfg.connect_timeout)
        .http2_keep_alive_interval(cfg.keep_alive_interval)
        .keep_alive_while_idle(true);

    tokio::time::timeout(cfg.connect_timeout, endpoint.connect())
        .await
        .map_err(|_| RpcError::Timeout(cfg.connect_timeout))?
        .map_err(RpcError::from)
}

/// Minimal unary and server streaming call helpers on top of a tonic channel.
#[derive(Debug, Clone)]
struct GrpcCaller {
    channel: Channel,
    macaroon: Option<MetadataValue<Ascii>>,
}

impl GrpcCaller {
    fn request<T>(&self, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        if let Some(macaroon) = &self.macaroon {
            request.metadata_mut().insert("macaroon", macaroon.clone());
        }
        request
    }

    async fn ready(&self) -> Result<tonic::client::Grpc<Channel>> {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| tonic::Status::unknown(format!("service was not ready: {e}")))?;
        Ok(grpc)
    }

    async fn unary<Req, Resp>(&self, path: &'static str, message: Req) -> Result<Resp>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.ready().await?;
        let response = grpc
            .unary(
                self.request(message),
                PathAndQuery::from_static(path),
                ProstCodec::<Req, Resp>::default(),
            )
            .await?;
        Ok(response.into_inner())
    }

    async fn server_streaming<Req, Resp>(&self, path: &'static str, message: Req) -> Result<RpcStream<Resp>>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.ready().await?;
        let stream = grpc
            .server_streaming(
                self.request(message),
                PathAndQuery::from_static(path),
                ProstCodec::<Req, Resp>::default(),
            )
            .await?
            .into_inner();
        Ok(stream.map_err(RpcError::from).boxed())
    }
}

/// Authenticated client of an LND node.
#[derive(Debug, Clone)]
pub struct LndClient {
    caller: GrpcCaller,
}

impl LndClient {
    pub fn new(channel: Channel, macaroon: &[u8]) -> Result<Self> {
        let macaroon = MetadataValue::try_from(hex::encode(macaroon))
            .map_err(|e| RpcError::InvalidCredentials(format!("macaroon is not a valid header value: {e}")))?;
        Ok(Self {
            caller: GrpcCaller {
                channel,
                macaroon: Some(macaroon),
            },
        })
    }
}

#[async_trait]
impl LndRpc for LndClient {
    async fn get_info(&self) -> Result<lnrpc::GetInfoResponse> {
        self.caller
            .unary("/lnrpc.Lightning/GetInfo", lnrpc::GetInfoRequest {})
            .await
    }

    async fn wallet_balance(&self) -> Result<lnrpc::WalletBalanceResponse> {
        self.caller
            .unary("/lnrpc.Lightning/WalletBalance", lnrpc::WalletBalanceRequest {})
            .await
    }

    async fn new_address(&self, request: lnrpc::NewAddressRequest) -> Result<lnrpc::NewAddressResponse> {
        self.caller.unary("/lnrpc.Lightning/NewAddress", request).await
    }

    async fn add_invoice(&self, invoice: lnrpc::Invoice) -> Result<lnrpc::AddInvoiceResponse> {
        self.caller.unary("/lnrpc.Lightning/AddInvoice", invoice).await
    }

    async fn connect_peer(&self, request: lnrpc::ConnectPeerRequest) -> Result<()> {
        let _: lnrpc::ConnectPeerResponse = self.caller.unary("/lnrpc.Lightning/ConnectPeer", request).await?;
        Ok(())
    }

    async fn disconnect_peer(&self, pub_key: String) -> Result<()> {
        let _: lnrpc::DisconnectPeerResponse = self
            .caller
            .unary("/lnrpc.Lightning/DisconnectPeer", lnrpc::DisconnectPeerRequest { pub_key })
            .await?;
        Ok(())
    }

    async fn list_peers(&self) -> Result<Vec<lnrpc::Peer>> {
        let response: lnrpc::ListPeersResponse = self
            .caller
            .unary("/lnrpc.Lightning/ListPeers", lnrpc::ListPeersRequest { latest_error: false })
            .await?;
        Ok(response.peers)
    }

    async fn sign_message(&self, message: Vec<u8>) -> Result<String> {
        let response: lnrpc::SignMessageResponse = self
            .caller
            .unary(
                "/lnrpc.Lightning/SignMessage",
                lnrpc::SignMessageRequest {
                    msg: message,
                    single_hash: false,
                },
            )
            .await?;
        Ok(response.signature)
    }

    async fn verify_message(&self, message: Vec<u8>, signature: String) -> Result<lnrpc::VerifyMessageResponse> {
        self.caller
            .unary(
                "/lnrpc.Lightning/VerifyMessage",
                lnrpc::VerifyMessageRequest { msg: message, signature },
            )
            .await
    }

    async fn update_channel_policy(&self, request: lnrpc::PolicyUpdateRequest) -> Result<lnrpc::PolicyUpdateResponse> {
        self.caller.unary("/lnrpc.Lightning/UpdateChannelPolicy", request).await
    }

    async fn list_channels(&self) -> Result<Vec<lnrpc::Channel>> {
        let response: lnrpc::ListChannelsResponse = self
            .caller
            .unary("/lnrpc.Lightning/ListChannels", lnrpc::ListChannelsRequest::default())
            .await?;
        Ok(response.channels)
    }

    async fn get_transactions(&self, start_height: i32) -> Result<Vec<lnrpc::Transaction>> {
        let response: lnrpc::TransactionDetails = self
            .caller
            .unary(
                "/lnrpc.Lightning/GetTransactions",
                lnrpc::GetTransactionsRequest {
                    start_height,
                    // -1 includes unconfirmed transactions
                    end_height: -1,
                    account: String::new(),
                },
            )
            .await?;
        Ok(response.transactions)
    }

    async fn list_invoices(&self, request: lnrpc::ListInvoiceRequest) -> Result<lnrpc::ListInvoiceResponse> {
        self.caller.unary("/lnrpc.Lightning/ListInvoices", request).await
    }

    async fn forwarding_history(
        &self,
        request: lnrpc::ForwardingHistoryRequest,
    ) -> Result<lnrpc::ForwardingHistoryResponse> {
        self.caller.unary("/lnrpc.Lightning/ForwardingHistory", request).await
    }

    async fn list_payments(&self, request: lnrpc::ListPaymentsRequest) -> Result<lnrpc::ListPaymentsResponse> {
        self.caller.unary("/lnrpc.Lightning/ListPayments", request).await
    }

    async fn subscribe_channel_events(&self) -> Result<RpcStream<lnrpc::ChannelEventUpdate>> {
        self.caller
            .server_streaming(
                "/lnrpc.Lightning/SubscribeChannelEvents",
                lnrpc::ChannelEventSubscription {},
            )
            .await
    }

    async fn subscribe_channel_graph(&self) -> Result<RpcStream<lnrpc::GraphTopologyUpdate>> {
        self.caller
            .server_streaming(
                "/lnrpc.Lightning/SubscribeChannelGraph",
                lnrpc::GraphTopologySubscription {},
            )
            .await
    }

    async fn subscribe_transactions(&self) -> Result<RpcStream<lnrpc::Transaction>> {
        self.caller
            .server_streaming(
                "/lnrpc.Lightning/SubscribeTransactions",
                lnrpc::GetTransactionsRequest::default(),
            )
            .await
    }

    async fn subscribe_invoices(&self, add_index: u64, settle_index: u64) -> Result<RpcStream<lnrpc::Invoice>> {
        self.caller
            .server_streaming(
                "/lnrpc.Lightning/SubscribeInvoices",
                lnrpc::InvoiceSubscription {
                    add_index,
                    settle_index,
                },
            )
            .await
    }

    async fn subscribe_peer_events(&self) -> Result<RpcStream<lnrpc::PeerEvent>> {
        self.caller
            .server_streaming("/lnrpc.Lightning/SubscribePeerEvents", lnrpc::PeerEventSubscription {})
            .await
    }

    async fn subscribe_htlc_events(&self) -> Result<RpcStream<routerrpc::HtlcEvent>> {
        self.caller
            .server_streaming(
                "/routerrpc.Router/SubscribeHtlcEvents",
                routerrpc::SubscribeHtlcEventsRequest {},
            )
            .await
    }

    async fn track_payment(&self, payment_hash: Vec<u8>) -> Result<RpcStream<lnrpc::Payment>> {
        self.caller
            .server_streaming(
                "/routerrpc.Router/TrackPaymentV2",
                routerrpc::TrackPaymentRequest {
                    payment_hash,
                    no_inflight_updates: true,
                },
            )
            .await
    }
}

/// Client of a CLN node, authenticated by the TLS client identity.
#[derive(Debug, Clone)]
pub struct ClnClient {
    caller: GrpcCaller,
}

impl ClnClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            caller: GrpcCaller {
                channel,
                macaroon: None,
            },
        }
    }
}

#[async_trait]
impl ClnRpc for ClnClient {
    async fn get_info(&self) -> Result<cln::GetinfoResponse> {
        self.caller.unary("/cln.Node/Getinfo", cln::GetinfoRequest {}).await
    }

    async fn list_peers(&self) -> Result<Vec<cln::ListpeersPeers>> {
        let response: cln::ListpeersResponse = self
            .caller
            .unary("/cln.Node/ListPeers", cln::ListpeersRequest { id: None })
            .await?;
        Ok(response.peers)
    }

    async fn list_peer_channels(&self) -> Result<Vec<cln::ListpeerchannelsChannels>> {
        let response: cln::ListpeerchannelsResponse = self
            .caller
            .unary("/cln.Node/ListPeerChannels", cln::ListpeerchannelsRequest { id: None })
            .await?;
        Ok(response.channels)
    }

    async fn list_funds(&self) -> Result<cln::ListfundsResponse> {
        self.caller
            .unary("/cln.Node/ListFunds", cln::ListfundsRequest { spent: Some(false) })
            .await
    }

    async fn list_nodes(&self, id: Option<Vec<u8>>) -> Result<Vec<cln::ListnodesNodes>> {
        let response: cln::ListnodesResponse = self
            .caller
            .unary("/cln.Node/ListNodes", cln::ListnodesRequest { id })
            .await?;
        Ok(response.nodes)
    }

    async fn list_channels(&self, source: Option<Vec<u8>>) -> Result<Vec<cln::ListchannelsChannels>> {
        let response: cln::ListchannelsResponse = self
            .caller
            .unary(
                "/cln.Node/ListChannels",
                cln::ListchannelsRequest {
                    short_channel_id: None,
                    source,
                    destination: None,
                },
            )
            .await?;
        Ok(response.channels)
    }

    async fn list_transactions(&self) -> Result<Vec<cln::ListtransactionsTransactions>> {
        let response: cln::ListtransactionsResponse = self
            .caller
            .unary("/cln.Node/ListTransactions", cln::ListtransactionsRequest {})
            .await?;
        Ok(response.transactions)
    }

    async fn connect(&self, request: cln::ConnectRequest) -> Result<()> {
        let _: cln::ConnectResponse = self.caller.unary("/cln.Node/ConnectPeer", request).await?;
        Ok(())
    }

    async fn disconnect(&self, id: Vec<u8>, force: bool) -> Result<()> {
        let _: cln::DisconnectResponse = self
            .caller
            .unary(
                "/cln.Node/Disconnect",
                cln::DisconnectRequest {
                    id,
                    force: Some(force),
                },
            )
            .await?;
        Ok(())
    }

    async fn set_channel(&self, request: cln::SetchannelRequest) -> Result<cln::SetchannelResponse> {
        self.caller.unary("/cln.Node/SetChannel", request).await
    }

    async fn new_address(&self, request: cln::NewaddrRequest) -> Result<cln::NewaddrResponse> {
        self.caller.unary("/cln.Node/NewAddr", request).await
    }

    async fn invoice(&self, request: cln::InvoiceRequest) -> Result<cln::InvoiceResponse> {
        self.caller.unary("/cln.Node/Invoice", request).await
    }

    async fn sign_message(&self, message: String) -> Result<cln::SignmessageResponse> {
        self.caller
            .unary("/cln.Node/SignMessage", cln::SignmessageRequest { message })
            .await
    }

    async fn check_message(&self, request: cln::CheckmessageRequest) -> Result<cln::CheckmessageResponse> {
        self.caller.unary("/cln.Node/CheckMessage", request).await
    }
}

/// Opens [`LndClient`] connections.
#[derive(Debug, Clone, Default)]
pub struct LndConnector {
    cfg: GrpcConfig,
}

impl LndConnector {
    pub fn new(cfg: GrpcConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl Connector<LndConnection> for LndConnector {
    async fn open(&self, node_id: i64, credentials: &Credentials) -> Result<LndConnection> {
        let macaroon = credentials
            .macaroon
            .as_deref()
            .ok_or_else(|| RpcError::InvalidCredentials(format!("LND node {node_id} has no macaroon")))?;

        let channel = open_channel(credentials, &self.cfg).await?;
        let client = LndClient::new(channel, macaroon)?;
        tracing::info!(node_id, address = %credentials.grpc_address, "opened LND connection");
        Ok(Arc::new(client))
    }

    async fn close(&self, node_id: i64, connection: LndConnection) -> Result<()> {
        // the underlying channel shuts down when its last handle is dropped
        drop(connection);
        tracing::debug!(node_id, "closed LND connection");
        Ok(())
    }
}

/// Opens [`ClnClient`] connections.
#[derive(Debug, Clone, Default)]
pub struct ClnConnector {
    cfg: GrpcConfig,
}

impl ClnConnector {
    pub fn new(cfg: GrpcConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl Connector<ClnConnection> for ClnConnector {
    async fn open(&self, node_id: i64, credentials: &Credentials) -> Result<ClnConnection> {
        if credentials.client_certificate.is_none() || credentials.client_key.is_none() {
            return Err(RpcError::InvalidCredentials(format!(
                "CLN node {node_id} has no client certificate and key"
            )));
        }

        let channel = open_channel(credentials, &self.cfg).await?;
        tracing::info!(node_id, address = %credentials.grpc_address, "opened CLN connection");
        Ok(Arc::new(ClnClient::new(channel)))
    }

    async fn close(&self, node_id: i64, connection: ClnConnection) -> Result<()> {
        drop(connection);
        tracing::debug!(node_id, "closed CLN connection");
        Ok(())
    }
}
