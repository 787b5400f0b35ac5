//! Scripted in-memory nodes for exercising the pipelines and the request router without a
//! backing node.
//!
//! Unary answers come from the canned data in [`LndScript`] / [`ClnScript`]. Server streams
//! are fed through unbounded channels obtained from the `feed_*` methods; a stream that was
//! never fed stays pending forever, the way an idle subscription does.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::{
    StreamExt,
    channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded},
};
use parking_lot::Mutex;

use crate::{
    ClnRpc, LndRpc, RpcStream,
    client::Credentials,
    errors::{Result, RpcError},
    pool::Connector,
    proto::{cln, lnrpc, routerrpc},
};

struct Feed<T>(Mutex<Option<UnboundedReceiver<T>>>);

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self(Mutex::new(None))
    }
}

impl<T: Send + 'static> Feed<T> {
    fn sender(&self) -> UnboundedSender<T> {
        let (tx, rx) = unbounded();
        *self.0.lock() = Some(rx);
        tx
    }

    fn subscribe(&self) -> RpcStream<T> {
        match self.0.lock().take() {
            Some(rx) => rx.map(Ok).boxed(),
            None => futures::stream::pending().boxed(),
        }
    }
}

/// Failures, delays and the call log shared by both scripted implementations.
#[derive(Default)]
struct Behaviour {
    failures: Mutex<HashMap<&'static str, (tonic::Code, String)>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    calls: Mutex<Vec<&'static str>>,
}

impl Behaviour {
    async fn call(&self, method: &'static str) -> Result<()> {
        self.calls.lock().push(method);

        let delay = self.delays.lock().get(method).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.failures.lock().get(method) {
            Some((code, message)) => Err(RpcError::Status(tonic::Status::new(*code, message.clone()))),
            None => Ok(()),
        }
    }
}

/// Canned answers of a [`ScriptedLnd`].
#[derive(Debug, Clone, Default)]
pub struct LndScript {
    pub info: lnrpc::GetInfoResponse,
    pub wallet_balance: lnrpc::WalletBalanceResponse,
    pub address: String,
    pub signature: String,
    pub peers: Vec<lnrpc::Peer>,
    pub channels: Vec<lnrpc::Channel>,
    pub transactions: Vec<lnrpc::Transaction>,
    pub invoices: Vec<lnrpc::Invoice>,
    pub payments: Vec<lnrpc::Payment>,
    pub forwards: Vec<lnrpc::ForwardingEvent>,
    pub policy_failures: Vec<lnrpc::FailedUpdate>,
}

/// Requests received by a [`ScriptedLnd`] that change node state.
#[derive(Debug, Clone, Default)]
pub struct LndRequests {
    pub policy_updates: Vec<lnrpc::PolicyUpdateRequest>,
    pub connects: Vec<lnrpc::ConnectPeerRequest>,
    pub disconnects: Vec<String>,
    pub invoices: Vec<lnrpc::Invoice>,
}

#[derive(Default)]
pub struct ScriptedLnd {
    script: Mutex<LndScript>,
    requests: Mutex<LndRequests>,
    behaviour: Behaviour,
    channel_events: Feed<lnrpc::ChannelEventUpdate>,
    graph: Feed<lnrpc::GraphTopologyUpdate>,
    transactions: Feed<lnrpc::Transaction>,
    invoices: Feed<lnrpc::Invoice>,
    peer_events: Feed<lnrpc::PeerEvent>,
    htlc_events: Feed<routerrpc::HtlcEvent>,
}

impl ScriptedLnd {
    pub fn new(script: LndScript) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            ..Default::default()
        })
    }

    pub fn update_script(&self, f: impl FnOnce(&mut LndScript)) {
        f(&mut self.script.lock());
    }

    pub fn requests(&self) -> LndRequests {
        self.requests.lock().clone()
    }

    /// Makes every following call of `method` fail with the given status.
    pub fn fail(&self, method: &'static str, code: tonic::Code, message: impl Into<String>) {
        self.behaviour.failures.lock().insert(method, (code, message.into()));
    }

    pub fn recover(&self, method: &'static str) {
        self.behaviour.failures.lock().remove(method);
    }

    pub fn delay(&self, method: &'static str, delay: Duration) {
        self.behaviour.delays.lock().insert(method, delay);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.behaviour.calls.lock().iter().filter(|m| **m == method).count()
    }

    pub fn feed_channel_events(&self) -> UnboundedSender<lnrpc::ChannelEventUpdate> {
        self.channel_events.sender()
    }

    pub fn feed_graph(&self) -> UnboundedSender<lnrpc::GraphTopologyUpdate> {
        self.graph.sender()
    }

    pub fn feed_transactions(&self) -> UnboundedSender<lnrpc::Transaction> {
        self.transactions.sender()
    }

    pub fn feed_invoices(&self) -> UnboundedSender<lnrpc::Invoice> {
        self.invoices.sender()
    }

    pub fn feed_peer_events(&self) -> UnboundedSender<lnrpc::PeerEvent> {
        self.peer_events.sender()
    }

    pub fn feed_htlc_events(&self) -> UnboundedSender<routerrpc::HtlcEvent> {
        self.htlc_events.sender()
    }
}

#[async_trait]
impl LndRpc for ScriptedLnd {
    async fn get_info(&self) -> Result<lnrpc::GetInfoResponse> {
        self.behaviour.call("get_info").await?;
        Ok(self.script.lock().info.clone())
    }

    async fn wallet_balance(&self) -> Result<lnrpc::WalletBalanceResponse> {
        self.behaviour.call("wallet_balance").await?;
        Ok(self.script.lock().wallet_balance.clone())
    }

    async fn new_address(&self, _request: lnrpc::NewAddressRequest) -> Result<lnrpc::NewAddressResponse> {
        self.behaviour.call("new_address").await?;
        Ok(lnrpc::NewAddressResponse {
            address: self.script.lock().address.clone(),
        })
    }

    async fn add_invoice(&self, invoice: lnrpc::Invoice) -> Result<lnrpc::AddInvoiceResponse> {
        self.behaviour.call("add_invoice").await?;
        let mut requests = self.requests.lock();
        requests.invoices.push(invoice);
        Ok(lnrpc::AddInvoiceResponse {
            r_hash: vec![0xab; 32],
            payment_request: format!("lnbcrt{}", requests.invoices.len()),
            add_index: requests.invoices.len() as u64,
            payment_addr: vec![0xcd; 32],
        })
    }

    async fn connect_peer(&self, request: lnrpc::ConnectPeerRequest) -> Result<()> {
        self.requests.lock().connects.push(request);
        self.behaviour.call("connect_peer").await
    }

    async fn disconnect_peer(&self, pub_key: String) -> Result<()> {
        self.requests.lock().disconnects.push(pub_key);
        self.behaviour.call("disconnect_peer").await
    }

    async fn list_peers(&self) -> Result<Vec<lnrpc::Peer>> {
        self.behaviour.call("list_peers").await?;
        Ok(self.script.lock().peers.clone())
    }

    async fn sign_message(&self, _message: Vec<u8>) -> Result<String> {
        self.behaviour.call("sign_message").await?;
        Ok(self.script.lock().signature.clone())
    }

    async fn verify_message(&self, _message: Vec<u8>, signature: String) -> Result<lnrpc::VerifyMessageResponse> {
        self.behaviour.call("verify_message").await?;
        let script = self.script.lock();
        Ok(lnrpc::VerifyMessageResponse {
            valid: signature == script.signature,
            pubkey: script.info.identity_pubkey.clone(),
        })
    }

    async fn update_channel_policy(&self, request: lnrpc::PolicyUpdateRequest) -> Result<lnrpc::PolicyUpdateResponse> {
        self.requests.lock().policy_updates.push(request);
        self.behaviour.call("update_channel_policy").await?;
        Ok(lnrpc::PolicyUpdateResponse {
            failed_updates: self.script.lock().policy_failures.clone(),
        })
    }

    async fn list_channels(&self) -> Result<Vec<lnrpc::Channel>> {
        self.behaviour.call("list_channels").await?;
        Ok(self.script.lock().channels.clone())
    }

    async fn get_transactions(&self, start_height: i32) -> Result<Vec<lnrpc::Transaction>> {
        self.behaviour.call("get_transactions").await?;
        Ok(self
            .script
            .lock()
            .transactions
            .iter()
            .filter(|t| t.block_height <= 0 || t.block_height >= start_height)
            .cloned()
            .collect())
    }

    async fn list_invoices(&self, request: lnrpc::ListInvoiceRequest) -> Result<lnrpc::ListInvoiceResponse> {
        self.behaviour.call("list_invoices").await?;
        let mut invoices: Vec<lnrpc::Invoice> = self
            .script
            .lock()
            .invoices
            .iter()
            .filter(|i| i.add_index > request.index_offset)
            .cloned()
            .collect();
        invoices.sort_by_key(|i| i.add_index);
        if request.num_max_invoices > 0 {
            invoices.truncate(request.num_max_invoices as usize);
        }

        Ok(lnrpc::ListInvoiceResponse {
            first_index_offset: invoices.first().map(|i| i.add_index).unwrap_or_default(),
            last_index_offset: invoices.last().map(|i| i.add_index).unwrap_or(request.index_offset),
            invoices,
        })
    }

    async fn forwarding_history(
        &self,
        request: lnrpc::ForwardingHistoryRequest,
    ) -> Result<lnrpc::ForwardingHistoryResponse> {
        self.behaviour.call("forwarding_history").await?;
        let mut forwards: Vec<lnrpc::ForwardingEvent> = self
            .script
            .lock()
            .forwards
            .iter()
            .filter(|f| f.timestamp_ns / 1_000_000_000 >= request.start_time)
            .cloned()
            .collect();
        forwards.sort_by_key(|f| f.timestamp_ns);

        let forwarding_events: Vec<lnrpc::ForwardingEvent> = forwards
            .into_iter()
            .skip(request.index_offset as usize)
            .take(if request.num_max_events > 0 {
                request.num_max_events as usize
            } else {
                usize::MAX
            })
            .collect();

        Ok(lnrpc::ForwardingHistoryResponse {
            last_offset_index: request.index_offset + forwarding_events.len() as u32,
            forwarding_events,
        })
    }

    async fn list_payments(&self, request: lnrpc::ListPaymentsRequest) -> Result<lnrpc::ListPaymentsResponse> {
        self.behaviour.call("list_payments").await?;
        let mut payments: Vec<lnrpc::Payment> = self
            .script
            .lock()
            .payments
            .iter()
            .filter(|p| p.payment_index > request.index_offset)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.payment_index);
        if request.max_payments > 0 {
            payments.truncate(request.max_payments as usize);
        }

        Ok(lnrpc::ListPaymentsResponse {
            first_index_offset: payments.first().map(|p| p.payment_index).unwrap_or_default(),
            last_index_offset: payments.last().map(|p| p.payment_index).unwrap_or(request.index_offset),
            payments,
        })
    }

    async fn subscribe_channel_events(&self) -> Result<RpcStream<lnrpc::ChannelEventUpdate>> {
        self.behaviour.call("subscribe_channel_events").await?;
        Ok(self.channel_events.subscribe())
    }

    async fn subscribe_channel_graph(&self) -> Result<RpcStream<lnrpc::GraphTopologyUpdate>> {
        self.behaviour.call("subscribe_channel_graph").await?;
        Ok(self.graph.subscribe())
    }

    async fn subscribe_transactions(&self) -> Result<RpcStream<lnrpc::Transaction>> {
        self.behaviour.call("subscribe_transactions").await?;
        Ok(self.transactions.subscribe())
    }

    async fn subscribe_invoices(&self, _add_index: u64, _settle_index: u64) -> Result<RpcStream<lnrpc::Invoice>> {
        self.behaviour.call("subscribe_invoices").await?;
        Ok(self.invoices.subscribe())
    }

    async fn subscribe_peer_events(&self) -> Result<RpcStream<lnrpc::PeerEvent>> {
        self.behaviour.call("subscribe_peer_events").await?;
        Ok(self.peer_events.subscribe())
    }

    async fn subscribe_htlc_events(&self) -> Result<RpcStream<routerrpc::HtlcEvent>> {
        self.behaviour.call("subscribe_htlc_events").await?;
        Ok(self.htlc_events.subscribe())
    }

    async fn track_payment(&self, payment_hash: Vec<u8>) -> Result<RpcStream<lnrpc::Payment>> {
        self.behaviour.call("track_payment").await?;
        let hash = hex::encode(payment_hash);
        let payment = self
            .script
            .lock()
            .payments
            .iter()
            .find(|p| p.payment_hash == hash)
            .cloned();

        Ok(match payment {
            Some(payment) => futures::stream::iter([Ok(payment)]).boxed(),
            None => futures::stream::pending().boxed(),
        })
    }
}

/// Canned answers of a [`ScriptedCln`].
#[derive(Debug, Clone, Default)]
pub struct ClnScript {
    pub info: cln::GetinfoResponse,
    pub peers: Vec<cln::ListpeersPeers>,
    pub peer_channels: Vec<cln::ListpeerchannelsChannels>,
    pub funds: cln::ListfundsResponse,
    pub nodes: Vec<cln::ListnodesNodes>,
    pub channels: Vec<cln::ListchannelsChannels>,
    pub transactions: Vec<cln::ListtransactionsTransactions>,
    pub address: String,
    pub zbase: String,
}

/// Requests received by a [`ScriptedCln`] that change node state.
#[derive(Debug, Clone, Default)]
pub struct ClnRequests {
    pub set_channels: Vec<cln::SetchannelRequest>,
    pub connects: Vec<cln::ConnectRequest>,
    pub disconnects: Vec<Vec<u8>>,
    pub invoices: Vec<cln::InvoiceRequest>,
}

#[derive(Default)]
pub struct ScriptedCln {
    script: Mutex<ClnScript>,
    requests: Mutex<ClnRequests>,
    behaviour: Behaviour,
}

impl ScriptedCln {
    pub fn new(script: ClnScript) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            ..Default::default()
        })
    }

    pub fn update_script(&self, f: impl FnOnce(&mut ClnScript)) {
        f(&mut self.script.lock());
    }

    pub fn requests(&self) -> ClnRequests {
        self.requests.lock().clone()
    }

    pub fn fail(&self, method: &'static str, code: tonic::Code, message: impl Into<String>) {
        self.behaviour.failures.lock().insert(method, (code, message.into()));
    }

    pub fn recover(&self, method: &'static str) {
        self.behaviour.failures.lock().remove(method);
    }

    pub fn delay(&self, method: &'static str, delay: Duration) {
        self.behaviour.delays.lock().insert(method, delay);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.behaviour.calls.lock().iter().filter(|m| **m == method).count()
    }
}

#[async_trait]
impl ClnRpc for ScriptedCln {
    async fn get_info(&self) -> Result<cln::GetinfoResponse> {
        self.behaviour.call("get_info").await?;
        Ok(self.script.lock().info.clone())
    }

    async fn list_peers(&self) -> Result<Vec<cln::ListpeersPeers>> {
        self.behaviour.call("list_peers").await?;
        Ok(self.script.lock().peers.clone())
    }

    async fn list_peer_channels(&self) -> Result<Vec<cln::ListpeerchannelsChannels>> {
        self.behaviour.call("list_peer_channels").await?;
        Ok(self.script.lock().peer_channels.clone())
    }

    async fn list_funds(&self) -> Result<cln::ListfundsResponse> {
        self.behaviour.call("list_funds").await?;
        Ok(self.script.lock().funds.clone())
    }

    async fn list_nodes(&self, id: Option<Vec<u8>>) -> Result<Vec<cln::ListnodesNodes>> {
        self.behaviour.call("list_nodes").await?;
        Ok(self
            .script
            .lock()
            .nodes
            .iter()
            .filter(|n| id.as_ref().is_none_or(|id| *id == n.nodeid))
            .cloned()
            .collect())
    }

    async fn list_channels(&self, source: Option<Vec<u8>>) -> Result<Vec<cln::ListchannelsChannels>> {
        self.behaviour.call("list_channels").await?;
        Ok(self
            .script
            .lock()
            .channels
            .iter()
            .filter(|c| source.as_ref().is_none_or(|s| *s == c.source))
            .cloned()
            .collect())
    }

    async fn list_transactions(&self) -> Result<Vec<cln::ListtransactionsTransactions>> {
        self.behaviour.call("list_transactions").await?;
        Ok(self.script.lock().transactions.clone())
    }

    async fn connect(&self, request: cln::ConnectRequest) -> Result<()> {
        self.requests.lock().connects.push(request);
        self.behaviour.call("connect").await
    }

    async fn disconnect(&self, id: Vec<u8>, _force: bool) -> Result<()> {
        self.requests.lock().disconnects.push(id);
        self.behaviour.call("disconnect").await
    }

    async fn set_channel(&self, request: cln::SetchannelRequest) -> Result<cln::SetchannelResponse> {
        self.requests.lock().set_channels.push(request.clone());
        self.behaviour.call("set_channel").await?;
        Ok(cln::SetchannelResponse {
            channels: vec![cln::SetchannelChannels {
                short_channel_id: Some(request.id),
                ..Default::default()
            }],
        })
    }

    async fn new_address(&self, _request: cln::NewaddrRequest) -> Result<cln::NewaddrResponse> {
        self.behaviour.call("new_address").await?;
        Ok(cln::NewaddrResponse {
            bech32: Some(self.script.lock().address.clone()),
            p2tr: None,
        })
    }

    async fn invoice(&self, request: cln::InvoiceRequest) -> Result<cln::InvoiceResponse> {
        self.behaviour.call("invoice").await?;
        let mut requests = self.requests.lock();
        requests.invoices.push(request);
        Ok(cln::InvoiceResponse {
            bolt11: format!("lnbcrt{}", requests.invoices.len()),
            payment_hash: vec![0xab; 32],
            payment_secret: vec![0xcd; 32],
            expires_at: 0,
        })
    }

    async fn sign_message(&self, _message: String) -> Result<cln::SignmessageResponse> {
        self.behaviour.call("sign_message").await?;
        Ok(cln::SignmessageResponse {
            signature: vec![1; 64],
            zbase: self.script.lock().zbase.clone(),
        })
    }

    async fn check_message(&self, request: cln::CheckmessageRequest) -> Result<cln::CheckmessageResponse> {
        self.behaviour.call("check_message").await?;
        let script = self.script.lock();
        Ok(cln::CheckmessageResponse {
            verified: request.zbase == script.zbase,
            pubkey: script.info.id.clone(),
        })
    }
}

/// Hands out clones of one pre-built connection regardless of the credentials.
pub struct StaticConnector<T> {
    connection: T,
    opened: Mutex<Vec<i64>>,
}

impl<T> StaticConnector<T> {
    pub fn new(connection: T) -> Arc<Self> {
        Arc::new(Self {
            connection,
            opened: Mutex::new(Vec::new()),
        })
    }

    /// Node ids a connection was opened for, in order.
    pub fn opened(&self) -> Vec<i64> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> Connector<T> for StaticConnector<T> {
    async fn open(&self, node_id: i64, _credentials: &Credentials) -> Result<T> {
        self.opened.lock().push(node_id);
        Ok(self.connection.clone())
    }

    async fn close(&self, _node_id: i64, _connection: T) -> Result<()> {
        Ok(())
    }
}
