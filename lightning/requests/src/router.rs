use std::{future::Future, sync::Arc, time::Duration};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{Semaphore, mpsc, oneshot},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use torq_cache::TorqCache;
use torq_db::TorqDbAllOperations;
use torq_types::prelude::{Implementation, RoutingPolicy, RoutingPolicyEvent, WalletBalance};

use crate::{
    backend::{BackendProvider, InvoiceParameters},
    errors::{RequestError, Result},
    messages::*,
    policy,
};

/// Settings of the request router.
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, smart_default::SmartDefault, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Number of requests that may wait for a worker.
    #[default(100)]
    pub channel_capacity: usize,
    /// Concurrent requests per LND node.
    #[default(10)]
    pub lnd_permits: usize,
    /// Concurrent requests per CLN node.
    #[default(1)]
    pub cln_permits: usize,
    /// Deadline of information, balance and signature requests.
    #[default(Duration::from_secs(2))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub read_timeout: Duration,
    /// Deadline of routing policy, address and invoice requests.
    #[default(Duration::from_secs(30))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub write_timeout: Duration,
    /// Deadline of peer and list requests.
    #[default(Duration::from_secs(60))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub peer_timeout: Duration,
    #[default(300)]
    pub rate_limit_seconds: u32,
    #[default(2)]
    pub rate_limit_count: u32,
}

/// A request together with the channel its response is sent on.
#[derive(Debug)]
pub enum LightningRequest {
    RoutingPolicyUpdate(RoutingPolicyUpdateRequest, oneshot::Sender<RoutingPolicyUpdateResponse>),
    ConnectPeer(ConnectPeerRequest, oneshot::Sender<ConnectPeerResponse>),
    DisconnectPeer(DisconnectPeerRequest, oneshot::Sender<DisconnectPeerResponse>),
    NewAddress(NewAddressRequest, oneshot::Sender<NewAddressResponse>),
    NewInvoice(NewInvoiceRequest, oneshot::Sender<NewInvoiceResponse>),
    WalletBalance(i64, oneshot::Sender<WalletBalanceResponse>),
    ListPeers(i64, oneshot::Sender<ListPeersResponse>),
    SignMessage(SignMessageRequest, oneshot::Sender<SignMessageResponse>),
    SignatureVerification(SignatureVerificationRequest, oneshot::Sender<SignatureVerificationResponse>),
    Information(i64, oneshot::Sender<InformationResponse>),
}

impl LightningRequest {
    pub fn node_id(&self) -> i64 {
        match self {
            LightningRequest::RoutingPolicyUpdate(r, _) => r.node_id,
            LightningRequest::ConnectPeer(r, _) => r.node_id,
            LightningRequest::DisconnectPeer(r, _) => r.node_id,
            LightningRequest::NewAddress(r, _) => r.node_id,
            LightningRequest::NewInvoice(r, _) => r.node_id,
            LightningRequest::SignMessage(r, _) => r.node_id,
            LightningRequest::SignatureVerification(r, _) => r.node_id,
            LightningRequest::WalletBalance(node_id, _)
            | LightningRequest::ListPeers(node_id, _)
            | LightningRequest::Information(node_id, _) => *node_id,
        }
    }

    fn timeout(&self, cfg: &RouterConfig) -> Duration {
        match self {
            LightningRequest::Information(..)
            | LightningRequest::WalletBalance(..)
            | LightningRequest::SignMessage(..)
            | LightningRequest::SignatureVerification(..) => cfg.read_timeout,
            LightningRequest::RoutingPolicyUpdate(..)
            | LightningRequest::NewAddress(..)
            | LightningRequest::NewInvoice(..) => cfg.write_timeout,
            LightningRequest::ConnectPeer(..) | LightningRequest::DisconnectPeer(..) | LightningRequest::ListPeers(..) => {
                cfg.peer_timeout
            }
        }
    }

    /// Answers the request as Inactive without executing it.
    fn refuse(self, error: RequestError) {
        let node_id = self.node_id();
        // a caller that stopped waiting is not an error
        let _ = match self {
            LightningRequest::RoutingPolicyUpdate(_, tx) => tx.send(Response::inactive(node_id, error)).is_ok(),
            LightningRequest::ConnectPeer(_, tx) => tx.send(Response::inactive(node_id, error)).is_ok(),
            LightningRequest::DisconnectPeer(_, tx) => tx.send(Response::inactive(node_id, error)).is_ok(),
            LightningRequest::NewAddress(_, tx) => tx.send(Response::inactive(node_id, error)).is_ok(),
            LightningRequest::NewInvoice(_, tx) => tx.send(Response::inactive(node_id, error)).is_ok(),
            LightningRequest::WalletBalance(_, tx) => tx.send(Response::inactive(node_id, error)).is_ok(),
            LightningRequest::ListPeers(_, tx) => tx.send(Response::inactive(node_id, error)).is_ok(),
            LightningRequest::SignMessage(_, tx) => tx.send(Response::inactive(node_id, error)).is_ok(),
            LightningRequest::SignatureVerification(_, tx) => tx.send(Response::inactive(node_id, error)).is_ok(),
            LightningRequest::Information(_, tx) => tx.send(Response::inactive(node_id, error)).is_ok(),
        };
    }
}

#[derive(Debug)]
struct Envelope {
    request: LightningRequest,
    deadline: Instant,
    timeout: Duration,
}

/// Cloneable handle submitting requests to the [`LightningRequestRouter`].
#[derive(Debug, Clone)]
pub struct LightningRequests {
    sender: mpsc::Sender<Envelope>,
    cfg: Arc<RouterConfig>,
}

impl LightningRequests {
    async fn submit<T: Default>(
        &self,
        node_id: i64,
        build: impl FnOnce(oneshot::Sender<Response<T>>) -> LightningRequest,
    ) -> Response<T> {
        let (tx, rx) = oneshot::channel();
        let request = build(tx);
        let timeout = request.timeout(&self.cfg);
        let deadline = Instant::now() + timeout;

        match tokio::time::timeout_at(
            deadline,
            self.sender.send(Envelope {
                request,
                deadline,
                timeout,
            }),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Response::inactive(node_id, RequestError::RouterClosed),
            Err(_) => return Response::inactive(node_id, RequestError::NoPermit(timeout)),
        }

        rx.await
            .unwrap_or_else(|_| Response::inactive(node_id, RequestError::RouterClosed))
    }

    pub async fn update_routing_policy(&self, request: RoutingPolicyUpdateRequest) -> RoutingPolicyUpdateResponse {
        self.submit(request.node_id, |tx| LightningRequest::RoutingPolicyUpdate(request, tx))
            .await
    }

    pub async fn connect_peer(&self, request: ConnectPeerRequest) -> ConnectPeerResponse {
        self.submit(request.node_id, |tx| LightningRequest::ConnectPeer(request, tx))
            .await
    }

    pub async fn disconnect_peer(&self, request: DisconnectPeerRequest) -> DisconnectPeerResponse {
        self.submit(request.node_id, |tx| LightningRequest::DisconnectPeer(request, tx))
            .await
    }

    pub async fn new_address(&self, request: NewAddressRequest) -> NewAddressResponse {
        self.submit(request.node_id, |tx| LightningRequest::NewAddress(request, tx))
            .await
    }

    pub async fn new_invoice(&self, request: NewInvoiceRequest) -> NewInvoiceResponse {
        self.submit(request.node_id, |tx| LightningRequest::NewInvoice(request, tx))
            .await
    }

    pub async fn wallet_balance(&self, node_id: i64) -> WalletBalanceResponse {
        self.submit(node_id, |tx| LightningRequest::WalletBalance(node_id, tx)).await
    }

    pub async fn list_peers(&self, node_id: i64) -> ListPeersResponse {
        self.submit(node_id, |tx| LightningRequest::ListPeers(node_id, tx)).await
    }

    pub async fn sign_message(&self, request: SignMessageRequest) -> SignMessageResponse {
        self.submit(request.node_id, |tx| LightningRequest::SignMessage(request, tx))
            .await
    }

    pub async fn verify_signature(&self, request: SignatureVerificationRequest) -> SignatureVerificationResponse {
        self.submit(request.node_id, |tx| LightningRequest::SignatureVerification(request, tx))
            .await
    }

    pub async fn information(&self, node_id: i64) -> InformationResponse {
        self.submit(node_id, |tx| LightningRequest::Information(node_id, tx)).await
    }
}

/// Executes requests against the backing nodes.
///
/// Each request runs on its own task once it holds a permit of its node's semaphore, so
/// requests to one CLN node are strictly serialized while an LND node accepts a small number
/// of concurrent requests. A request that does not obtain a permit or does not complete
/// before its deadline is answered as Inactive.
pub struct LightningRequestRouter<Db> {
    receiver: mpsc::Receiver<Envelope>,
    handler: Arc<RequestHandler<Db>>,
}

impl<Db> LightningRequestRouter<Db>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    pub fn new(
        cfg: RouterConfig,
        cache: TorqCache,
        db: Db,
        backends: Arc<dyn BackendProvider>,
    ) -> (LightningRequests, Self) {
        let (sender, receiver) = mpsc::channel(cfg.channel_capacity.max(1));
        let cfg = Arc::new(cfg);
        let handle = LightningRequests {
            sender,
            cfg: cfg.clone(),
        };
        let router = Self {
            receiver,
            handler: Arc::new(RequestHandler {
                cfg,
                cache,
                db,
                backends,
                semaphores: DashMap::new(),
            }),
        };
        (handle, router)
    }

    /// Serves requests until cancelled or until every [`LightningRequests`] handle is dropped.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!("lightning request router started");
        loop {
            let envelope = tokio::select! {
                _ = cancel.cancelled() => break,
                envelope = self.receiver.recv() => match envelope {
                    Some(envelope) => envelope,
                    None => break,
                },
            };

            let handler = self.handler.clone();
            tokio::spawn(async move { handler.dispatch(envelope).await });
        }

        self.receiver.close();
        while let Ok(envelope) = self.receiver.try_recv() {
            envelope.request.refuse(RequestError::RouterClosed);
        }
        tracing::info!("lightning request router stopped");
    }
}

fn respond<T: Default>(node_id: i64, result: Result<T>) -> Response<T> {
    match result {
        Ok(data) => Response::active(node_id, data),
        Err(error) => {
            tracing::debug!(node_id, %error, "lightning request failed");
            Response::inactive(node_id, error)
        }
    }
}

fn peer_error_contains(result: &Result<()>, text: &str) -> bool {
    match result {
        Err(RequestError::Rpc(error)) => error.node_message().to_lowercase().contains(text),
        _ => false,
    }
}

/// Translates the idempotent peer errors of the node into flags.
fn respond_peer(node_id: i64, result: Result<()>) -> Response<PeerRequestFlags> {
    let flags = PeerRequestFlags {
        request_failed_currently_connected: peer_error_contains(&result, "already connected"),
        request_failed_currently_disconnected: peer_error_contains(&result, "not connected"),
    };
    match result {
        Ok(()) => Response::active(node_id, flags),
        Err(RequestError::Rpc(error)) => Response::inactive(node_id, error.node_message()).with_data(flags),
        Err(error) => Response::inactive(node_id, error),
    }
}

struct RequestHandler<Db> {
    cfg: Arc<RouterConfig>,
    cache: TorqCache,
    db: Db,
    backends: Arc<dyn BackendProvider>,
    semaphores: DashMap<i64, Arc<Semaphore>>,
}

impl<Db> RequestHandler<Db>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    fn semaphore(&self, node_id: i64) -> Arc<Semaphore> {
        self.semaphores
            .entry(node_id)
            .or_insert_with(|| {
                let permits = match self.cache.get_node_connection_details(node_id).implementation {
                    Implementation::Lnd => self.cfg.lnd_permits,
                    Implementation::Cln => self.cfg.cln_permits,
                };
                Arc::new(Semaphore::new(permits.max(1)))
            })
            .clone()
    }

    /// Runs the operation holding a permit of the node, both bounded by the deadline.
    async fn guarded<T>(
        &self,
        node_id: i64,
        deadline: Instant,
        timeout: Duration,
        operation: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let _permit = tokio::time::timeout_at(deadline, self.semaphore(node_id).acquire_owned())
            .await
            .map_err(|_| RequestError::NoPermit(timeout))?
            .map_err(|_| RequestError::RouterClosed)?;

        tokio::time::timeout_at(deadline, operation)
            .await
            .map_err(|_| RequestError::Timeout(timeout))?
    }

    async fn dispatch(&self, envelope: Envelope) {
        let Envelope {
            request,
            deadline,
            timeout,
        } = envelope;
        let node_id = request.node_id();

        // a caller that stopped waiting is not an error
        let _ = match request {
            LightningRequest::RoutingPolicyUpdate(r, tx) => {
                let response = self
                    .guarded(node_id, deadline, timeout, self.update_routing_policy(r))
                    .await
                    .unwrap_or_else(|error| Response::inactive(node_id, error));
                tx.send(response).is_ok()
            }
            LightningRequest::ConnectPeer(r, tx) => {
                let result = self.guarded(node_id, deadline, timeout, self.connect_peer(r)).await;
                tx.send(respond_peer(node_id, result)).is_ok()
            }
            LightningRequest::DisconnectPeer(r, tx) => {
                let result = self.guarded(node_id, deadline, timeout, self.disconnect_peer(r)).await;
                tx.send(respond_peer(node_id, result)).is_ok()
            }
            LightningRequest::NewAddress(r, tx) => {
                let result = self.guarded(node_id, deadline, timeout, self.new_address(r)).await;
                tx.send(respond(node_id, result)).is_ok()
            }
            LightningRequest::NewInvoice(r, tx) => {
                let result = self.guarded(node_id, deadline, timeout, self.new_invoice(r)).await;
                tx.send(respond(node_id, result)).is_ok()
            }
            LightningRequest::WalletBalance(_, tx) => {
                let result = self.guarded(node_id, deadline, timeout, self.wallet_balance(node_id)).await;
                tx.send(respond(node_id, result)).is_ok()
            }
            LightningRequest::ListPeers(_, tx) => {
                let result = self
                    .guarded(node_id, deadline, timeout, async {
                        self.backends.backend(node_id).await?.list_peers().await
                    })
                    .await;
                tx.send(respond(node_id, result)).is_ok()
            }
            LightningRequest::SignMessage(r, tx) => {
                let result = self
                    .guarded(node_id, deadline, timeout, async {
                        self.backends.backend(node_id).await?.sign_message(r.message).await
                    })
                    .await;
                tx.send(respond(node_id, result)).is_ok()
            }
            LightningRequest::SignatureVerification(r, tx) => {
                let result = self
                    .guarded(node_id, deadline, timeout, async {
                        self.backends
                            .backend(node_id)
                            .await?
                            .verify_message(r.message, r.signature)
                            .await
                    })
                    .await;
                tx.send(respond(node_id, result)).is_ok()
            }
            LightningRequest::Information(_, tx) => {
                let result = self
                    .guarded(node_id, deadline, timeout, async {
                        self.backends.backend(node_id).await?.information().await
                    })
                    .await;
                tx.send(respond(node_id, result)).is_ok()
            }
        };
    }

    /// Returns the current local policy of the channel, from the cache or else from the history.
    async fn current_policy(&self, node_id: i64, channel_id: i64, remote_node_id: i64) -> Result<RoutingPolicy> {
        if let Some(state) = self.cache.get_channel_state(node_id, channel_id) {
            return Ok(state.local_policy);
        }
        self.db
            .get_latest_routing_policy(None, channel_id, node_id, remote_node_id)
            .await?
            .map(|e| e.policy)
            .ok_or(RequestError::UnknownChannel(channel_id))
    }

    async fn update_routing_policy(&self, request: RoutingPolicyUpdateRequest) -> Result<RoutingPolicyUpdateResponse> {
        let node_id = request.node_id;
        if !request.has_changes() {
            return Ok(Response::active(node_id, vec![]).with_message("Nothing changed"));
        }
        policy::validate(&request)?;

        let channel = self.cache.get_channel_setting_by_channel_id(request.channel_id);
        if channel.channel_id == 0 {
            return Err(RequestError::UnknownChannel(request.channel_id));
        }
        let remote_node_id = channel.other_node_id(node_id).ok_or_else(|| {
            RequestError::Validation(format!("channel {} does not belong to node {node_id}", channel.channel_id))
        })?;

        let current = self.current_policy(node_id, channel.channel_id, remote_node_id).await?;
        let changed = policy::changed_fields(&current, &request);
        if changed.is_empty() {
            return Ok(Response::active(node_id, vec![]).with_message("Nothing changed"));
        }

        let window = request.rate_limit_seconds.unwrap_or(self.cfg.rate_limit_seconds);
        let limit = request.rate_limit_count.unwrap_or(self.cfg.rate_limit_count);
        let since = chrono::Utc::now() - chrono::Duration::seconds(window.into());
        let history = self
            .db
            .get_routing_policies_since(None, channel.channel_id, node_id, since)
            .await?;
        policy::check_rate_limit(&history, &changed, limit, window)?;

        let submission = policy::submission(&channel, &current, &request);
        let applied = submission.policy;
        let failed = self
            .backends
            .backend(node_id)
            .await?
            .update_routing_policy(submission)
            .await?;

        if !failed.is_empty() {
            tracing::warn!(node_id, channel_id = channel.channel_id, failures = failed.len(), "routing policy update partially failed");
            return Ok(Response::inactive(node_id, "routing policy update failed").with_data(failed));
        }

        self.cache
            .set_channel_state_routing_policy(node_id, channel.channel_id, true, applied);
        self.db
            .insert_routing_policy_if_changed(
                None,
                RoutingPolicyEvent {
                    timestamp: Some(chrono::Utc::now()),
                    channel_id: channel.channel_id,
                    announcing_node_id: node_id,
                    connecting_node_id: remote_node_id,
                    node_id,
                    policy: applied,
                },
            )
            .await?;

        tracing::info!(node_id, channel_id = channel.channel_id, ?changed, "routing policy updated");
        Ok(Response::active(node_id, vec![]))
    }

    async fn connect_peer(&self, request: ConnectPeerRequest) -> Result<()> {
        if request.public_key.is_empty() || request.host.is_empty() {
            return Err(RequestError::Validation("public key and host are required".into()));
        }
        let timeout = Duration::from_secs(request.timeout_seconds.unwrap_or(10));
        self.backends
            .backend(request.node_id)
            .await?
            .connect_peer(request.public_key, request.host, timeout)
            .await
    }

    async fn disconnect_peer(&self, request: DisconnectPeerRequest) -> Result<()> {
        if request.public_key.is_empty() {
            return Err(RequestError::Validation("public key is required".into()));
        }
        self.backends
            .backend(request.node_id)
            .await?
            .disconnect_peer(request.public_key)
            .await
    }

    async fn new_address(&self, request: NewAddressRequest) -> Result<String> {
        self.backends
            .backend(request.node_id)
            .await?
            .new_address(request.address_type, request.account)
            .await
    }

    async fn new_invoice(&self, request: NewInvoiceRequest) -> Result<CreatedInvoice> {
        self.backends
            .backend(request.node_id)
            .await?
            .new_invoice(InvoiceParameters {
                memo: request.memo.unwrap_or_default(),
                value_msat: request.value_msat,
                expiry_seconds: request.expiry_seconds,
            })
            .await
    }

    async fn wallet_balance(&self, node_id: i64) -> Result<WalletBalance> {
        let balance = self.backends.backend(node_id).await?.wallet_balance().await?;
        self.cache.set_wallet_balance(node_id, balance);
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use torq_db::{
        channels::TorqDbChannelOperations, db::TorqDb, nodes::TorqDbNodeOperations,
        policies::TorqDbRoutingPolicyOperations,
    };
    use torq_lightning_rpc::test_utils::{LndScript, ScriptedLnd};
    use torq_types::prelude::{
        Chain, Channel, ChannelState, ChannelStatus, Network, NodeConnectionDetails, NodeStatus,
    };

    use super::*;
    use crate::{
        backend::{LightningBackend, MockBackendProvider, MockLightningBackend},
        lnd::LndBackend,
    };

    /// A managed node with one open channel towards a remote node.
    struct Fixture {
        local: i64,
        remote: i64,
        channel_id: i64,
    }

    fn current_policy() -> RoutingPolicy {
        RoutingPolicy {
            disabled: false,
            time_lock_delta: 40,
            min_htlc_msat: 1000,
            max_htlc_msat: 990_000_000,
            fee_base_msat: 1000,
            fee_rate_milli_msat: 300,
        }
    }

    async fn setup(db: &TorqDb, cache: &TorqCache, implementation: Implementation) -> anyhow::Result<Fixture> {
        let local = db
            .get_or_create_node(None, &"02".repeat(33), Chain::Bitcoin, Network::RegTest)
            .await?;
        let remote = db
            .get_or_create_node(None, &"03".repeat(33), Chain::Bitcoin, Network::RegTest)
            .await?;
        cache.set_node(&local);
        cache.set_node(&remote);

        cache.set_node_connection_details(NodeConnectionDetails {
            node_id: local.node_id,
            name: "local".into(),
            implementation,
            status: NodeStatus::Active,
            ..Default::default()
        });
        let channel = db
            .insert_channel(
                None,
                Channel {
                    short_channel_id: Some("700000x1x0".into()),
                    funding_transaction_hash: "ab".repeat(32),
                    funding_output_index: 0,
                    capacity: 1_000_000,
                    first_node_id: local.node_id,
                    second_node_id: remote.node_id,
                    status: ChannelStatus::Open,
                    ..Default::default()
                },
            )
            .await?;
        let channel_id = channel.channel_id;
        cache.set_channel(channel);
        cache.set_channel_state(ChannelState {
            node_id: local.node_id,
            remote_node_id: remote.node_id,
            channel_id,
            capacity: 1_000_000,
            local_policy: current_policy(),
            ..Default::default()
        });
        Ok(Fixture {
            local: local.node_id,
            remote: remote.node_id,
            channel_id,
        })
    }

    fn provider(backend: impl LightningBackend + 'static) -> Arc<dyn BackendProvider> {
        let backend: Arc<dyn LightningBackend> = Arc::new(backend);
        let mut provider = MockBackendProvider::new();
        provider.expect_backend().returning(move |_| Ok(backend.clone()));
        Arc::new(provider)
    }

    fn start(
        cache: &TorqCache,
        db: &TorqDb,
        backend: impl LightningBackend + 'static,
        cfg: RouterConfig,
    ) -> (LightningRequests, CancellationToken) {
        let (requests, router) = LightningRequestRouter::new(cfg, cache.clone(), db.clone(), provider(backend));
        let cancel = CancellationToken::new();
        tokio::spawn(router.run(cancel.clone()));
        (requests, cancel)
    }

    async fn record_fee_rates(db: &TorqDb, fixture: &Fixture, rates: &[i64]) -> anyhow::Result<()> {
        let now = chrono::Utc::now();
        for (i, rate) in rates.iter().enumerate() {
            db.insert_routing_policy_if_changed(
                None,
                RoutingPolicyEvent {
                    timestamp: Some(now - chrono::Duration::seconds(60 - i as i64)),
                    channel_id: fixture.channel_id,
                    announcing_node_id: fixture.local,
                    connecting_node_id: fixture.remote,
                    node_id: fixture.local,
                    policy: RoutingPolicy {
                        fee_rate_milli_msat: *rate,
                        ..current_policy()
                    },
                },
            )
            .await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_unchanged_policy_issues_no_rpc() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let cache = TorqCache::new();
        let Fixture { local, channel_id, .. } = setup(&db, &cache, Implementation::Lnd).await?;

        let mut backend = MockLightningBackend::new();
        backend.expect_update_routing_policy().never();
        let (requests, _cancel) = start(&cache, &db, backend, RouterConfig::default());

        let response = requests
            .update_routing_policy(RoutingPolicyUpdateRequest {
                node_id: local,
                channel_id,
                fee_rate_milli_msat: Some(300),
                fee_base_msat: Some(1000),
                time_lock_delta: Some(40),
                ..Default::default()
            })
            .await;

        assert_eq!(response.status, ResponseStatus::Active);
        assert_eq!(response.message.as_deref(), Some("Nothing changed"));
        Ok(())
    }

    #[tokio::test]
    async fn test_rate_limited_fee_update() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let cache = TorqCache::new();
        let fixture = setup(&db, &cache, Implementation::Lnd).await?;
        record_fee_rates(&db, &fixture, &[100, 200, 300]).await?;
        let (local, channel_id) = (fixture.local, fixture.channel_id);

        let mut backend = MockLightningBackend::new();
        backend
            .expect_update_routing_policy()
            .withf(|s| s.policy.fee_base_msat == 2000 && s.policy.fee_rate_milli_msat == 300)
            .times(1)
            .returning(|_| Ok(vec![]));
        let (requests, _cancel) = start(&cache, &db, backend, RouterConfig::default());

        let refused = requests
            .update_routing_policy(RoutingPolicyUpdateRequest {
                node_id: local,
                channel_id,
                fee_rate_milli_msat: Some(400),
                ..Default::default()
            })
            .await;
        assert_eq!(refused.status, ResponseStatus::Inactive);
        assert!(refused.error.unwrap_or_default().contains("rate limiter"));

        let accepted = requests
            .update_routing_policy(RoutingPolicyUpdateRequest {
                node_id: local,
                channel_id,
                fee_base_msat: Some(2000),
                ..Default::default()
            })
            .await;
        assert_eq!(accepted.status, ResponseStatus::Active, "{accepted:?}");
        assert_eq!(
            cache
                .get_channel_state(local, channel_id)
                .map(|s| s.local_policy.fee_base_msat),
            Some(2000)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_time_lock_delta_is_refused() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let cache = TorqCache::new();
        let Fixture { local, channel_id, .. } = setup(&db, &cache, Implementation::Lnd).await?;

        let mut backend = MockLightningBackend::new();
        backend.expect_update_routing_policy().never();
        let (requests, _cancel) = start(&cache, &db, backend, RouterConfig::default());

        let response = requests
            .update_routing_policy(RoutingPolicyUpdateRequest {
                node_id: local,
                channel_id,
                time_lock_delta: Some(10),
                ..Default::default()
            })
            .await;
        assert_eq!(response.status, ResponseStatus::Inactive);
        assert!(response.error.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_updates_make_the_response_inactive() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let cache = TorqCache::new();
        let Fixture { local, channel_id, .. } = setup(&db, &cache, Implementation::Lnd).await?;

        let mut backend = MockLightningBackend::new();
        backend.expect_update_routing_policy().returning(|s| {
            Ok(vec![FailedRoutingPolicyUpdate {
                channel_id: s.channel_id,
                reason: "Pending".into(),
                error: "channel is pending".into(),
            }])
        });
        let (requests, _cancel) = start(&cache, &db, backend, RouterConfig::default());

        let response = requests
            .update_routing_policy(RoutingPolicyUpdateRequest {
                node_id: local,
                channel_id,
                fee_rate_milli_msat: Some(10),
                ..Default::default()
            })
            .await;
        assert_eq!(response.status, ResponseStatus::Inactive);
        assert_eq!(response.data.len(), 1);
        assert_eq!(
            cache
                .get_channel_state(local, channel_id)
                .map(|s| s.local_policy.fee_rate_milli_msat),
            Some(300)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_connect_to_connected_peer_sets_flag() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let cache = TorqCache::new();
        let Fixture { local, .. } = setup(&db, &cache, Implementation::Lnd).await?;

        let lnd = ScriptedLnd::new(LndScript::default());
        lnd.fail("connect_peer", tonic::Code::Unknown, "already connected to peer");
        let (requests, _cancel) = start(&cache, &db, LndBackend::new(lnd.clone()), RouterConfig::default());

        let response = requests
            .connect_peer(ConnectPeerRequest {
                node_id: local,
                public_key: "03".repeat(33),
                host: "10.0.0.2:9735".into(),
                timeout_seconds: None,
            })
            .await;

        assert_eq!(response.status, ResponseStatus::Inactive);
        assert!(response.data.request_failed_currently_connected);
        assert!(!response.data.request_failed_currently_disconnected);
        assert_eq!(lnd.calls("connect_peer"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_slow_node_yields_inactive_response() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let cache = TorqCache::new();
        let Fixture { local, .. } = setup(&db, &cache, Implementation::Lnd).await?;
        tokio::time::pause();

        let lnd = ScriptedLnd::new(LndScript::default());
        lnd.delay("get_info", Duration::from_secs(10));
        let (requests, _cancel) = start(&cache, &db, LndBackend::new(lnd.clone()), RouterConfig::default());

        let response = requests.information(local).await;
        assert_eq!(response.status, ResponseStatus::Inactive);
        assert!(response.error.unwrap_or_default().contains("did not complete"));

        lnd.delay("get_info", Duration::ZERO);
        assert!(requests.information(local).await.is_active());
        Ok(())
    }

    #[tokio::test]
    async fn test_cln_requests_are_serialized() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let cache = TorqCache::new();
        let Fixture { local, .. } = setup(&db, &cache, Implementation::Cln).await?;
        tokio::time::pause();

        let mut backend = MockLightningBackend::new();
        backend.expect_wallet_balance().returning(|| Ok(WalletBalance::default()));
        let cfg = RouterConfig {
            read_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let (requests, router) = LightningRequestRouter::new(cfg, cache.clone(), db.clone(), provider(backend));

        // hold the only permit of the CLN node
        let permit = router.handler.semaphore(local).acquire_owned().await?;
        assert_eq!(router.handler.semaphore(local).available_permits(), 0);

        let cancel = CancellationToken::new();
        tokio::spawn(router.run(cancel.clone()));

        let response = requests.wallet_balance(local).await;
        assert_eq!(response.status, ResponseStatus::Inactive);
        assert!(response.error.unwrap_or_default().contains("busy"));

        drop(permit);
        assert!(requests.wallet_balance(local).await.is_active());
        Ok(())
    }
}
