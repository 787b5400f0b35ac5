//! Starts, stops and restarts the services of the managed nodes.
//!
//! Every (node, service) pair runs in its own task, registered with its cancellation token.
//! The task owns the lifecycle of its service: it waits for the dependency, runs the service,
//! re-runs it after a backoff when it fails and removes itself from the registry once cancelled.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use torq_cache::TorqCache;
use torq_db::TorqDbAllOperations;
use torq_types::prelude::{PingSystem, ServiceType};
use tracing::Instrument;

use crate::{
    cln,
    config::ServicesConfig,
    context::ServiceContext,
    errors::{Result, ServiceError},
    events::EventBus,
    lifecycle::{ServiceHandle, tick},
    lnd, ping,
};

/// Runs one service of one node until it is cancelled or fails.
#[async_trait]
pub trait ServiceLauncher: Send + Sync {
    async fn run(&self, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>;
}

/// Launches the ingestion pipelines and ping services of this crate.
#[derive(Debug, Clone)]
pub struct TorqServiceLauncher<Db> {
    ctx: ServiceContext<Db>,
}

impl<Db> TorqServiceLauncher<Db> {
    pub fn new(ctx: ServiceContext<Db>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl<Db> ServiceLauncher for TorqServiceLauncher<Db>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    #[tracing::instrument(level = "debug", skip_all, err)]
    async fn run(&self, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()> {
        let ctx = &self.ctx;
        match handle.service_type() {
            ServiceType::LndChannelEvents => lnd::channel_events::run(ctx, handle, cancel).await,
            ServiceType::LndGraphEvents => lnd::graph::run(ctx, handle, cancel).await,
            ServiceType::LndTransactions => lnd::transactions::run(ctx, handle, cancel).await,
            ServiceType::LndHtlcEvents => lnd::htlcs::run(ctx, handle, cancel).await,
            ServiceType::LndInvoices => lnd::invoices::run(ctx, handle, cancel).await,
            ServiceType::LndForwards => lnd::forwards::run(ctx, handle, cancel).await,
            ServiceType::LndPayments => lnd::payments::run(ctx, handle, cancel).await,
            ServiceType::LndInFlightPayments => lnd::in_flight::run(ctx, handle, cancel).await,
            ServiceType::LndPeerEvents => lnd::peers::run(ctx, handle, cancel).await,
            ServiceType::LndChannelBalanceCache => lnd::balance_cache::run(ctx, handle, cancel).await,
            ServiceType::ClnPeers => cln::peers::run(ctx, handle, cancel).await,
            ServiceType::ClnChannels => cln::channels::run(ctx, handle, cancel).await,
            ServiceType::ClnFunds => cln::funds::run(ctx, handle, cancel).await,
            ServiceType::ClnNodes => cln::nodes::run(ctx, handle, cancel).await,
            ServiceType::ClnTransactions => cln::transactions::run(ctx, handle, cancel).await,
            ServiceType::VectorPing | ServiceType::AmbossPing => ping::run(ctx, handle, cancel).await,
        }
    }
}

/// What the supervisor loop is asked to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartSignal {
    AllNodes,
    Node(i64),
}

struct Registration {
    generation: u64,
    cancel: CancellationToken,
    /// Cancelled once the task of this registration has finished.
    finished: CancellationToken,
}

struct Inner {
    launcher: Arc<dyn ServiceLauncher>,
    cache: TorqCache,
    bus: EventBus,
    cfg: Arc<ServicesConfig>,
    registry: DashMap<(i64, ServiceType), Registration>,
    generation: AtomicU64,
    restarting: tokio::sync::Mutex<()>,
}

/// Control handle of the supervisor; cheap to clone.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
    signals: mpsc::UnboundedSender<StartSignal>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("running", &self.inner.registry.len())
            .finish_non_exhaustive()
    }
}

/// Receives the start signals and spawns the service tasks.
pub struct SupervisorLoop {
    inner: Arc<Inner>,
    signals: mpsc::UnboundedReceiver<StartSignal>,
}

impl Supervisor {
    pub fn new(
        launcher: Arc<dyn ServiceLauncher>,
        cache: TorqCache,
        bus: EventBus,
        cfg: Arc<ServicesConfig>,
    ) -> (Self, SupervisorLoop) {
        let inner = Arc::new(Inner {
            launcher,
            cache,
            bus,
            cfg,
            registry: DashMap::new(),
            generation: AtomicU64::new(0),
            restarting: tokio::sync::Mutex::new(()),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: inner.clone(),
                signals: tx,
            },
            SupervisorLoop { inner, signals: rx },
        )
    }

    /// The supervisor for the pipelines of this crate.
    pub fn for_context<Db>(ctx: &ServiceContext<Db>) -> (Self, SupervisorLoop)
    where
        Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
    {
        Self::new(
            Arc::new(TorqServiceLauncher::new(ctx.clone())),
            ctx.cache.clone(),
            ctx.bus.clone(),
            ctx.cfg.clone(),
        )
    }

    /// Starts the services of every active managed node.
    pub fn start(&self) -> Result<()> {
        self.signal(StartSignal::AllNodes)
    }

    /// Starts the services of one managed node.
    ///
    /// Services of the node that are still stopping are started once their previous task has finished.
    pub fn start_node(&self, node_id: i64) -> Result<()> {
        self.signal(StartSignal::Node(node_id))
    }

    fn signal(&self, signal: StartSignal) -> Result<()> {
        self.signals.send(signal).map_err(|_| ServiceError::SupervisorClosed)
    }

    /// Cancels every running service.
    pub fn stop(&self) {
        for registration in self.inner.registry.iter() {
            registration.cancel.cancel();
        }
    }

    /// Cancels the services of one node.
    pub fn stop_node(&self, node_id: i64) {
        for registration in self.inner.registry.iter().filter(|r| r.key().0 == node_id) {
            registration.cancel.cancel();
        }
    }

    /// Cancels the services of one node and starts them again from the current connection details.
    pub fn restart_node(&self, node_id: i64) -> Result<()> {
        tracing::info!(node_id, "restarting node services");
        self.stop_node(node_id);
        self.start_node(node_id)
    }

    /// Stops every service, waits until all of them are gone and starts them again.
    pub async fn restart(&self) -> Result<()> {
        let Ok(_guard) = self.inner.restarting.try_lock() else {
            return Err(ServiceError::AlreadyRestarting);
        };

        tracing::info!(running = self.inner.registry.len(), "restarting services");
        self.stop();
        while !self.inner.registry.is_empty() {
            tokio::time::sleep(self.inner.cfg.stop_poll_interval).await;
        }
        self.start()
    }

    /// The registered (node, service) pairs, sorted.
    pub fn running_services(&self) -> Vec<(i64, ServiceType)> {
        let mut running: Vec<_> = self.inner.registry.iter().map(|r| *r.key()).collect();
        running.sort_unstable();
        running
    }
}

impl SupervisorLoop {
    /// Handles start signals until `cancel` fires, which also stops every service.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let signal = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                signal = self.signals.recv() => signal,
            };
            match signal {
                Some(StartSignal::AllNodes) => {
                    for node_id in self.inner.cache.get_active_torq_node_ids() {
                        self.start_node(node_id, &cancel);
                    }
                }
                Some(StartSignal::Node(node_id)) => self.start_node(node_id, &cancel),
                None => break,
            }
        }

        for registration in self.inner.registry.iter() {
            registration.cancel.cancel();
        }
        tracing::debug!("supervisor loop stopped");
    }

    fn start_node(&self, node_id: i64, cancel: &CancellationToken) {
        let details = self.inner.cache.get_node_connection_details(node_id);
        if details.node_id == 0 {
            tracing::warn!(node_id, "cannot start services of a node without connection details");
            return;
        }

        let mut services = ServiceType::for_implementation(details.implementation).to_vec();
        if details.ping_system.contains(PingSystem::VECTOR) {
            services.push(ServiceType::VectorPing);
        }
        if details.ping_system.contains(PingSystem::AMBOSS) {
            services.push(ServiceType::AmbossPing);
        }

        for service_type in services {
            self.start_service(node_id, service_type, cancel);
        }
    }

    fn start_service(&self, node_id: i64, service_type: ServiceType, cancel: &CancellationToken) {
        let key = (node_id, service_type);
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let service_cancel = cancel.child_token();
        let finished = CancellationToken::new();
        let registration = Registration {
            generation,
            cancel: service_cancel.clone(),
            finished: finished.clone(),
        };

        let previous = match self.inner.registry.entry(key) {
            Entry::Occupied(entry) if !entry.get().cancel.is_cancelled() => {
                tracing::debug!(node_id, service = %service_type, "service already running");
                return;
            }
            Entry::Occupied(mut entry) => Some(entry.insert(registration).finished),
            Entry::Vacant(entry) => {
                entry.insert(registration);
                None
            }
        };

        let inner = self.inner.clone();
        let span = tracing::info_span!("service", node_id, service = %service_type);
        tokio::spawn(
            async move {
                if let Some(previous) = previous {
                    tracing::debug!("waiting for the stopping service");
                    previous.cancelled().await;
                }
                let handle = ServiceHandle::new(inner.cache.clone(), inner.bus.clone(), node_id, service_type);
                if !service_cancel.is_cancelled() {
                    supervise(&inner, &handle, &service_cancel).await;
                }
                handle.inactive();
                inner.registry.remove_if(&key, |_, r| r.generation == generation);
                finished.cancel();
            }
            .instrument(span),
        );
    }
}

async fn supervise(inner: &Inner, handle: &ServiceHandle, cancel: &CancellationToken) {
    if let Some(dependency) = handle.service_type().dependency() {
        handle.pending();
        while !inner.cache.is_node_service_active(handle.node_id(), dependency) {
            if !tick(cancel, inner.cfg.dependency_poll_interval).await {
                return;
            }
        }
    }

    let mut failures = 0;
    loop {
        handle.initializing();
        match inner.launcher.run(handle, cancel).await {
            Ok(()) => return,
            Err(_) if cancel.is_cancelled() => return,
            Err(error) => {
                handle.failed(&error);
                failures += 1;
                let delay: Duration = inner.cfg.backoff(failures);
                tracing::debug!(failures, ?delay, "service will be run again");
                if !tick(cancel, delay).await {
                    return;
                }
            }
        }
    }
}
