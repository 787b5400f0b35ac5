//! Shared fixtures of the pipeline tests: an in-memory database, scripted nodes behind
//! static connectors and a running request router.

use std::{sync::Arc, time::Duration};

use async_broadcast::{Receiver, RecvError};
use tokio_util::sync::CancellationToken;
use torq_cache::TorqCache;
use torq_db::{db::TorqDb, nodes::TorqDbNodeOperations};
use torq_lightning_requests::{LightningRequestRouter, RouterConfig, backend::PoolBackendProvider};
use torq_lightning_rpc::{
    ClnConnection, LndConnection,
    pool::{ClientPool, ClnClientPool, LndClientPool},
    test_utils::{ClnScript, LndScript, ScriptedCln, ScriptedLnd, StaticConnector},
};
use torq_types::prelude::{
    Chain, Implementation, Network, NodeConnectionDetails, NodeSettings, NodeStatus, PingSystem, ServiceStatus,
    ServiceType,
};

use crate::{config::ServicesConfig, context::ServiceContext, events::TorqEvent, lifecycle::ServiceHandle};

/// A 33 byte public key starting with `prefix`.
pub(crate) fn public_key(prefix: &str) -> String {
    format!("{prefix}{}", "0".repeat(66 - prefix.len()))
}

/// Registers an unmanaged node.
pub(crate) async fn remote_node(ctx: &ServiceContext<TorqDb>, prefix: &str) -> anyhow::Result<i64> {
    Ok(ctx.node_id_for(&public_key(prefix), Chain::Bitcoin, Network::RegTest).await?)
}

/// Waits for the first published event matching `pred`.
pub(crate) async fn next_event(
    events: &mut Receiver<TorqEvent>,
    pred: impl Fn(&TorqEvent) -> bool,
) -> anyhow::Result<TorqEvent> {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return Ok(event),
                Ok(_) | Err(RecvError::Overflowed(_)) => continue,
                Err(RecvError::Closed) => return Err(anyhow::anyhow!("event bus closed")),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .map_err(|_| anyhow::anyhow!("no matching event within 5s"))?
}

/// Waits until the service reports the given status.
pub(crate) async fn status_reached(
    events: &mut Receiver<TorqEvent>,
    service: ServiceType,
    expected: ServiceStatus,
) -> anyhow::Result<()> {
    next_event(events, |event| {
        matches!(event, TorqEvent::ServiceStatusChanged { service_type, status, .. }
            if *service_type == service && *status == expected)
    })
    .await?;
    Ok(())
}

pub(crate) struct TestEnv {
    pub ctx: ServiceContext<TorqDb>,
    /// The managed node.
    pub node_id: i64,
    pub lnd: Arc<ScriptedLnd>,
    pub cln: Arc<ScriptedCln>,
    pub cancel: CancellationToken,
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl TestEnv {
    /// Everything a pipeline of the managed node is run with.
    pub fn service(&self, service_type: ServiceType) -> (ServiceContext<TorqDb>, ServiceHandle, CancellationToken) {
        let handle = ServiceHandle::new(self.ctx.cache.clone(), self.ctx.bus.clone(), self.node_id, service_type);
        (self.ctx.clone(), handle, self.cancel.child_token())
    }

    pub async fn lnd() -> anyhow::Result<Self> {
        Self::new(Implementation::Lnd, LndScript::default(), ClnScript::default(), ServicesConfig::default()).await
    }

    pub async fn cln() -> anyhow::Result<Self> {
        Self::new(Implementation::Cln, LndScript::default(), ClnScript::default(), ServicesConfig::default()).await
    }

    pub async fn new(
        implementation: Implementation,
        lnd_script: LndScript,
        cln_script: ClnScript,
        cfg: ServicesConfig,
    ) -> anyhow::Result<Self> {
        let db = TorqDb::new_in_memory().await?;
        let cache = TorqCache::new();

        let lnd = ScriptedLnd::new(lnd_script);
        let cln = ScriptedCln::new(cln_script);
        let lnd_connection: LndConnection = lnd.clone();
        let cln_connection: ClnConnection = cln.clone();
        let lnd_pool: Arc<LndClientPool> = Arc::new(ClientPool::new(cache.clone(), StaticConnector::new(lnd_connection)));
        let cln_pool: Arc<ClnClientPool> = Arc::new(ClientPool::new(cache.clone(), StaticConnector::new(cln_connection)));

        let node = db
            .get_or_create_node(None, &public_key("02"), Chain::Bitcoin, Network::RegTest)
            .await?;
        let details = NodeConnectionDetails {
            node_id: node.node_id,
            name: "alice".into(),
            implementation,
            grpc_address: Some("127.0.0.1:10009".into()),
            tls_data: Some(b"tls".to_vec()),
            macaroon_data: Some(b"macaroon".to_vec()),
            certificate_data: Some(b"certificate".to_vec()),
            key_data: Some(b"key".to_vec()),
            status: NodeStatus::Active,
            ping_system: PingSystem::default(),
            ..Default::default()
        };
        db.insert_node_connection_details(None, details.clone()).await?;
        cache.set_node_connection_details(details);
        cache.set_node_settings(NodeSettings {
            node_id: node.node_id,
            public_key: node.public_key.clone(),
            chain: node.chain,
            network: node.network,
            implementation,
            name: Some("alice".into()),
            status: NodeStatus::Active,
            ping_system: PingSystem::default(),
            torq_node: true,
        });

        let provider = Arc::new(PoolBackendProvider::new(cache.clone(), lnd_pool.clone(), cln_pool.clone()));
        let (requests, router) = LightningRequestRouter::new(RouterConfig::default(), cache.clone(), db.clone(), provider);
        let cancel = CancellationToken::new();
        tokio::spawn(router.run(cancel.clone()));

        let ctx = ServiceContext::new(cfg, db, cache, lnd_pool, cln_pool, requests)?.with_explorer(None);
        Ok(Self {
            ctx,
            node_id: node.node_id,
            lnd,
            cln,
            cancel,
        })
    }
}
