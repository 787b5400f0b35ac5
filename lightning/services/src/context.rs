use std::sync::Arc;

use dashmap::DashMap;
use torq_cache::TorqCache;
use torq_db::TorqDbAllOperations;
use torq_lightning_requests::LightningRequests;
use torq_lightning_rpc::{
    ClnConnection, LndConnection,
    pool::{ClnClientPool, LndClientPool},
};
use torq_types::prelude::{Chain, Network, Node};

use crate::{
    config::ServicesConfig,
    errors::Result,
    events::EventBus,
    vector::{AmbossClient, BlockExplorer, Pinger, VectorClient},
};

/// Everything a pipeline needs to talk to its node and to record what it observes.
#[derive(Clone)]
pub struct ServiceContext<Db> {
    pub db: Db,
    pub cache: TorqCache,
    pub lnd: Arc<LndClientPool>,
    pub cln: Arc<ClnClientPool>,
    pub requests: LightningRequests,
    pub bus: EventBus,
    pub cfg: Arc<ServicesConfig>,
    pub explorer: Option<Arc<dyn BlockExplorer>>,
    /// Block height at which the explorer last reported a transaction as not mined, by hash.
    pub explorer_misses: Arc<DashMap<String, u32>>,
    pub vector: Arc<dyn Pinger>,
    pub amboss: Arc<dyn Pinger>,
}

impl<Db> std::fmt::Debug for ServiceContext<Db> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("cache", &self.cache)
            .field("bus", &self.bus)
            .field("cfg", &self.cfg)
            .field("explorer", &self.explorer.is_some())
            .finish_non_exhaustive()
    }
}

impl<Db> ServiceContext<Db>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    /// Creates the context with the Vector and Amboss HTTP clients.
    pub fn new(
        cfg: ServicesConfig,
        db: Db,
        cache: TorqCache,
        lnd: Arc<LndClientPool>,
        cln: Arc<ClnClientPool>,
        requests: LightningRequests,
    ) -> Result<Self> {
        let vector = Arc::new(VectorClient::new(cache.clone(), cfg.http_timeout)?);
        let amboss = Arc::new(AmbossClient::new(&cfg.amboss_url, cfg.http_timeout)?);
        let explorer: Option<Arc<dyn BlockExplorer>> = if cfg.block_explorer_enabled {
            Some(vector.clone())
        } else {
            None
        };

        Ok(Self {
            bus: EventBus::new(cfg.event_bus_capacity),
            db,
            cache,
            lnd,
            cln,
            requests,
            cfg: Arc::new(cfg),
            explorer,
            explorer_misses: Arc::new(DashMap::new()),
            vector,
            amboss,
        })
    }

    pub fn with_explorer(mut self, explorer: Option<Arc<dyn BlockExplorer>>) -> Self {
        self.explorer = explorer;
        self
    }

    pub fn with_pingers(mut self, vector: Arc<dyn Pinger>, amboss: Arc<dyn Pinger>) -> Self {
        self.vector = vector;
        self.amboss = amboss;
        self
    }

    pub async fn lnd(&self, node_id: i64) -> Result<LndConnection> {
        Ok(self.lnd.get_connection(node_id).await?)
    }

    pub async fn cln(&self, node_id: i64) -> Result<ClnConnection> {
        Ok(self.cln.get_connection(node_id).await?)
    }

    /// Chain and network of a managed node.
    pub fn network_of(&self, node_id: i64) -> (Chain, Network) {
        let settings = self.cache.get_node_settings_by_node_id(node_id);
        (settings.chain, settings.network)
    }

    /// Resolves the id of a node by its public key, registering nodes seen for the first time.
    pub async fn node_id_for(&self, public_key: &str, chain: Chain, network: Network) -> Result<i64> {
        let node_id = self.cache.get_node_id_by_public_key(public_key, chain, network);
        if node_id != 0 {
            return Ok(node_id);
        }

        let node: Node = self.db.get_or_create_node(None, public_key, chain, network).await?;
        self.cache.set_node(&node);
        tracing::debug!(node_id = node.node_id, public_key, "new node registered");
        Ok(node.node_id)
    }
}
