use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use torq_cache::TorqCache;
use torq_corridors::{CorridorEngine, TagManager, groups::regenerate_channel_groups};
use torq_db::db::{TorqDb, TorqDbConfig};
use torq_lightning_requests::{LightningRequestRouter, backend::PoolBackendProvider};
use torq_lightning_rpc::{
    client::{ClnConnector, LndConnector},
    pool::{ClnClientPool, LndClientPool},
};
use torq_lightning_services::{ServiceContext, Supervisor, bootstrap_cache};
use torq_types::prelude::NodeConnectionDetails;
use tracing::info;

use crate::{config::Config, errors::Result};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// The running components of the daemon.
pub struct Torqd {
    db: TorqDb,
    cache: TorqCache,
    engine: CorridorEngine,
    tags: TagManager<TorqDb>,
    lnd: Arc<LndClientPool>,
    cln: Arc<ClnClientPool>,
    supervisor: Supervisor,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Torqd {
    /// Opens the database, fills the cache and starts the request router and the services
    /// of every active managed node.
    pub async fn start(cfg: &Config) -> Result<Self> {
        info!(database = %cfg.database.redacted(), "initializing database");
        let db_config = TorqDbConfig {
            max_connections: cfg.database.max_connections(),
            log_slow_queries: cfg.log_slow_queries,
        };
        let db = TorqDb::new(&cfg.database.to_url(), db_config).await?;

        let cache = TorqCache::new();
        let engine = CorridorEngine::new();
        let tags = TagManager::new(db.clone(), cache.clone(), engine.clone());
        load_state(&db, &cache, &engine, &tags, cfg).await?;

        let lnd: Arc<LndClientPool> = Arc::new(LndClientPool::new(
            cache.clone(),
            Arc::new(LndConnector::new(cfg.grpc.clone())),
        ));
        let cln: Arc<ClnClientPool> = Arc::new(ClnClientPool::new(
            cache.clone(),
            Arc::new(ClnConnector::new(cfg.grpc.clone())),
        ));

        let backends = Arc::new(PoolBackendProvider::new(cache.clone(), lnd.clone(), cln.clone()));
        let (requests, router) = LightningRequestRouter::new(cfg.router.clone(), cache.clone(), db.clone(), backends);

        let ctx = ServiceContext::new(
            cfg.services.clone(),
            db.clone(),
            cache.clone(),
            lnd.clone(),
            cln.clone(),
            requests,
        )?;
        let (supervisor, supervisor_loop) = Supervisor::for_context(&ctx);

        let cancel = CancellationToken::new();
        let tasks = vec![
            tokio::spawn(router.run(cancel.child_token())),
            tokio::spawn(supervisor_loop.run(cancel.child_token())),
        ];
        supervisor.start()?;
        info!(nodes = cache.get_active_torq_node_ids().len(), "services started");

        Ok(Self {
            db,
            cache,
            engine,
            tags,
            lnd,
            cln,
            supervisor,
            cancel,
            tasks,
        })
    }

    /// Reloads the persisted state and restarts every service.
    ///
    /// Nodes that were deactivated or deleted, or whose credentials changed, have their services
    /// stopped before their connections are dropped. Database, transport, router and service
    /// settings keep their startup values.
    pub async fn reload(&self, cfg: &Config) -> Result<()> {
        let previous: HashMap<i64, NodeConnectionDetails> = self
            .cache
            .get_managed_node_ids()
            .into_iter()
            .map(|node_id| (node_id, self.cache.get_node_connection_details(node_id)))
            .collect();

        load_state(&self.db, &self.cache, &self.engine, &self.tags, cfg).await?;

        let active = self.cache.get_active_torq_node_ids();
        for (node_id, before) in previous {
            let deactivated = !active.contains(&node_id);
            let credentials_changed = before.credentials_differ(&self.cache.get_node_connection_details(node_id));
            if deactivated || credentials_changed {
                info!(node_id, deactivated, credentials_changed, "dropping node connection");
                self.supervisor.stop_node(node_id);
                self.lnd.remove_connection(node_id).await;
                self.cln.remove_connection(node_id).await;
            }
        }

        self.supervisor.restart().await?;
        info!("services restarted");
        Ok(())
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn cache(&self) -> &TorqCache {
        &self.cache
    }

    /// Stops the services and the router and closes every node connection.
    pub async fn stop(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(error) = task.await {
                tracing::warn!(%error, "task did not stop cleanly");
            }
        }
        let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
            while !self.supervisor.running_services().is_empty() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(running = self.supervisor.running_services().len(), "services still stopping");
        }
        self.lnd.close_all().await;
        self.cln.close_all().await;
        info!("services stopped");
    }
}

async fn load_state(
    db: &TorqDb,
    cache: &TorqCache,
    engine: &CorridorEngine,
    tags: &TagManager<TorqDb>,
    cfg: &Config,
) -> Result<()> {
    bootstrap_cache(db, cache).await?;

    let mut settings = cache.get_settings();
    settings.torq_version = env!("CARGO_PKG_VERSION").to_string();
    if let Some(vector_url) = &cfg.vector_url {
        settings.vector_url = vector_url.clone();
    }
    if let Some(torq_uuid) = cfg.torq_uuid {
        settings.torq_uuid = torq_uuid;
    }
    cache.set_settings(settings);

    engine.refresh_all(db).await?;
    let groups = regenerate_channel_groups(db, engine).await?;
    tags.refresh_tag_cache().await?;
    info!(
        category_groups = groups.category_groups,
        tag_groups = groups.tag_groups,
        "corridors and channel groups loaded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use torq_db::nodes::TorqDbNodeOperations;
    use torq_types::prelude::{Chain, Implementation, Network, NodeConnectionDetails, NodeStatus};

    use super::*;
    use crate::config::DatabaseConfig;

    fn in_memory_config() -> Config {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Config {
            database: DatabaseConfig::Url {
                url: format!("sqlite:file:torqd_{id}?mode=memory&cache=shared"),
                max_connections: 2,
            },
            vector_url: Some("https://vector.example.org/".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_reload_and_stop() -> anyhow::Result<()> {
        let mut cfg = in_memory_config();
        let torqd = Torqd::start(&cfg).await?;

        assert_eq!(torqd.cache().get_vector_url(), "https://vector.example.org/");
        assert_eq!(torqd.cache().get_torq_version(), env!("CARGO_PKG_VERSION"));
        assert!(torqd.supervisor().running_services().is_empty());

        // a node added while running is picked up by the reload
        let node = torqd
            .db
            .get_or_create_node(None, &format!("02{}", "0".repeat(64)), Chain::Bitcoin, Network::RegTest)
            .await?;
        torqd
            .db
            .insert_node_connection_details(
                None,
                NodeConnectionDetails {
                    node_id: node.node_id,
                    name: "alice".into(),
                    implementation: Implementation::Cln,
                    status: NodeStatus::Inactive,
                    ..Default::default()
                },
            )
            .await?;
        let uuid = uuid::Uuid::new_v4();
        cfg.torq_uuid = Some(uuid);
        torqd.reload(&cfg).await?;

        assert_eq!(torqd.cache().get_torq_uuid(), uuid);
        assert_eq!(torqd.cache().get_node_alias(node.node_id), "alice");
        assert!(torqd.cache().get_active_torq_node_ids().is_empty());

        torqd.stop().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_reload_stops_services_of_deleted_node() -> anyhow::Result<()> {
        let cfg = in_memory_config();
        let db = TorqDb::new(&cfg.database.to_url(), TorqDbConfig::default()).await?;
        let node = db
            .get_or_create_node(None, &format!("03{}", "0".repeat(64)), Chain::Bitcoin, Network::RegTest)
            .await?;
        db.insert_node_connection_details(
            None,
            NodeConnectionDetails {
                node_id: node.node_id,
                name: "bob".into(),
                implementation: Implementation::Cln,
                status: NodeStatus::Active,
                ..Default::default()
            },
        )
        .await?;

        let torqd = Torqd::start(&cfg).await?;
        tokio::time::timeout(Duration::from_secs(5), async {
            while torqd.supervisor().running_services().len() < 5 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await?;

        db.set_node_connection_status(None, node.node_id, NodeStatus::Deleted).await?;
        torqd.reload(&cfg).await?;

        assert!(torqd.cache().get_active_torq_node_ids().is_empty());
        assert_eq!(torqd.cache().get_node_connection_details(node.node_id).node_id, 0);
        assert!(torqd.supervisor().running_services().is_empty());

        torqd.stop().await;
        Ok(())
    }
}
