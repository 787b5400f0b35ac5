use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use torq_cache::TorqCache;

use crate::{
    ClnConnection, LndConnection,
    client::Credentials,
    errors::{Result, RpcError},
};

/// Opens and closes connections of one node implementation.
#[async_trait]
pub trait Connector<T>: Send + Sync {
    async fn open(&self, node_id: i64, credentials: &Credentials) -> Result<T>;

    async fn close(&self, node_id: i64, connection: T) -> Result<()>;
}

struct PooledConnection<T> {
    credentials: Credentials,
    connection: T,
}

/// Keeps at most one live connection per managed node.
///
/// A connection is reused while the credentials held by the cache for the node stay the same.
/// When they change, a new connection is opened and the stale one is closed afterwards, so
/// callers never receive a connection built from outdated credentials.
pub struct ClientPool<T> {
    cache: TorqCache,
    connector: Arc<dyn Connector<T>>,
    connections: tokio::sync::Mutex<HashMap<i64, PooledConnection<T>>>,
}

pub type LndClientPool = ClientPool<LndConnection>;
pub type ClnClientPool = ClientPool<ClnConnection>;

impl<T> std::fmt::Debug for ClientPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientPool").field("cache", &self.cache).finish_non_exhaustive()
    }
}

impl<T: Clone + Send + 'static> ClientPool<T> {
    pub fn new(cache: TorqCache, connector: Arc<dyn Connector<T>>) -> Self {
        Self {
            cache,
            connector,
            connections: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Returns a connection to the node matching its current credentials.
    ///
    /// If opening a replacement connection fails, the previous connection is kept in the pool
    /// and the error is returned.
    pub async fn get_connection(&self, node_id: i64) -> Result<T> {
        let details = self.cache.get_node_connection_details(node_id);
        if details.node_id == 0 {
            return Err(RpcError::MissingConnectionDetails(node_id));
        }
        let credentials = Credentials::try_from(&details)?;

        let mut connections = self.connections.lock().await;
        if let Some(pooled) = connections.get(&node_id) {
            if pooled.credentials == credentials {
                return Ok(pooled.connection.clone());
            }
            tracing::info!(node_id, "connection details changed, reconnecting");
        }

        let connection = self.connector.open(node_id, &credentials).await?;
        let stale = connections.insert(
            node_id,
            PooledConnection {
                credentials,
                connection: connection.clone(),
            },
        );
        drop(connections);

        if let Some(stale) = stale {
            if let Err(error) = self.connector.close(node_id, stale.connection).await {
                tracing::warn!(node_id, %error, "failed to close stale connection");
            }
        }

        Ok(connection)
    }

    /// Drops the connection of the node, e.g. when the node is deactivated.
    pub async fn remove_connection(&self, node_id: i64) {
        let removed = self.connections.lock().await.remove(&node_id);
        if let Some(pooled) = removed {
            if let Err(error) = self.connector.close(node_id, pooled.connection).await {
                tracing::warn!(node_id, %error, "failed to close connection");
            }
        }
    }

    pub async fn close_all(&self) {
        let drained: Vec<(i64, PooledConnection<T>)> = self.connections.lock().await.drain().collect();
        for (node_id, pooled) in drained {
            if let Err(error) = self.connector.close(node_id, pooled.connection).await {
                tracing::warn!(node_id, %error, "failed to close connection");
            }
        }
    }

    pub async fn connected_node_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.connections.lock().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use torq_types::prelude::{Implementation, NodeConnectionDetails, NodeStatus};

    use super::*;

    /// Connections are numbered in the order they were opened.
    #[derive(Default)]
    struct CountingConnector {
        opened: AtomicUsize,
        closed: parking_lot::Mutex<Vec<usize>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl Connector<usize> for CountingConnector {
        async fn open(&self, _node_id: i64, _credentials: &Credentials) -> Result<usize> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(RpcError::Timeout(std::time::Duration::from_secs(15)));
            }
            Ok(self.opened.fetch_add(1, Ordering::SeqCst) + 1)
        }

        async fn close(&self, _node_id: i64, connection: usize) -> Result<()> {
            self.closed.lock().push(connection);
            Ok(())
        }
    }

    fn lnd_details(macaroon: &[u8]) -> NodeConnectionDetails {
        NodeConnectionDetails {
            node_id: 1,
            name: "alice".into(),
            implementation: Implementation::Lnd,
            grpc_address: Some("10.0.0.1:10009".into()),
            tls_data: Some(b"cert".to_vec()),
            macaroon_data: Some(macaroon.to_vec()),
            status: NodeStatus::Active,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_connection_is_reused_until_credentials_change() -> anyhow::Result<()> {
        let cache = TorqCache::new();
        let connector = Arc::new(CountingConnector::default());
        let pool = ClientPool::new(cache.clone(), connector.clone());

        cache.set_node_connection_details(lnd_details(b"m1"));
        assert_eq!(pool.get_connection(1).await?, 1);
        assert_eq!(pool.get_connection(1).await?, 1);

        cache.set_node_connection_details(lnd_details(b"m2"));
        assert_eq!(pool.get_connection(1).await?, 2);
        assert_eq!(*connector.closed.lock(), vec![1]);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_reopen_keeps_previous_connection() -> anyhow::Result<()> {
        let cache = TorqCache::new();
        let connector = Arc::new(CountingConnector::default());
        let pool = ClientPool::new(cache.clone(), connector.clone());

        cache.set_node_connection_details(lnd_details(b"m1"));
        assert_eq!(pool.get_connection(1).await?, 1);

        connector.fail.store(true, Ordering::SeqCst);
        cache.set_node_connection_details(lnd_details(b"m2"));
        assert!(matches!(pool.get_connection(1).await, Err(RpcError::Timeout(_))));
        assert!(connector.closed.lock().is_empty());
        assert_eq!(pool.connected_node_ids().await, vec![1]);

        connector.fail.store(false, Ordering::SeqCst);
        assert_eq!(pool.get_connection(1).await?, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_node_has_no_connection() -> anyhow::Result<()> {
        let pool = ClientPool::new(TorqCache::new(), Arc::new(CountingConnector::default()));

        assert!(matches!(
            pool.get_connection(42).await,
            Err(RpcError::MissingConnectionDetails(42))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_removed_connection_is_closed_and_reopened_on_demand() -> anyhow::Result<()> {
        let cache = TorqCache::new();
        let connector = Arc::new(CountingConnector::default());
        let pool = ClientPool::new(cache.clone(), connector.clone());

        cache.set_node_connection_details(lnd_details(b"m1"));
        assert_eq!(pool.get_connection(1).await?, 1);
        pool.remove_connection(1).await;
        pool.remove_connection(1).await;

        assert!(pool.connected_node_ids().await.is_empty());
        assert_eq!(*connector.closed.lock(), vec![1]);
        assert_eq!(pool.get_connection(1).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_close_all_drains_the_pool() -> anyhow::Result<()> {
        let cache = TorqCache::new();
        let connector = Arc::new(CountingConnector::default());
        let pool = ClientPool::new(cache.clone(), connector.clone());

        cache.set_node_connection_details(lnd_details(b"m1"));
        pool.get_connection(1).await?;
        pool.close_all().await;

        assert!(pool.connected_node_ids().await.is_empty());
        assert_eq!(*connector.closed.lock(), vec![1]);
        Ok(())
    }
}
