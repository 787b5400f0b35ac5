use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use torq_cache::TorqCache;
use torq_lightning_rpc::pool::{ClnClientPool, LndClientPool};
use torq_types::prelude::{ChannelPoint, Implementation, RoutingPolicy, WalletBalance};

use crate::{
    cln::ClnBackend,
    errors::{RequestError, Result},
    lnd::LndBackend,
    messages::{AddressType, CreatedInvoice, FailedRoutingPolicyUpdate, NodeInformation, PeerInfo, SignatureVerification},
};

/// A complete routing policy to be applied to one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySubmission {
    pub channel_id: i64,
    pub channel_point: ChannelPoint,
    pub short_channel_id: Option<String>,
    pub policy: RoutingPolicy,
    /// Set when the time lock delta differs from the currently announced one.
    pub time_lock_delta_changed: bool,
}

/// Invoice parameters accepted by both implementations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvoiceParameters {
    pub memo: String,
    pub value_msat: Option<u64>,
    pub expiry_seconds: Option<u64>,
}

/// The operations the request router needs from a backing node, in terms of the data model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LightningBackend: Send + Sync {
    fn implementation(&self) -> Implementation;

    async fn information(&self) -> Result<NodeInformation>;

    async fn wallet_balance(&self) -> Result<WalletBalance>;

    async fn new_address(&self, address_type: AddressType, account: Option<String>) -> Result<String>;

    async fn new_invoice(&self, parameters: InvoiceParameters) -> Result<CreatedInvoice>;

    async fn connect_peer(&self, public_key: String, host: String, timeout: Duration) -> Result<()>;

    async fn disconnect_peer(&self, public_key: String) -> Result<()>;

    async fn list_peers(&self) -> Result<Vec<PeerInfo>>;

    async fn sign_message(&self, message: String) -> Result<String>;

    async fn verify_message(&self, message: String, signature: String) -> Result<SignatureVerification>;

    /// Applies the policy and returns the edges the node refused to update.
    async fn update_routing_policy(&self, submission: PolicySubmission) -> Result<Vec<FailedRoutingPolicyUpdate>>;
}

/// Resolves the backend of a managed node.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendProvider: Send + Sync {
    async fn backend(&self, node_id: i64) -> Result<Arc<dyn LightningBackend>>;
}

/// Builds backends on top of the client pools, picking the pool by the node implementation.
#[derive(Debug, Clone)]
pub struct PoolBackendProvider {
    cache: TorqCache,
    lnd: Arc<LndClientPool>,
    cln: Arc<ClnClientPool>,
}

impl PoolBackendProvider {
    pub fn new(cache: TorqCache, lnd: Arc<LndClientPool>, cln: Arc<ClnClientPool>) -> Self {
        Self { cache, lnd, cln }
    }
}

#[async_trait]
impl BackendProvider for PoolBackendProvider {
    async fn backend(&self, node_id: i64) -> Result<Arc<dyn LightningBackend>> {
        let details = self.cache.get_node_connection_details(node_id);
        if details.node_id == 0 {
            return Err(RequestError::UnknownNode(node_id));
        }

        Ok(match details.implementation {
            Implementation::Lnd => Arc::new(LndBackend::new(self.lnd.get_connection(node_id).await?)),
            Implementation::Cln => Arc::new(ClnBackend::new(self.cln.get_connection(node_id).await?)),
        })
    }
}

/// Splits `host:port`; the port is optional.
pub(crate) fn split_host_port(address: &str) -> (String, Option<u32>) {
    match address.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && !host.ends_with(':') => match port.parse::<u32>() {
            Ok(port) => (host.trim_matches(['[', ']']).to_string(), Some(port)),
            Err(_) => (address.to_string(), None),
        },
        _ => (address.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("10.0.0.1:9735", "10.0.0.1", Some(9735))]
    #[case("example.onion", "example.onion", None)]
    #[case("[::1]:9735", "::1", Some(9735))]
    #[case("node.example:abc", "node.example:abc", None)]
    fn test_split_host_port(#[case] address: &str, #[case] host: &str, #[case] port: Option<u32>) {
        assert_eq!(split_host_port(address), (host.to_string(), port));
    }
}
