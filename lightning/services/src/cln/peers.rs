use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;
use torq_db::TorqDbAllOperations;
use torq_lightning_rpc::ClnConnection;
use torq_types::prelude::PeerConnectionStatus;

use super::to_hex;
use crate::{
    context::ServiceContext,
    errors::Result,
    lifecycle::{ServiceHandle, tick},
    peers::record_peer_status,
};

/// Polls the peer list and records connects and disconnects.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.cln(node_id).await?;

    import_peers(ctx, &client, node_id).await?;
    handle.active();

    while tick(cancel, ctx.cfg.cln_peers_interval).await {
        import_peers(ctx, &client, node_id).await?;
    }
    Ok(())
}

async fn import_peers<Db>(ctx: &ServiceContext<Db>, client: &ClnConnection, node_id: i64) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let (chain, network) = ctx.network_of(node_id);
    let previously_connected: BTreeSet<i64> = ctx.cache.get_connected_peer_node_ids(node_id).into_iter().collect();

    let mut connected = BTreeSet::new();
    for peer in client.list_peers().await? {
        let peer_node_id = ctx.node_id_for(&to_hex(&peer.id), chain, network).await?;
        let (status, address) = if peer.connected {
            connected.insert(peer_node_id);
            let address = peer.remote_addr.or_else(|| peer.netaddr.into_iter().next());
            (PeerConnectionStatus::Connected, address)
        } else {
            (PeerConnectionStatus::Disconnected, None)
        };
        record_peer_status(ctx, node_id, peer_node_id, status, address).await?;
    }

    // peers that are gone from the list are no longer connected either
    for peer_node_id in previously_connected.difference(&connected) {
        record_peer_status(ctx, node_id, *peer_node_id, PeerConnectionStatus::Disconnected, None).await?;
    }

    ctx.cache.set_connected_peer_nodes(node_id, connected);
    Ok(())
}
