//! Bookkeeping of operator peer requests in the connection history and the cache.

use torq_cache::TorqCache;
use torq_db::TorqDbAllOperations;
use torq_types::prelude::{PeerConnection, PeerConnectionSetting, PeerConnectionStatus};

use crate::{
    errors::Result,
    messages::{ConnectPeerRequest, ConnectPeerResponse, DisconnectPeerRequest, DisconnectPeerResponse},
    router::LightningRequests,
};

/// State the operator asked a peer to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRequestOutcome {
    Connected,
    Disconnected,
}

/// Connects the peer through the router and records the connection, also when the node
/// reports the peer as already connected.
pub async fn connect_peer_and_record<Db>(
    requests: &LightningRequests,
    db: &Db,
    cache: &TorqCache,
    request: ConnectPeerRequest,
) -> ConnectPeerResponse
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = request.node_id;
    let public_key = request.public_key.clone();
    let host = request.host.clone();

    let response = requests.connect_peer(request).await;
    if !response.is_active() && !response.data.request_failed_currently_connected {
        return response;
    }

    match record_peer_request(db, cache, node_id, &public_key, Some(host), PeerRequestOutcome::Connected).await {
        Ok(()) => response,
        Err(error) => {
            tracing::error!(node_id, %error, "failed to record peer connection");
            ConnectPeerResponse::inactive(node_id, error).with_data(response.data)
        }
    }
}

/// Disconnects the peer through the router and disables reconnects, also when the node
/// reports the peer as not connected.
pub async fn disconnect_peer_and_record<Db>(
    requests: &LightningRequests,
    db: &Db,
    cache: &TorqCache,
    request: DisconnectPeerRequest,
) -> DisconnectPeerResponse
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = request.node_id;
    let public_key = request.public_key.clone();

    let response = requests.disconnect_peer(request).await;
    if !response.is_active() && !response.data.request_failed_currently_disconnected {
        return response;
    }

    match record_peer_request(db, cache, node_id, &public_key, None, PeerRequestOutcome::Disconnected).await {
        Ok(()) => response,
        Err(error) => {
            tracing::error!(node_id, %error, "failed to record peer disconnection");
            DisconnectPeerResponse::inactive(node_id, error).with_data(response.data)
        }
    }
}

/// Appends the requested state to the history of the pair and mirrors it in the cache.
///
/// A connect is recorded with reconnects enabled, a disconnect disables them so the peer is
/// not dialled again by the node.
pub async fn record_peer_request<Db>(
    db: &Db,
    cache: &TorqCache,
    node_id: i64,
    public_key: &str,
    address: Option<String>,
    outcome: PeerRequestOutcome,
) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let settings = cache.get_node_settings_by_node_id(node_id);
    let peer = db
        .get_or_create_node(None, public_key, settings.chain, settings.network)
        .await?;
    cache.set_node(&peer);

    let (status, setting) = match outcome {
        PeerRequestOutcome::Connected => (PeerConnectionStatus::Connected, PeerConnectionSetting::AlwaysReconnect),
        PeerRequestOutcome::Disconnected => (PeerConnectionStatus::Disconnected, PeerConnectionSetting::DisableReconnect),
    };

    let inserted = db
        .insert_peer_connection_if_changed(
            None,
            PeerConnection {
                node_id,
                peer_node_id: peer.node_id,
                timestamp: Some(chrono::Utc::now()),
                address,
                setting,
                status,
            },
        )
        .await?;

    match outcome {
        PeerRequestOutcome::Connected => cache.set_connected_peer_node(node_id, peer.node_id),
        PeerRequestOutcome::Disconnected => cache.remove_connected_peer_node(node_id, peer.node_id),
    }

    tracing::debug!(node_id, peer_node_id = peer.node_id, ?outcome, inserted, "peer request recorded");
    Ok(())
}
