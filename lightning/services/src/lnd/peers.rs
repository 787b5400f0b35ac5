use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;
use torq_db::TorqDbAllOperations;
use torq_lightning_rpc::proto::lnrpc::{self, peer_event::EventType};
use torq_types::prelude::PeerConnectionStatus;

use super::{next_message, non_empty};
use crate::{
    context::ServiceContext,
    errors::{Result, ServiceError},
    lifecycle::ServiceHandle,
    peers::record_peer_status,
};

/// Records the currently connected peers, then follows the peer event subscription.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.lnd(node_id).await?;
    let (chain, network) = ctx.network_of(node_id);

    let mut events = client.subscribe_peer_events().await?;

    let peers = client.list_peers().await?;
    let mut connected = BTreeSet::new();
    for peer in peers {
        let peer_node_id = ctx.node_id_for(&peer.pub_key, chain, network).await?;
        record_peer_status(ctx, node_id, peer_node_id, PeerConnectionStatus::Connected, non_empty(peer.address)).await?;
        connected.insert(peer_node_id);
    }
    tracing::debug!(node_id, connected = connected.len(), "connected peers imported");
    ctx.cache.set_connected_peer_nodes(node_id, connected);
    handle.active();

    while let Some(event) = next_message(cancel, &mut events, "peer events").await? {
        process_peer_event(ctx, node_id, event).await?;
    }
    Ok(())
}

async fn process_peer_event<Db>(ctx: &ServiceContext<Db>, node_id: i64, event: lnrpc::PeerEvent) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let status = match EventType::try_from(event.r#type) {
        Ok(EventType::PeerOnline) => PeerConnectionStatus::Connected,
        Ok(EventType::PeerOffline) => PeerConnectionStatus::Disconnected,
        Err(_) => return Err(ServiceError::InvalidData(format!("peer event type {}", event.r#type))),
    };
    let (chain, network) = ctx.network_of(node_id);
    let peer_node_id = ctx.node_id_for(&event.pub_key, chain, network).await?;

    record_peer_status(ctx, node_id, peer_node_id, status, None).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use torq_db::peers::TorqDbPeerOperations;
    use torq_lightning_rpc::test_utils::LndScript;
    use torq_types::prelude::{Implementation, ServiceStatus, ServiceType};

    use super::*;
    use crate::{
        events::TorqEvent,
        test_support::{TestEnv, next_event, public_key, status_reached},
    };

    #[tokio::test]
    async fn test_connected_peers_and_events_are_recorded() -> anyhow::Result<()> {
        let script = LndScript {
            peers: vec![lnrpc::Peer {
                pub_key: public_key("03"),
                address: "10.0.0.3:9735".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let env = TestEnv::new(Implementation::Lnd, script, Default::default(), Default::default()).await?;
        let feed = env.lnd.feed_peer_events();
        let mut events = env.ctx.bus.subscribe();

        let (ctx, handle, cancel) = env.service(ServiceType::LndPeerEvents);
        tokio::spawn(async move { run(&ctx, &handle, &cancel).await });
        status_reached(&mut events, ServiceType::LndPeerEvents, ServiceStatus::Active).await?;

        let bob = env.ctx.cache.get_node_id_by_public_key(
            &public_key("03"),
            torq_types::prelude::Chain::Bitcoin,
            torq_types::prelude::Network::RegTest,
        );
        assert!(env.ctx.cache.is_connected_peer_node(env.node_id, bob));

        let sent = feed.unbounded_send(lnrpc::PeerEvent {
            pub_key: public_key("03"),
            r#type: EventType::PeerOffline as i32,
        });
        assert!(sent.is_ok());
        next_event(&mut events, |e| {
            matches!(e, TorqEvent::PeerStatusChanged { status: PeerConnectionStatus::Disconnected, .. })
        })
        .await?;
        assert!(!env.ctx.cache.is_connected_peer_node(env.node_id, bob));

        let history = env.ctx.db.get_peer_connection_history(None, env.node_id, bob).await?;
        assert_eq!(history.len(), 2);
        // the address seen at import is carried to the offline row
        assert_eq!(history[1].address.as_deref(), Some("10.0.0.3:9735"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_event_type_fails() -> anyhow::Result<()> {
        let env = TestEnv::lnd().await?;
        let event = lnrpc::PeerEvent {
            pub_key: public_key("03"),
            r#type: 7,
        };
        assert!(matches!(
            process_peer_event(&env.ctx, env.node_id, event).await,
            Err(ServiceError::InvalidData(_))
        ));
        Ok(())
    }
}
