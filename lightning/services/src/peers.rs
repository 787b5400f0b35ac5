//! Recording of peer connectivity observed by the pipelines.

use torq_db::{TorqDbAllOperations, peers::TorqDbPeerOperations};
use torq_types::prelude::{PeerConnection, PeerConnectionStatus};

use crate::{context::ServiceContext, errors::Result, events::TorqEvent};

/// Appends the observed status to the connection history and updates the connected set.
///
/// The reconnect setting of the latest row is kept; so is its address when none was observed.
pub async fn record_peer_status<Db>(
    ctx: &ServiceContext<Db>,
    node_id: i64,
    peer_node_id: i64,
    status: PeerConnectionStatus,
    address: Option<String>,
) -> Result<bool>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let latest = ctx.db.get_latest_peer_connection(None, node_id, peer_node_id).await?;
    let (setting, previous_address) = match latest {
        Some(latest) => (latest.setting, latest.address),
        None => (Default::default(), None),
    };

    let inserted = ctx
        .db
        .insert_peer_connection_if_changed(
            None,
            PeerConnection {
                node_id,
                peer_node_id,
                timestamp: Some(chrono::Utc::now()),
                address: address.or(previous_address),
                setting,
                status,
            },
        )
        .await?;

    match status {
        PeerConnectionStatus::Connected => ctx.cache.set_connected_peer_node(node_id, peer_node_id),
        PeerConnectionStatus::Disconnected => ctx.cache.remove_connected_peer_node(node_id, peer_node_id),
    }

    if inserted {
        tracing::debug!(node_id, peer_node_id, ?status, "peer status changed");
        ctx.bus.publish(TorqEvent::PeerStatusChanged {
            node_id,
            peer_node_id,
            status,
        });
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use torq_types::prelude::PeerConnectionSetting;

    use super::*;
    use crate::test_support::{TestEnv, remote_node};

    #[tokio::test]
    async fn test_status_changes_keep_setting_and_address() -> anyhow::Result<()> {
        let env = TestEnv::lnd().await?;
        let peer = remote_node(&env.ctx, "03").await?;
        env.ctx
            .db
            .insert_peer_connection_if_changed(
                None,
                PeerConnection {
                    node_id: env.node_id,
                    peer_node_id: peer,
                    timestamp: Some(chrono::Utc::now() - chrono::Duration::minutes(5)),
                    address: Some("10.0.0.3:9735".into()),
                    setting: PeerConnectionSetting::DisableReconnect,
                    status: PeerConnectionStatus::Disconnected,
                },
            )
            .await?;

        assert!(record_peer_status(&env.ctx, env.node_id, peer, PeerConnectionStatus::Connected, None).await?);
        assert!(!record_peer_status(&env.ctx, env.node_id, peer, PeerConnectionStatus::Connected, None).await?);
        assert!(env.ctx.cache.is_connected_peer_node(env.node_id, peer));

        let latest = env
            .ctx
            .db
            .get_latest_peer_connection(None, env.node_id, peer)
            .await?
            .ok_or_else(|| anyhow::anyhow!("history expected"))?;
        assert_eq!(latest.status, PeerConnectionStatus::Connected);
        assert_eq!(latest.setting, PeerConnectionSetting::DisableReconnect);
        assert_eq!(latest.address.as_deref(), Some("10.0.0.3:9735"));

        record_peer_status(&env.ctx, env.node_id, peer, PeerConnectionStatus::Disconnected, None).await?;
        assert!(!env.ctx.cache.is_connected_peer_node(env.node_id, peer));
        Ok(())
    }
}
