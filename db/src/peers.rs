use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use torq_db_entity::{node_connection_history, prelude::NodeConnectionHistory};
use torq_types::prelude::PeerConnection;

use crate::{
    OptTx, TorqDbGeneralModelOperations,
    db::TorqDb,
    errors::{DbSqlError, Result},
};

/// Defines DB API for the peer connection history of managed nodes.
#[async_trait]
pub trait TorqDbPeerOperations {
    async fn get_latest_peer_connection<'a>(
        &'a self,
        tx: OptTx<'a>,
        node_id: i64,
        peer_node_id: i64,
    ) -> Result<Option<PeerConnection>>;

    /// Appends a history row unless the latest row of the pair has the same status, setting and address.
    ///
    /// Returns `true` if a row was inserted.
    async fn insert_peer_connection_if_changed<'a>(&'a self, tx: OptTx<'a>, connection: PeerConnection)
    -> Result<bool>;

    async fn get_peer_connection_history<'a>(
        &'a self,
        tx: OptTx<'a>,
        node_id: i64,
        peer_node_id: i64,
    ) -> Result<Vec<PeerConnection>>;
}

#[async_trait]
impl TorqDbPeerOperations for TorqDb {
    async fn get_latest_peer_connection<'a>(
        &'a self,
        tx: OptTx<'a>,
        node_id: i64,
        peer_node_id: i64,
    ) -> Result<Option<PeerConnection>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Ok::<_, DbSqlError>(
                        NodeConnectionHistory::find()
                            .filter(node_connection_history::Column::NodeId.eq(node_id))
                            .filter(node_connection_history::Column::PeerNodeId.eq(peer_node_id))
                            .order_by_desc(node_connection_history::Column::Timestamp)
                            .order_by_desc(node_connection_history::Column::Id)
                            .one(tx.as_ref())
                            .await?
                            .map(PeerConnection::try_from)
                            .transpose()?,
                    )
                })
            })
            .await
    }

    async fn insert_peer_connection_if_changed<'a>(
        &'a self,
        tx: OptTx<'a>,
        connection: PeerConnection,
    ) -> Result<bool> {
        let myself = self.clone();
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let latest = myself
                        .get_latest_peer_connection(Some(tx), connection.node_id, connection.peer_node_id)
                        .await?;

                    let unchanged = latest.is_some_and(|l| {
                        l.status == connection.status && l.setting == connection.setting && l.address == connection.address
                    });
                    if unchanged {
                        return Ok(false);
                    }

                    node_connection_history::ActiveModel {
                        node_id: Set(connection.node_id),
                        peer_node_id: Set(connection.peer_node_id),
                        timestamp: Set(connection.timestamp.unwrap_or_else(chrono::Utc::now)),
                        address: Set(connection.address.clone()),
                        setting: Set(i32::from(connection.setting)),
                        connection_status: Set(i32::from(connection.status)),
                        ..Default::default()
                    }
                    .insert(tx.as_ref())
                    .await?;

                    tracing::debug!(
                        node_id = connection.node_id,
                        peer_node_id = connection.peer_node_id,
                        status = ?connection.status,
                        "peer connection recorded"
                    );
                    Ok::<_, DbSqlError>(true)
                })
            })
            .await
    }

    async fn get_peer_connection_history<'a>(
        &'a self,
        tx: OptTx<'a>,
        node_id: i64,
        peer_node_id: i64,
    ) -> Result<Vec<PeerConnection>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    NodeConnectionHistory::find()
                        .filter(node_connection_history::Column::NodeId.eq(node_id))
                        .filter(node_connection_history::Column::PeerNodeId.eq(peer_node_id))
                        .order_by_asc(node_connection_history::Column::Timestamp)
                        .order_by_asc(node_connection_history::Column::Id)
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| PeerConnection::try_from(m).map_err(DbSqlError::from))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use torq_types::prelude::{PeerConnectionSetting, PeerConnectionStatus};

    use super::*;

    fn connection(status: PeerConnectionStatus) -> PeerConnection {
        PeerConnection {
            node_id: 1,
            peer_node_id: 2,
            timestamp: Some(chrono::Utc::now()),
            address: Some("10.0.0.2:9735".into()),
            setting: PeerConnectionSetting::AlwaysReconnect,
            status,
        }
    }

    #[tokio::test]
    async fn test_history_rows_only_on_change() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;

        assert!(db.insert_peer_connection_if_changed(None, connection(PeerConnectionStatus::Connected)).await?);
        assert!(!db.insert_peer_connection_if_changed(None, connection(PeerConnectionStatus::Connected)).await?);
        assert!(db.insert_peer_connection_if_changed(None, connection(PeerConnectionStatus::Disconnected)).await?);

        let history = db.get_peer_connection_history(None, 1, 2).await?;
        let statuses: Vec<_> = history.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![PeerConnectionStatus::Connected, PeerConnectionStatus::Disconnected]
        );
        assert_eq!(
            db.get_latest_peer_connection(None, 1, 2).await?.map(|c| c.status),
            Some(PeerConnectionStatus::Disconnected)
        );
        Ok(())
    }
}
