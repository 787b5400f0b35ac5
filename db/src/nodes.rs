use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set, sea_query::OnConflict,
};
use torq_db_entity::{node, node_connection_details, node_event, prelude::*};
use torq_types::prelude::{
    Chain, Network, Node as NodeEntry, NodeConnectionDetails as NodeDetails, NodeEvent as NodeEventEntry, NodeStatus,
};

use crate::{
    OptTx, TorqDbGeneralModelOperations,
    db::TorqDb,
    errors::{DbSqlError, Result},
};

/// Defines DB API for nodes, managed node connection details and node announcements.
#[async_trait]
pub trait TorqDbNodeOperations {
    /// Returns the node with the given identity, creating it on first sighting.
    async fn get_or_create_node<'a>(
        &'a self,
        tx: OptTx<'a>,
        public_key: &str,
        chain: Chain,
        network: Network,
    ) -> Result<NodeEntry>;

    async fn get_node<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Option<NodeEntry>>;

    async fn get_nodes<'a>(&'a self, tx: OptTx<'a>) -> Result<Vec<NodeEntry>>;

    /// Inserts connection details of a managed node. The node itself must already exist.
    async fn insert_node_connection_details<'a>(&'a self, tx: OptTx<'a>, details: NodeDetails) -> Result<()>;

    /// Replaces the name, address, credentials and ping settings of a managed node.
    async fn update_node_connection_details<'a>(&'a self, tx: OptTx<'a>, details: NodeDetails) -> Result<()>;

    async fn set_node_connection_status<'a>(&'a self, tx: OptTx<'a>, node_id: i64, status: NodeStatus) -> Result<()>;

    async fn get_node_connection_details<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Option<NodeDetails>>;

    /// Returns the connection details of all managed nodes, optionally filtered by status.
    async fn get_all_node_connection_details<'a>(
        &'a self,
        tx: OptTx<'a>,
        status: Option<NodeStatus>,
    ) -> Result<Vec<NodeDetails>>;

    /// Returns the latest announcement of `event_node_id` observed by `node_id`.
    async fn get_latest_node_event<'a>(
        &'a self,
        tx: OptTx<'a>,
        event_node_id: i64,
        node_id: i64,
    ) -> Result<Option<NodeEventEntry>>;

    /// Appends the announcement unless it equals the latest stored one.
    ///
    /// Returns `true` if a row was inserted.
    async fn insert_node_event_if_changed<'a>(&'a self, tx: OptTx<'a>, event: NodeEventEntry) -> Result<bool>;
}

#[async_trait]
impl TorqDbNodeOperations for TorqDb {
    async fn get_or_create_node<'a>(
        &'a self,
        tx: OptTx<'a>,
        public_key: &str,
        chain: Chain,
        network: Network,
    ) -> Result<NodeEntry> {
        let public_key = public_key.to_string();
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let find = || {
                        Node::find()
                            .filter(node::Column::PublicKey.eq(public_key.clone()))
                            .filter(node::Column::Chain.eq(i32::from(chain)))
                            .filter(node::Column::Network.eq(i32::from(network)))
                    };

                    if let Some(model) = find().one(tx.as_ref()).await? {
                        return Ok(NodeEntry::try_from(model)?);
                    }

                    let model = node::ActiveModel {
                        public_key: Set(public_key.clone()),
                        chain: Set(chain.into()),
                        network: Set(network.into()),
                        created_on: Set(chrono::Utc::now()),
                        ..Default::default()
                    };

                    Node::insert(model)
                        .on_conflict(
                            OnConflict::columns([node::Column::PublicKey, node::Column::Chain, node::Column::Network])
                                .do_nothing()
                                .to_owned(),
                        )
                        .exec_without_returning(tx.as_ref())
                        .await?;

                    let model = find()
                        .one(tx.as_ref())
                        .await?
                        .ok_or_else(|| DbSqlError::MissingEntry(format!("node {public_key}")))?;

                    tracing::debug!(node_id = model.node_id, %public_key, "new node");
                    Ok::<_, DbSqlError>(NodeEntry::try_from(model)?)
                })
            })
            .await
    }

    async fn get_node<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Option<NodeEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Ok::<_, DbSqlError>(
                        Node::find_by_id(node_id)
                            .one(tx.as_ref())
                            .await?
                            .map(NodeEntry::try_from)
                            .transpose()?,
                    )
                })
            })
            .await
    }

    async fn get_nodes<'a>(&'a self, tx: OptTx<'a>) -> Result<Vec<NodeEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Node::find()
                        .order_by_asc(node::Column::NodeId)
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| NodeEntry::try_from(m).map_err(DbSqlError::from))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await
    }

    async fn insert_node_connection_details<'a>(&'a self, tx: OptTx<'a>, details: NodeDetails) -> Result<()> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    if Node::find_by_id(details.node_id).one(tx.as_ref()).await?.is_none() {
                        return Err(DbSqlError::MissingEntry(format!("node {}", details.node_id)));
                    }

                    let now = chrono::Utc::now();
                    node_connection_details::ActiveModel {
                        node_id: Set(details.node_id),
                        name: Set(details.name),
                        implementation: Set(details.implementation.into()),
                        grpc_address: Set(details.grpc_address),
                        tls_data: Set(details.tls_data),
                        macaroon_data: Set(details.macaroon_data),
                        certificate_data: Set(details.certificate_data),
                        key_data: Set(details.key_data),
                        status_id: Set(details.status.into()),
                        ping_system: Set(i32::try_from(details.ping_system.0)?),
                        created_on: Set(now),
                        updated_on: Set(now),
                    }
                    .insert(tx.as_ref())
                    .await?;

                    Ok::<_, DbSqlError>(())
                })
            })
            .await
    }

    async fn update_node_connection_details<'a>(&'a self, tx: OptTx<'a>, details: NodeDetails) -> Result<()> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let mut model = NodeConnectionDetails::find_by_id(details.node_id)
                        .one(tx.as_ref())
                        .await?
                        .ok_or_else(|| DbSqlError::MissingEntry(format!("connection details {}", details.node_id)))?
                        .into_active_model();

                    model.name = Set(details.name);
                    model.implementation = Set(details.implementation.into());
                    model.grpc_address = Set(details.grpc_address);
                    model.tls_data = Set(details.tls_data);
                    model.macaroon_data = Set(details.macaroon_data);
                    model.certificate_data = Set(details.certificate_data);
                    model.key_data = Set(details.key_data);
                    model.status_id = Set(details.status.into());
                    model.ping_system = Set(i32::try_from(details.ping_system.0)?);
                    model.updated_on = Set(chrono::Utc::now());
                    model.update(tx.as_ref()).await?;

                    Ok::<_, DbSqlError>(())
                })
            })
            .await
    }

    async fn set_node_connection_status<'a>(&'a self, tx: OptTx<'a>, node_id: i64, status: NodeStatus) -> Result<()> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let mut model = NodeConnectionDetails::find_by_id(node_id)
                        .one(tx.as_ref())
                        .await?
                        .ok_or_else(|| DbSqlError::MissingEntry(format!("connection details {node_id}")))?
                        .into_active_model();

                    model.status_id = Set(status.into());
                    model.updated_on = Set(chrono::Utc::now());
                    model.update(tx.as_ref()).await?;

                    Ok::<_, DbSqlError>(())
                })
            })
            .await
    }

    async fn get_node_connection_details<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Option<NodeDetails>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Ok::<_, DbSqlError>(
                        NodeConnectionDetails::find_by_id(node_id)
                            .one(tx.as_ref())
                            .await?
                            .map(NodeDetails::try_from)
                            .transpose()?,
                    )
                })
            })
            .await
    }

    async fn get_all_node_connection_details<'a>(
        &'a self,
        tx: OptTx<'a>,
        status: Option<NodeStatus>,
    ) -> Result<Vec<NodeDetails>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let mut query = NodeConnectionDetails::find().order_by_asc(node_connection_details::Column::NodeId);
                    if let Some(status) = status {
                        query = query.filter(node_connection_details::Column::StatusId.eq(i32::from(status)));
                    }

                    query
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| NodeDetails::try_from(m).map_err(DbSqlError::from))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await
    }

    async fn get_latest_node_event<'a>(
        &'a self,
        tx: OptTx<'a>,
        event_node_id: i64,
        node_id: i64,
    ) -> Result<Option<NodeEventEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Ok::<_, DbSqlError>(
                        NodeEvent::find()
                            .filter(node_event::Column::EventNodeId.eq(event_node_id))
                            .filter(node_event::Column::NodeId.eq(node_id))
                            .order_by_desc(node_event::Column::Timestamp)
                            .order_by_desc(node_event::Column::Id)
                            .one(tx.as_ref())
                            .await?
                            .map(NodeEventEntry::try_from)
                            .transpose()?,
                    )
                })
            })
            .await
    }

    async fn insert_node_event_if_changed<'a>(&'a self, tx: OptTx<'a>, event: NodeEventEntry) -> Result<bool> {
        let myself = self.clone();
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let latest = myself
                        .get_latest_node_event(Some(tx), event.event_node_id, event.node_id)
                        .await?;

                    if latest.is_some_and(|latest| !latest.differs_from(&event)) {
                        return Ok(false);
                    }

                    node_event::ActiveModel {
                        timestamp: Set(event.timestamp.unwrap_or_else(chrono::Utc::now)),
                        event_node_id: Set(event.event_node_id),
                        node_id: Set(event.node_id),
                        alias: Set(event.alias),
                        color: Set(event.color),
                        node_addresses: Set(serde_json::to_string(&event.addresses)?),
                        features: Set(serde_json::to_string(&event.features)?),
                        ..Default::default()
                    }
                    .insert(tx.as_ref())
                    .await?;

                    Ok::<_, DbSqlError>(true)
                })
            })
            .await
    }
}
