use torq_types::prelude::{
    Chain, Implementation, Network, Node, NodeConnectionDetails, NodeEvent, NodeStatus, PeerConnection,
    PeerConnectionSetting, PeerConnectionStatus, PingSystem, Settings,
};

use super::to_unsigned;
use crate::{
    errors::DbEntityError, node, node_connection_details, node_connection_history, node_event, settings,
};

impl TryFrom<node::Model> for Node {
    type Error = DbEntityError;

    fn try_from(value: node::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            node_id: value.node_id,
            public_key: value.public_key,
            chain: Chain::try_from(value.chain)?,
            network: Network::try_from(value.network)?,
            created_on: Some(value.created_on),
        })
    }
}

impl TryFrom<node_connection_details::Model> for NodeConnectionDetails {
    type Error = DbEntityError;

    fn try_from(value: node_connection_details::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            node_id: value.node_id,
            name: value.name,
            implementation: Implementation::try_from(value.implementation)?,
            grpc_address: value.grpc_address,
            tls_data: value.tls_data,
            macaroon_data: value.macaroon_data,
            certificate_data: value.certificate_data,
            key_data: value.key_data,
            status: NodeStatus::try_from(value.status_id)?,
            ping_system: PingSystem(to_unsigned("ping_system", i64::from(value.ping_system))?),
            created_on: Some(value.created_on),
            updated_on: Some(value.updated_on),
        })
    }
}

impl TryFrom<node_event::Model> for NodeEvent {
    type Error = DbEntityError;

    fn try_from(value: node_event::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp: Some(value.timestamp),
            event_node_id: value.event_node_id,
            node_id: value.node_id,
            alias: value.alias,
            color: value.color,
            addresses: serde_json::from_str(&value.node_addresses)?,
            features: serde_json::from_str(&value.features)?,
        })
    }
}

impl TryFrom<node_connection_history::Model> for PeerConnection {
    type Error = DbEntityError;

    fn try_from(value: node_connection_history::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            node_id: value.node_id,
            peer_node_id: value.peer_node_id,
            timestamp: Some(value.timestamp),
            address: value.address,
            setting: PeerConnectionSetting::try_from(value.setting)?,
            status: PeerConnectionStatus::try_from(value.connection_status)?,
        })
    }
}

impl TryFrom<settings::Model> for Settings {
    type Error = DbEntityError;

    fn try_from(value: settings::Model) -> Result<Self, Self::Error> {
        let defaults = Settings::default();
        Ok(Self {
            torq_uuid: value
                .torq_uuid
                .parse()
                .map_err(|e| DbEntityError::Conversion(format!("invalid installation uuid: {e}")))?,
            preferred_timezone: value.preferred_timezone,
            default_date_range: value.default_date_range,
            default_language: value.default_language,
            week_starts_on: value.week_starts_on,
            vector_url: value.vector_url.unwrap_or(defaults.vector_url),
            torq_version: defaults.torq_version,
        })
    }
}
