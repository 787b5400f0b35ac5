use std::{fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Timestamp, network::Implementation};

/// Long-lived unit of work owned by a managed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceType {
    LndChannelEvents,
    LndGraphEvents,
    LndTransactions,
    LndHtlcEvents,
    LndInvoices,
    LndForwards,
    LndPayments,
    LndInFlightPayments,
    LndPeerEvents,
    LndChannelBalanceCache,
    ClnPeers,
    ClnChannels,
    ClnFunds,
    ClnNodes,
    ClnTransactions,
    VectorPing,
    AmbossPing,
}

impl ServiceType {
    pub const LND: [ServiceType; 10] = [
        ServiceType::LndChannelEvents,
        ServiceType::LndGraphEvents,
        ServiceType::LndTransactions,
        ServiceType::LndHtlcEvents,
        ServiceType::LndInvoices,
        ServiceType::LndForwards,
        ServiceType::LndPayments,
        ServiceType::LndInFlightPayments,
        ServiceType::LndPeerEvents,
        ServiceType::LndChannelBalanceCache,
    ];

    pub const CLN: [ServiceType; 5] = [
        ServiceType::ClnPeers,
        ServiceType::ClnChannels,
        ServiceType::ClnFunds,
        ServiceType::ClnNodes,
        ServiceType::ClnTransactions,
    ];

    /// The ingestion services started for every node of the given implementation.
    pub fn for_implementation(implementation: Implementation) -> &'static [ServiceType] {
        match implementation {
            Implementation::Lnd => &Self::LND,
            Implementation::Cln => &Self::CLN,
        }
    }

    /// Service that must be `Active` before this one leaves `Pending`.
    pub fn dependency(&self) -> Option<ServiceType> {
        match self {
            ServiceType::LndGraphEvents | ServiceType::LndChannelBalanceCache => Some(ServiceType::LndChannelEvents),
            ServiceType::ClnNodes => Some(ServiceType::ClnChannels),
            _ => None,
        }
    }

    /// Default polling interval of the interval driven services.
    pub fn default_tick(&self) -> Option<Duration> {
        match self {
            ServiceType::ClnPeers => Some(Duration::from_secs(60)),
            ServiceType::ClnChannels | ServiceType::ClnFunds => Some(Duration::from_secs(10)),
            ServiceType::ClnNodes | ServiceType::ClnTransactions => Some(Duration::from_secs(15 * 60)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServiceType::LndChannelEvents => "lnd_channel_events",
            ServiceType::LndGraphEvents => "lnd_graph_events",
            ServiceType::LndTransactions => "lnd_transactions",
            ServiceType::LndHtlcEvents => "lnd_htlc_events",
            ServiceType::LndInvoices => "lnd_invoices",
            ServiceType::LndForwards => "lnd_forwards",
            ServiceType::LndPayments => "lnd_payments",
            ServiceType::LndInFlightPayments => "lnd_in_flight_payments",
            ServiceType::LndPeerEvents => "lnd_peer_events",
            ServiceType::LndChannelBalanceCache => "lnd_channel_balance_cache",
            ServiceType::ClnPeers => "cln_peers",
            ServiceType::ClnChannels => "cln_channels",
            ServiceType::ClnFunds => "cln_funds",
            ServiceType::ClnNodes => "cln_nodes",
            ServiceType::ClnTransactions => "cln_transactions",
            ServiceType::VectorPing => "vector_ping",
            ServiceType::AmbossPing => "amboss_ping",
        }
    }
}

impl Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle status of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ServiceStatus {
    #[default]
    Inactive,
    Pending,
    Initializing,
    Active,
    Failed,
}

impl Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServiceStatus::Inactive => "inactive",
            ServiceStatus::Pending => "pending",
            ServiceStatus::Initializing => "initializing",
            ServiceStatus::Active => "active",
            ServiceStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Current status of one (node, service) pair and the time of the last transition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceState {
    pub status: ServiceStatus,
    pub since: Option<Timestamp>,
    /// Description of the last failure, kept until the next transition.
    pub error: Option<String>,
}
