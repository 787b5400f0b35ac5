use std::time::Duration;

use serde::{Deserialize, Serialize};
use torq_types::prelude::ServiceType;

/// Settings of the supervisor and the ingestion pipelines.
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, smart_default::SmartDefault, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Interval at which a restart checks whether every service has stopped.
    #[default(Duration::from_secs(1))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub stop_poll_interval: Duration,
    /// First delay before a failed service is run again; doubled on every further failure.
    #[default(Duration::from_secs(5))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub backoff_base: Duration,
    #[default(Duration::from_secs(300))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub backoff_max: Duration,
    /// Interval at which a pending service checks its dependency.
    #[default(Duration::from_secs(1))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub dependency_poll_interval: Duration,
    /// Page size of the historic invoice, payment and forward imports.
    #[default(1000)]
    pub import_page_size: u32,
    #[default(Duration::from_secs(60))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub payments_interval: Duration,
    #[default(Duration::from_secs(60))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub in_flight_payments_interval: Duration,
    /// How long the final state of a tracked payment is awaited.
    #[default(Duration::from_secs(5))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub track_payment_timeout: Duration,
    #[default(Duration::from_secs(10))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub forwards_interval: Duration,
    #[default(Duration::from_secs(60))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub channel_balance_interval: Duration,
    #[default(Duration::from_secs(60))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub cln_peers_interval: Duration,
    #[default(Duration::from_secs(10))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub cln_channels_interval: Duration,
    #[default(Duration::from_secs(10))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub cln_funds_interval: Duration,
    #[default(Duration::from_secs(15 * 60))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub cln_nodes_interval: Duration,
    #[default(Duration::from_secs(15 * 60))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub cln_transactions_interval: Duration,
    #[default(Duration::from_secs(60))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub ping_interval: Duration,
    /// Consult the block explorer for funding, closing and transaction times.
    #[default(true)]
    pub block_explorer_enabled: bool,
    #[default(Duration::from_secs(10))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub http_timeout: Duration,
    /// Capacity of the event bus; slow subscribers lose the oldest events.
    #[default(1000)]
    pub event_bus_capacity: usize,
    #[default(_code = "\"https://api.amboss.space/graphql\".into()")]
    pub amboss_url: String,
}

impl ServicesConfig {
    /// Polling interval of an interval driven service.
    pub fn tick(&self, service_type: ServiceType) -> Option<Duration> {
        match service_type {
            ServiceType::LndPayments => Some(self.payments_interval),
            ServiceType::LndInFlightPayments => Some(self.in_flight_payments_interval),
            ServiceType::LndForwards => Some(self.forwards_interval),
            ServiceType::LndChannelBalanceCache => Some(self.channel_balance_interval),
            ServiceType::ClnPeers => Some(self.cln_peers_interval),
            ServiceType::ClnChannels => Some(self.cln_channels_interval),
            ServiceType::ClnFunds => Some(self.cln_funds_interval),
            ServiceType::ClnNodes => Some(self.cln_nodes_interval),
            ServiceType::ClnTransactions => Some(self.cln_transactions_interval),
            ServiceType::VectorPing | ServiceType::AmbossPing => Some(self.ping_interval),
            _ => None,
        }
    }

    pub(crate) fn backoff(&self, failures: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(failures.saturating_sub(1)))
            .min(self.backoff_max)
    }
}
