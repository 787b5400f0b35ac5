//! Status bookkeeping of a running service.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use torq_cache::TorqCache;
use torq_types::prelude::{ServiceStatus, ServiceType};

use crate::events::{EventBus, TorqEvent};

/// Writes the lifecycle state of one (node, service) pair into the cache and announces it.
///
/// Only the task owning the service holds its handle.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    cache: TorqCache,
    bus: EventBus,
    node_id: i64,
    service_type: ServiceType,
}

impl ServiceHandle {
    pub fn new(cache: TorqCache, bus: EventBus, node_id: i64, service_type: ServiceType) -> Self {
        Self {
            cache,
            bus,
            node_id,
            service_type,
        }
    }

    pub fn node_id(&self) -> i64 {
        self.node_id
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn status(&self) -> ServiceStatus {
        self.cache.get_node_service_state(self.node_id, self.service_type).status
    }

    pub fn pending(&self) {
        self.cache.set_pending_node_service_state(self.node_id, self.service_type);
        self.announce(ServiceStatus::Pending);
    }

    pub fn initializing(&self) {
        self.cache
            .set_initializing_node_service_state(self.node_id, self.service_type);
        self.announce(ServiceStatus::Initializing);
    }

    pub fn active(&self) {
        if self.status() == ServiceStatus::Active {
            return;
        }
        self.cache.set_active_node_service_state(self.node_id, self.service_type);
        tracing::info!(node_id = self.node_id, service = %self.service_type, "service active");
        self.announce(ServiceStatus::Active);
    }

    pub fn inactive(&self) {
        self.cache.set_inactive_node_service_state(self.node_id, self.service_type);
        self.announce(ServiceStatus::Inactive);
    }

    pub fn failed(&self, error: impl std::fmt::Display) {
        tracing::error!(node_id = self.node_id, service = %self.service_type, %error, "service failed");
        self.cache
            .set_failed_node_service_state(self.node_id, self.service_type, &error);
        self.announce(ServiceStatus::Failed);
    }

    fn announce(&self, status: ServiceStatus) {
        self.bus.publish(TorqEvent::ServiceStatusChanged {
            node_id: self.node_id,
            service_type: self.service_type,
            status,
        });
    }
}

/// Runs `fut` unless `cancel` fires first, in which case `None` is returned.
pub(crate) async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}

/// Sleeps for `interval`; returns `false` if cancelled meanwhile.
pub(crate) async fn tick(cancel: &CancellationToken, interval: std::time::Duration) -> bool {
    until_cancelled(cancel, tokio::time::sleep(interval)).await.is_some()
}
