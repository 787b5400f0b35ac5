use torq_types::prelude::{ServiceState, ServiceStatus, ServiceType};

use crate::TorqCache;

impl TorqCache {
    fn set_node_service_state(&self, node_id: i64, service_type: ServiceType, status: ServiceStatus, error: Option<String>) {
        let previous = self.tables.service_states.insert(
            (node_id, service_type),
            ServiceState {
                status,
                since: Some(chrono::Utc::now()),
                error: error.clone(),
            },
        );

        let previous = previous.map(|s| s.status).unwrap_or_default();
        if previous != status {
            match error {
                Some(error) => tracing::warn!(node_id, service = %service_type, %previous, %status, %error, "service state changed"),
                None => tracing::debug!(node_id, service = %service_type, %previous, %status, "service state changed"),
            }
        }
    }

    pub fn set_pending_node_service_state(&self, node_id: i64, service_type: ServiceType) {
        self.set_node_service_state(node_id, service_type, ServiceStatus::Pending, None);
    }

    pub fn set_initializing_node_service_state(&self, node_id: i64, service_type: ServiceType) {
        self.set_node_service_state(node_id, service_type, ServiceStatus::Initializing, None);
    }

    pub fn set_active_node_service_state(&self, node_id: i64, service_type: ServiceType) {
        self.set_node_service_state(node_id, service_type, ServiceStatus::Active, None);
    }

    pub fn set_inactive_node_service_state(&self, node_id: i64, service_type: ServiceType) {
        self.set_node_service_state(node_id, service_type, ServiceStatus::Inactive, None);
    }

    pub fn set_failed_node_service_state(&self, node_id: i64, service_type: ServiceType, error: impl ToString) {
        self.set_node_service_state(node_id, service_type, ServiceStatus::Failed, Some(error.to_string()));
    }

    /// Returns the state of the service, `Inactive` if it never ran.
    pub fn get_node_service_state(&self, node_id: i64, service_type: ServiceType) -> ServiceState {
        self.tables
            .service_states
            .get(&(node_id, service_type))
            .map(|s| s.value().clone())
            .unwrap_or_default()
    }

    pub fn is_node_service_active(&self, node_id: i64, service_type: ServiceType) -> bool {
        self.get_node_service_state(node_id, service_type).status == ServiceStatus::Active
    }

    /// States of all services of the node that ever reported one, sorted by service type.
    pub fn get_node_service_states(&self, node_id: i64) -> Vec<(ServiceType, ServiceState)> {
        let mut states: Vec<(ServiceType, ServiceState)> = self
            .tables
            .service_states
            .iter()
            .filter(|s| s.key().0 == node_id)
            .map(|s| (s.key().1, s.value().clone()))
            .collect();
        states.sort_unstable_by_key(|(service_type, _)| *service_type);
        states
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_state_lifecycle() {
        let cache = TorqCache::new();
        let service = ServiceType::LndChannelEvents;
        assert_eq!(cache.get_node_service_state(1, service).status, ServiceStatus::Inactive);

        cache.set_initializing_node_service_state(1, service);
        cache.set_active_node_service_state(1, service);
        assert!(cache.is_node_service_active(1, service));
        assert!(!cache.is_node_service_active(2, service));

        cache.set_failed_node_service_state(1, service, "stream closed");
        let state = cache.get_node_service_state(1, service);
        assert_eq!(state.status, ServiceStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("stream closed"));
        assert!(state.since.is_some());

        cache.set_inactive_node_service_state(1, service);
        assert_eq!(cache.get_node_service_state(1, service).error, None);
    }

    #[test]
    fn test_service_states_per_node() {
        let cache = TorqCache::new();
        cache.set_active_node_service_state(1, ServiceType::LndGraphEvents);
        cache.set_pending_node_service_state(1, ServiceType::LndChannelEvents);
        cache.set_active_node_service_state(2, ServiceType::ClnPeers);

        let states = cache.get_node_service_states(1);
        assert_eq!(
            states.iter().map(|(t, s)| (*t, s.status)).collect::<Vec<_>>(),
            vec![
                (ServiceType::LndChannelEvents, ServiceStatus::Pending),
                (ServiceType::LndGraphEvents, ServiceStatus::Active),
            ]
        );
    }
}
