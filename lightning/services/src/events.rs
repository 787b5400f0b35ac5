//! In-process broadcast of the normalized events produced by the pipelines.

use std::sync::Arc;

use async_broadcast::{Receiver, Sender, broadcast};
use torq_types::prelude::{
    Channel, ChannelState, Forward, HtlcEvent, Invoice, NodeEvent, Payment, PeerConnectionStatus, RoutingPolicyEvent,
    ServiceStatus, ServiceType, Transaction,
};

/// Event published on the [`EventBus`].
#[derive(Debug, Clone, PartialEq)]
pub enum TorqEvent {
    ChannelUpdated(Box<Channel>),
    ChannelStatesUpdated { node_id: i64, states: Vec<ChannelState> },
    RoutingPolicyUpdated(RoutingPolicyEvent),
    NodeAnnounced(NodeEvent),
    PeerStatusChanged {
        node_id: i64,
        peer_node_id: i64,
        status: PeerConnectionStatus,
    },
    TransactionStored(Transaction),
    InvoiceUpdated(Box<Invoice>),
    PaymentUpdated(Box<Payment>),
    ForwardsStored { node_id: i64, forwards: Vec<Forward> },
    HtlcEvent(Box<HtlcEvent>),
    ServiceStatusChanged {
        node_id: i64,
        service_type: ServiceType,
        status: ServiceStatus,
    },
}

impl TorqEvent {
    /// The managed node that produced the event, when it is bound to one.
    pub fn node_id(&self) -> Option<i64> {
        match self {
            TorqEvent::ChannelUpdated(_) => None,
            TorqEvent::ChannelStatesUpdated { node_id, .. }
            | TorqEvent::PeerStatusChanged { node_id, .. }
            | TorqEvent::ForwardsStored { node_id, .. }
            | TorqEvent::ServiceStatusChanged { node_id, .. } => Some(*node_id),
            TorqEvent::RoutingPolicyUpdated(e) => Some(e.node_id),
            TorqEvent::NodeAnnounced(e) => Some(e.node_id),
            TorqEvent::TransactionStored(t) => Some(t.node_id),
            TorqEvent::InvoiceUpdated(i) => Some(i.node_id),
            TorqEvent::PaymentUpdated(p) => Some(p.node_id),
            TorqEvent::HtlcEvent(h) => Some(h.node_id),
        }
    }

    /// Returns `true` for events after which the channel balances of the node are stale.
    pub fn moves_balance(&self) -> bool {
        match self {
            TorqEvent::ForwardsStored { forwards, .. } => !forwards.is_empty(),
            TorqEvent::InvoiceUpdated(i) => i.settle_date.is_some(),
            TorqEvent::PaymentUpdated(p) => p.status.is_final(),
            TorqEvent::HtlcEvent(h) => h.settled == Some(true),
            _ => false,
        }
    }
}

/// Broadcast bus with overflow: a subscriber that falls behind loses the oldest events
/// instead of blocking the publishers.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<TorqEvent>,
    // keeps the channel open while nobody is subscribed
    _receiver: Arc<Receiver<TorqEvent>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.sender.capacity())
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (mut sender, receiver) = broadcast(capacity.max(1));
        sender.set_overflow(true);
        Self {
            sender,
            _receiver: Arc::new(receiver),
        }
    }

    /// Returns `false` if the event could not be broadcast.
    pub fn publish(&self, event: TorqEvent) -> bool {
        self.sender.try_broadcast(event).is_ok()
    }

    /// Subscribes to the events published from now on.
    pub fn subscribe(&self) -> Receiver<TorqEvent> {
        self.sender.new_receiver()
    }
}
