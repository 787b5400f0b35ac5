//! SeaORM entities of the Torq database.
//!
//! Every table of the schema created by `torq-db-migration` has one module here.
//! The [`conversions`] module maps the models into the `torq-types` data model.

#![allow(clippy::all)]

pub mod category;
pub mod channel;
pub mod channel_group;
pub mod corridor;
pub mod forward;
pub mod htlc_event;
pub mod invoice;
pub mod node;
pub mod node_connection_details;
pub mod node_connection_history;
pub mod node_event;
pub mod payment;
pub mod routing_policy;
pub mod settings;
pub mod tag;
pub mod tagged_entity;
pub mod tx;

pub mod conversions;
pub mod errors;

pub mod prelude {
    pub use super::{
        category::Entity as Category, channel::Entity as Channel, channel_group::Entity as ChannelGroup,
        corridor::Entity as Corridor, forward::Entity as Forward, htlc_event::Entity as HtlcEvent,
        invoice::Entity as Invoice, node::Entity as Node, node_connection_details::Entity as NodeConnectionDetails,
        node_connection_history::Entity as NodeConnectionHistory, node_event::Entity as NodeEvent,
        payment::Entity as Payment, routing_policy::Entity as RoutingPolicy, settings::Entity as Settings,
        tag::Entity as Tag, tagged_entity::Entity as TaggedEntity, tx::Entity as Tx,
    };
}
