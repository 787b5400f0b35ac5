//! Services of the managed Lightning nodes.
//!
//! For every managed node the [`supervisor::Supervisor`] runs one task per ingestion pipeline of
//! its implementation, plus the optional Vector and Amboss pings. Pipelines import what the node
//! knows into the database, keep the [`torq_cache::TorqCache`] current and announce changes on
//! the [`events::EventBus`].
//!
//! The LND pipelines live in [`lnd`], the CLN pipelines in [`cln`]. Both record their
//! observations through the implementation agnostic helpers in [`channels`], [`graph`],
//! [`peers`] and [`activity`].

pub mod activity;
pub mod bootstrap;
pub mod channels;
pub mod cln;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod graph;
pub mod lifecycle;
pub mod lnd;
pub mod peers;
pub mod ping;
pub mod supervisor;
pub mod vector;

#[cfg(test)]
mod test_support;

pub use bootstrap::bootstrap_cache;
pub use config::ServicesConfig;
pub use context::ServiceContext;
pub use events::{EventBus, TorqEvent};
pub use supervisor::{ServiceLauncher, Supervisor, SupervisorLoop, TorqServiceLauncher};
