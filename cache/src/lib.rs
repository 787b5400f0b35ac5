//! In-process cache of the Torq core.
//!
//! The cache is a set of independent concurrent tables (settings, nodes, channels,
//! channel state, tag membership, service state and network information). It is
//! populated from the database at startup and kept current by the ingestion
//! pipelines and operator actions.
//!
//! Every writer replaces or mutates one record under the lock of its table entry,
//! and every reader gets a clone, so a reader never observes a partially written
//! record. Consistency across tables is not provided; callers needing it must
//! read both tables themselves.
//!
//! Cache operations never fail. Looking up an unknown key yields a zero-valued
//! record (`channel_id == 0`, `node_id == 0`) or an id of `0`.

mod channels;
mod nodes;
mod services;
mod tags;

use std::{collections::BTreeSet, sync::Arc};

use dashmap::DashMap;
use parking_lot::RwLock;
use torq_types::prelude::*;

/// Key of the per managed node channel state table.
type ChannelStateKey = (i64, i64);

#[derive(Default)]
struct Tables {
    settings: RwLock<Settings>,

    node_settings: DashMap<i64, NodeSettings>,
    node_ids_by_public_key: DashMap<(String, Chain, Network), i64>,
    node_aliases: DashMap<i64, String>,
    node_connection_details: DashMap<i64, NodeConnectionDetails>,
    wallet_balances: DashMap<i64, WalletBalance>,
    block_heights: DashMap<(Chain, Network), u32>,
    channel_peers: DashMap<i64, BTreeSet<i64>>,
    connected_peers: DashMap<i64, BTreeSet<i64>>,

    channels: DashMap<i64, Channel>,
    channel_ids_by_short_channel_id: DashMap<String, i64>,
    channel_ids_by_lnd_short_channel_id: DashMap<u64, i64>,
    channel_ids_by_channel_point: DashMap<ChannelPoint, i64>,
    channel_states: DashMap<ChannelStateKey, ChannelState>,

    service_states: DashMap<(i64, ServiceType), ServiceState>,

    tags: DashMap<i64, Tag>,
    node_tags: DashMap<i64, BTreeSet<i64>>,
    channel_tags: DashMap<i64, BTreeSet<i64>>,
}

/// Cheaply cloneable handle to the process-wide cache.
#[derive(Clone, Default)]
pub struct TorqCache {
    tables: Arc<Tables>,
}

impl std::fmt::Debug for TorqCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TorqCache")
            .field("nodes", &self.tables.node_settings.len())
            .field("channels", &self.tables.channels.len())
            .field("channel_states", &self.tables.channel_states.len())
            .field("service_states", &self.tables.service_states.len())
            .finish()
    }
}

impl TorqCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_settings(&self) -> Settings {
        self.tables.settings.read().clone()
    }

    pub fn set_settings(&self, settings: Settings) {
        *self.tables.settings.write() = settings;
    }

    /// Base URL of the block-explorer service.
    pub fn get_vector_url(&self) -> String {
        self.tables.settings.read().vector_url.clone()
    }

    /// Identifier of this installation towards external services.
    pub fn get_torq_uuid(&self) -> uuid::Uuid {
        self.tables.settings.read().torq_uuid
    }

    pub fn get_torq_version(&self) -> String {
        self.tables.settings.read().torq_version.clone()
    }
}
