use serde::{Deserialize, Serialize};

use crate::int_enum;

/// Family of corridors. Every type owns an independent rule set and default flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorridorType {
    Tag,
    AutoFee,
}

int_enum!(CorridorType { Tag = 1, AutoFee = 2 });

impl CorridorType {
    pub const ALL: [CorridorType; 2] = [CorridorType::Tag, CorridorType::AutoFee];

    /// Flag returned when no rule of this type matches.
    pub fn default_flag(&self) -> i32 {
        match self {
            CorridorType::Tag | CorridorType::AutoFee => 0,
        }
    }
}

/// Bits of the corridor priority. A higher bit means a more specific discriminator.
pub mod priority {
    pub const FROM_TAG: u8 = 1;
    pub const FROM_NODE: u8 = 1 << 1;
    pub const TO_TAG: u8 = 1 << 2;
    pub const TO_NODE: u8 = 1 << 3;
    pub const CHANNEL: u8 = 1 << 4;
}

/// The optional discriminators shared by corridors and corridor lookup keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CorridorDiscriminators {
    pub from_tag_id: Option<i64>,
    pub from_node_id: Option<i64>,
    pub to_tag_id: Option<i64>,
    pub to_node_id: Option<i64>,
    pub channel_id: Option<i64>,
}

impl CorridorDiscriminators {
    /// Bitmask of the discriminators that are set.
    pub fn priority(&self) -> u8 {
        let mut p = 0;
        if self.from_tag_id.is_some() {
            p |= priority::FROM_TAG;
        }
        if self.from_node_id.is_some() {
            p |= priority::FROM_NODE;
        }
        if self.to_tag_id.is_some() {
            p |= priority::TO_TAG;
        }
        if self.to_node_id.is_some() {
            p |= priority::TO_NODE;
        }
        if self.channel_id.is_some() {
            p |= priority::CHANNEL;
        }
        p
    }

    /// Compares only the discriminators selected by `priority`, with exact equality.
    pub fn matches_within(&self, query: &CorridorDiscriminators, priority: u8) -> bool {
        let check = |bit: u8, a: Option<i64>, b: Option<i64>| priority & bit == 0 || a == b;

        check(priority::FROM_TAG, self.from_tag_id, query.from_tag_id)
            && check(priority::FROM_NODE, self.from_node_id, query.from_node_id)
            && check(priority::TO_TAG, self.to_tag_id, query.to_tag_id)
            && check(priority::TO_NODE, self.to_node_id, query.to_node_id)
            && check(priority::CHANNEL, self.channel_id, query.channel_id)
    }
}

/// A precedence rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corridor {
    pub corridor_id: i64,
    pub corridor_type: CorridorType,
    pub reference_id: i64,
    pub flag: i32,
    pub inverse: bool,
    pub priority: u8,
    pub discriminators: CorridorDiscriminators,
}

impl Corridor {
    pub fn new(corridor_type: CorridorType, reference_id: i64, discriminators: CorridorDiscriminators, flag: i32) -> Self {
        Self {
            corridor_id: 0,
            corridor_type,
            reference_id,
            flag,
            inverse: false,
            priority: discriminators.priority(),
            discriminators,
        }
    }

    /// Rule returned when nothing matches.
    pub fn default_for(corridor_type: CorridorType, reference_id: i64) -> Self {
        Self {
            corridor_id: 0,
            corridor_type,
            reference_id,
            flag: corridor_type.default_flag(),
            inverse: false,
            priority: 0,
            discriminators: CorridorDiscriminators::default(),
        }
    }
}

/// Query against the corridor engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorridorKey {
    pub corridor_type: CorridorType,
    pub reference_id: i64,
    pub discriminators: CorridorDiscriminators,
}

impl CorridorKey {
    pub fn new(corridor_type: CorridorType, reference_id: i64) -> Self {
        Self {
            corridor_type,
            reference_id,
            discriminators: CorridorDiscriminators::default(),
        }
    }

    pub fn from_tag(mut self, tag_id: i64) -> Self {
        self.discriminators.from_tag_id = Some(tag_id);
        self
    }

    pub fn from_node(mut self, node_id: i64) -> Self {
        self.discriminators.from_node_id = Some(node_id);
        self
    }

    pub fn to_tag(mut self, tag_id: i64) -> Self {
        self.discriminators.to_tag_id = Some(tag_id);
        self
    }

    pub fn to_node(mut self, node_id: i64) -> Self {
        self.discriminators.to_node_id = Some(node_id);
        self
    }

    pub fn channel(mut self, channel_id: i64) -> Self {
        self.discriminators.channel_id = Some(channel_id);
        self
    }
}
