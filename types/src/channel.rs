use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Timestamp,
    errors::{Result, TypesError},
    int_enum,
};

/// Status of a Lightning channel.
///
/// The variants are ordered by lifecycle: `Opening < Open < Closing < <any closed variant>`.
/// All closed variants share the same rank, a closed channel never changes its status again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChannelStatus {
    #[default]
    Opening,
    Open,
    Closing,
    CooperativeClosed,
    LocalForceClosed,
    RemoteForceClosed,
    BreachClosed,
    FundingCancelledClosed,
    AbandonedClosed,
}

int_enum!(ChannelStatus {
    Opening = 0,
    Open = 1,
    Closing = 2,
    CooperativeClosed = 100,
    LocalForceClosed = 101,
    RemoteForceClosed = 102,
    BreachClosed = 103,
    FundingCancelledClosed = 104,
    AbandonedClosed = 105,
});

impl ChannelStatus {
    /// Lifecycle rank of the status.
    pub fn rank(&self) -> u8 {
        match self {
            ChannelStatus::Opening => 0,
            ChannelStatus::Open => 1,
            ChannelStatus::Closing => 2,
            _ => 3,
        }
    }

    /// Returns `true` for every closed variant.
    pub fn is_closed(&self) -> bool {
        self.rank() == 3
    }

    /// Returns `true` for `Closing` and every closed variant.
    pub fn is_closing_or_later(&self) -> bool {
        self.rank() >= 2
    }

    /// Returns `true` if a channel with this status may move to `next`.
    ///
    /// Staying in the same status is always allowed. Moving backwards is never allowed,
    /// and a closed channel cannot switch to another closed variant either.
    pub fn can_transition_to(&self, next: ChannelStatus) -> bool {
        if *self == next {
            return true;
        }
        !self.is_closed() && next.rank() > self.rank()
    }
}

/// Bitmap of authoritative channel facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChannelFlags(pub u32);

impl ChannelFlags {
    /// Funding block height and time come from the block explorer.
    pub const FUNDED_ON: ChannelFlags = ChannelFlags(1);
    /// Closing block height and time come from the block explorer.
    pub const CLOSED_ON: ChannelFlags = ChannelFlags(1 << 1);

    pub fn contains(&self, other: ChannelFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn add(&mut self, other: ChannelFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ChannelFlags) {
        self.0 &= !other.0;
    }
}

/// The funding outpoint of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChannelPoint {
    pub funding_transaction_hash: String,
    pub funding_output_index: u32,
}

impl ChannelPoint {
    pub fn new(funding_transaction_hash: impl Into<String>, funding_output_index: u32) -> Self {
        Self {
            funding_transaction_hash: funding_transaction_hash.into(),
            funding_output_index,
        }
    }
}

impl Display for ChannelPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.funding_transaction_hash, self.funding_output_index)
    }
}

impl FromStr for ChannelPoint {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        let (hash, index) = s
            .rsplit_once(':')
            .ok_or_else(|| TypesError::InvalidChannelPoint(s.to_string()))?;

        if hash.len() != 64 || hex::decode(hash).is_err() {
            return Err(TypesError::InvalidChannelPoint(s.to_string()));
        }

        let funding_output_index = index
            .parse::<u32>()
            .map_err(|_| TypesError::InvalidChannelPoint(s.to_string()))?;

        Ok(Self::new(hash, funding_output_index))
    }
}

/// Location of a confirmed channel funding output in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShortChannelId {
    pub block_height: u32,
    pub tx_index: u32,
    pub output_index: u16,
}

impl ShortChannelId {
    const MAX_TX_INDEX: u32 = (1 << 24) - 1;

    /// Decodes LND's packed 64-bit representation (`block << 40 | tx << 16 | output`).
    pub fn from_lnd(value: u64) -> Self {
        Self {
            block_height: (value >> 40) as u32,
            tx_index: ((value >> 16) & 0xFF_FFFF) as u32,
            output_index: (value & 0xFFFF) as u16,
        }
    }

    /// Encodes into LND's packed 64-bit representation.
    pub fn to_lnd(&self) -> u64 {
        (u64::from(self.block_height) << 40) | (u64::from(self.tx_index) << 16) | u64::from(self.output_index)
    }
}

impl Display for ShortChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.block_height, self.tx_index, self.output_index)
    }
}

impl FromStr for ShortChannelId {
    type Err = TypesError;

    /// Parses `<block>x<tx>x<output>`; CLN's `:` separator is accepted as well.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || TypesError::InvalidShortChannelId(s.to_string());
        let separator = if s.contains('x') { 'x' } else { ':' };

        let mut parts = s.split(separator);
        let (Some(block), Some(tx), Some(output), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let block_height = block.parse::<u32>().map_err(|_| invalid())?;
        let tx_index = tx.parse::<u32>().map_err(|_| invalid())?;
        let output_index = output.parse::<u16>().map_err(|_| invalid())?;

        if block_height >= 1 << 24 || tx_index > Self::MAX_TX_INDEX {
            return Err(invalid());
        }

        Ok(Self {
            block_height,
            tx_index,
            output_index,
        })
    }
}

/// A Lightning channel between two nodes.
///
/// A record with `channel_id == 0` is the "unknown channel" sentinel returned by the cache.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: i64,
    pub short_channel_id: Option<String>,
    pub lnd_short_channel_id: Option<u64>,
    pub funding_transaction_hash: String,
    pub funding_output_index: u32,
    pub closing_transaction_hash: Option<String>,
    pub capacity: i64,
    pub private: bool,
    pub first_node_id: i64,
    pub second_node_id: i64,
    pub initiating_node_id: Option<i64>,
    pub accepting_node_id: Option<i64>,
    pub closing_node_id: Option<i64>,
    pub status: ChannelStatus,
    pub funding_block_height: Option<u32>,
    pub funded_on: Option<Timestamp>,
    pub closing_block_height: Option<u32>,
    pub closed_on: Option<Timestamp>,
    pub flags: ChannelFlags,
}

impl Channel {
    pub fn channel_point(&self) -> ChannelPoint {
        ChannelPoint::new(self.funding_transaction_hash.clone(), self.funding_output_index)
    }

    /// Returns the endpoint on the other side of `node_id`, if `node_id` is an endpoint.
    pub fn other_node_id(&self, node_id: i64) -> Option<i64> {
        if self.first_node_id == node_id {
            Some(self.second_node_id)
        } else if self.second_node_id == node_id {
            Some(self.first_node_id)
        } else {
            None
        }
    }

    pub fn has_endpoint(&self, node_id: i64) -> bool {
        self.other_node_id(node_id).is_some()
    }

    pub fn validate_endpoints(&self) -> Result<()> {
        if self.first_node_id == self.second_node_id {
            return Err(TypesError::SameChannelEndpoints(self.first_node_id));
        }
        Ok(())
    }
}
