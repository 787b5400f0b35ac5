use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{errors::TypesError, int_enum};

/// Block chain a node operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Chain {
    #[default]
    Bitcoin,
}

int_enum!(Chain { Bitcoin = 0 });

impl Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Chain::Bitcoin => write!(f, "bitcoin"),
        }
    }
}

impl FromStr for Chain {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bitcoin" => Ok(Chain::Bitcoin),
            other => Err(TypesError::UnknownName {
                kind: "chain",
                value: other.to_string(),
            }),
        }
    }
}

/// Network of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Network {
    #[default]
    MainNet,
    TestNet,
    RegTest,
    SigNet,
    SimNet,
}

int_enum!(Network {
    MainNet = 0,
    TestNet = 1,
    RegTest = 2,
    SigNet = 3,
    SimNet = 4,
});

impl Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Network::MainNet => "mainnet",
            Network::TestNet => "testnet",
            Network::RegTest => "regtest",
            Network::SigNet => "signet",
            Network::SimNet => "simnet",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Network {
    type Err = TypesError;

    /// Accepts both the LND (`mainnet`, `testnet`) and the CLN (`bitcoin`, `testnet`) spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "bitcoin" => Ok(Network::MainNet),
            "testnet" | "testnet3" => Ok(Network::TestNet),
            "regtest" => Ok(Network::RegTest),
            "signet" => Ok(Network::SigNet),
            "simnet" => Ok(Network::SimNet),
            other => Err(TypesError::UnknownName {
                kind: "network",
                value: other.to_string(),
            }),
        }
    }
}

/// Backing Lightning node implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Implementation {
    #[default]
    Lnd,
    Cln,
}

int_enum!(Implementation { Lnd = 0, Cln = 1 });

impl Display for Implementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Implementation::Lnd => write!(f, "LND"),
            Implementation::Cln => write!(f, "CLN"),
        }
    }
}
