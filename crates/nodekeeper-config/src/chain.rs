//! Chains the node can be configured to follow.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Chain selection passed to the node and used for its configuration section.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Chain {
    /// Production network.
    #[default]
    Main,
    /// Legacy public test network (testnet3).
    Test,
    /// Public test network, fourth generation.
    Testnet4,
    /// Signed-block test network.
    Signet,
    /// Local regression-test network.
    Regtest,
}

impl Chain {
    /// Name of the section heading for chain-specific options.
    #[must_use]
    pub const fn section(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Test => "test",
            Self::Testnet4 => "testnet4",
            Self::Signet => "signet",
            Self::Regtest => "regtest",
        }
    }

    /// Default peer-to-peer listening port for the chain.
    #[must_use]
    pub const fn p2p_port(self) -> u16 {
        match self {
            Self::Main => 8333,
            Self::Test => 18333,
            Self::Testnet4 => 48333,
            Self::Signet => 38333,
            Self::Regtest => 18444,
        }
    }
}

/// Error returned when a [`Chain`] name is not recognised.
pub type ChainParseError = strum::ParseError;
