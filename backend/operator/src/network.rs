//! Deployment targets and their endpoint conventions.

use crate::errors::{OperatorError, Result};

pub const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";
pub const MUMBAI_GAS_STATION_URL: &str = "https://gasstation-testnet.polygon.technology/v2";
pub const POLYGON_GAS_STATION_URL: &str = "https://gasstation.polygon.technology/v2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// Local ganache node.
    Ganache,
    /// Local hardhat / test node.
    Test,
    Goerli,
    Mumbai,
    Polygon,
}

impl Network {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ganache" => Ok(Self::Ganache),
            "test" | "hardhat" | "development" => Ok(Self::Test),
            "goerli" => Ok(Self::Goerli),
            "mumbai" => Ok(Self::Mumbai),
            "polygon" => Ok(Self::Polygon),
            _ => Err(OperatorError::UnsupportedNetwork(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ganache => "ganache",
            Self::Test => "test",
            Self::Goerli => "goerli",
            Self::Mumbai => "mumbai",
            Self::Polygon => "polygon",
        }
    }

    /// Chain id the public networks are expected to report. Local nodes
    /// pick their own.
    pub fn expected_chain_id(&self) -> Option<u64> {
        match self {
            Self::Ganache | Self::Test => None,
            Self::Goerli => Some(5),
            Self::Mumbai => Some(80001),
            Self::Polygon => Some(137),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Ganache | Self::Test)
    }

    /// Build the node endpoint from the provider key the network needs.
    ///
    /// `api_key` is the Infura project secret for goerli and the Alchemy key
    /// for the polygon networks; local networks ignore it.
    pub fn rpc_url(&self, api_key: Option<&str>) -> Result<String> {
        if self.is_local() {
            return Ok(LOCAL_RPC_URL.to_string());
        }
        let key = api_key.filter(|k| !k.is_empty()).ok_or_else(|| {
            OperatorError::Config(format!(
                "no RPC_URL and no provider key configured for {}",
                self.as_str()
            ))
        })?;
        Ok(match self {
            Self::Goerli => format!("https://goerli.infura.io/v3/{key}"),
            Self::Mumbai => format!("https://polygon-mumbai.g.alchemy.com/v2/{key}"),
            Self::Polygon => format!("https://polygon-mainnet.g.alchemy.com/v2/{key}"),
            Self::Ganache | Self::Test => unreachable!("local networks handled above"),
        })
    }

    /// Environment variable holding the provider key for this network.
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            Self::Ganache | Self::Test => None,
            Self::Goerli => Some("INFURA_PROJECT_SECRET"),
            Self::Mumbai => Some("ALCHEMY_API_KEY_MUMBAI"),
            Self::Polygon => Some("ALCHEMY_API_KEY_POLY"),
        }
    }

    pub fn default_gas_station_url(&self) -> Option<&'static str> {
        match self {
            Self::Mumbai => Some(MUMBAI_GAS_STATION_URL),
            Self::Polygon => Some(POLYGON_GAS_STATION_URL),
            _ => None,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
