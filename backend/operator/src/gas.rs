//! Network-keyed gas price resolution.

use ethers::types::U256;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::{OperatorError, Result};
use crate::network::Network;
use crate::rpc::Chain;

/// Gas price used on local networks: 1 gwei.
pub const LOCAL_GAS_PRICE_WEI: u64 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasPolicy {
    Fixed(U256),
    /// Polygon gas station v2 endpoint.
    GasStation(String),
    /// Whatever the node reports through `eth_gasPrice`.
    Node,
}

impl GasPolicy {
    pub fn for_network(network: Network, gas_station_url: Option<&str>) -> Self {
        match network {
            Network::Ganache | Network::Test => Self::Fixed(U256::from(LOCAL_GAS_PRICE_WEI)),
            Network::Mumbai | Network::Polygon => Self::GasStation(
                gas_station_url
                    .or(network.default_gas_station_url())
                    .unwrap_or_default()
                    .to_string(),
            ),
            Network::Goerli => Self::Node,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GasStationResponse {
    standard: GasStationTier,
}

#[derive(Debug, Deserialize)]
struct GasStationTier {
    #[serde(rename = "maxFee")]
    max_fee: f64,
}

pub struct GasPriceResolver<'a> {
    http: &'a Client,
    chain: &'a dyn Chain,
    gas_station_url: Option<&'a str>,
}

impl<'a> GasPriceResolver<'a> {
    pub fn new(http: &'a Client, chain: &'a dyn Chain, gas_station_url: Option<&'a str>) -> Self {
        Self {
            http,
            chain,
            gas_station_url,
        }
    }

    /// Resolve a gas price in wei for the named network.
    pub async fn resolve(&self, network: &str) -> Result<U256> {
        self.resolve_for(Network::from_name(network)?).await
    }

    pub async fn resolve_for(&self, network: Network) -> Result<U256> {
        let price = match GasPolicy::for_network(network, self.gas_station_url) {
            GasPolicy::Fixed(price) => price,
            GasPolicy::Node => self.chain.gas_price().await?,
            GasPolicy::GasStation(url) => {
                let body: GasStationResponse = self
                    .http
                    .get(&url)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                gwei_to_wei(body.standard.max_fee)?
            }
        };
        debug!("Gas price for {network}: {price} wei");
        Ok(price)
    }
}

fn gwei_to_wei(gwei: f64) -> Result<U256> {
    if !gwei.is_finite() || gwei < 0.0 {
        return Err(OperatorError::Rpc {
            code: 0,
            message: format!("gas station returned an invalid fee: {gwei}"),
        });
    }
    Ok(U256::from((gwei * 1e9).round() as u128))
}
