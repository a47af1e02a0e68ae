//! Application configuration loaded from environment variables.

use crate::errors::{OperatorError, Result};
use crate::network::Network;

#[derive(Debug, Clone)]
pub struct Config {
    /// Target network (NETWORK, default `ganache`)
    pub network: Network,
    /// JSON-RPC endpoint; derived from the network and provider key unless RPC_URL is set
    pub rpc_url: String,
    /// Hex private key used for offline signing, if any
    pub private_key: Option<String>,
    /// Deployed ProvNFT contract used by `withdraw` and `info`
    pub contract_address: Option<String>,
    /// Overrides the gas station endpoint of Polygon networks
    pub gas_station_url: Option<String>,
    /// How often (in milliseconds) to poll for a transaction receipt
    pub receipt_poll_interval_ms: u64,
    /// Timeout applied to every outbound HTTP request
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let network = Network::from_name(&env_var("NETWORK").unwrap_or_else(|_| "ganache".into()))?;

        let rpc_url = match env_var("RPC_URL") {
            Ok(url) => url,
            Err(_) => {
                let key = network.api_key_var().and_then(|k| env_var(k).ok());
                network.rpc_url(key.as_deref())?
            }
        };

        // PRIVATE_KEYS is the comma separated list the hardhat config reads.
        let private_key = env_var("PRIVATE_KEY").ok().or_else(|| {
            env_var("PRIVATE_KEYS")
                .ok()
                .and_then(|keys| keys.split(',').next().map(|k| k.trim().to_string()))
                .filter(|k| !k.is_empty())
        });

        Ok(Config {
            network,
            rpc_url,
            private_key,
            contract_address: env_var("CONTRACT_ADDRESS").ok(),
            gas_station_url: env_var("GAS_STATION_URL").ok(),
            receipt_poll_interval_ms: env_var("RECEIPT_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| OperatorError::Config("Invalid RECEIPT_POLL_INTERVAL_MS".to_string()))?,
            http_timeout_secs: env_var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| OperatorError::Config("Invalid HTTP_TIMEOUT_SECS".to_string()))?,
        })
    }

    /// The configured ProvNFT address, required by commands that do not
    /// take one on the command line.
    pub fn require_contract_address(&self) -> Result<&str> {
        self.contract_address.as_deref().ok_or_else(|| {
            OperatorError::Config("CONTRACT_ADDRESS environment variable is required".to_string())
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| OperatorError::Config(format!("Missing env var: {key}")))
}
