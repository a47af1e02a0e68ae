//! Builds, signs and broadcasts one transaction, then waits for its receipt.
//!
//! Dispatch is single shot. If a broadcast succeeds but the process dies
//! before the receipt arrives, running the command again sends a second
//! transaction; callers guard against double spending by checking contract
//! state first (see `ops::withdraw`).

use std::time::Duration;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, TransactionRequest, H256, U256, U64};
use tracing::{debug, info};

use crate::errors::{OperatorError, Result};
use crate::gas::GasPriceResolver;
use crate::network::Network;
use crate::rpc::Chain;

/// Who signs a transaction.
#[derive(Debug, Clone)]
pub enum Sender {
    /// Sign offline with a raw private key.
    LocalKey(LocalWallet),
    /// Delegate signing to an account unlocked on the node.
    NodeAccount(Address),
}

impl Sender {
    pub fn from_private_key(key: &str) -> Result<Self> {
        let wallet = key
            .trim()
            .parse::<LocalWallet>()
            .map_err(|_| OperatorError::InvalidInput("invalid private key".to_string()))?;
        Ok(Self::LocalKey(wallet))
    }

    /// Pick the signer for a command: a configured private key wins, then an
    /// explicit `from` account, then the node's first unlocked account.
    pub async fn resolve(
        private_key: Option<&str>,
        from: Option<Address>,
        chain: &dyn Chain,
    ) -> Result<Self> {
        if let Some(key) = private_key {
            return Self::from_private_key(key);
        }
        if let Some(from) = from {
            return Ok(Self::NodeAccount(from));
        }
        let first = chain.accounts().await?.into_iter().next().ok_or_else(|| {
            OperatorError::Config(
                "no PRIVATE_KEY configured and the node has no unlocked accounts".to_string(),
            )
        })?;
        Ok(Self::NodeAccount(first))
    }

    pub fn address(&self) -> Address {
        match self {
            Self::LocalKey(wallet) => wallet.address(),
            Self::NodeAccount(address) => *address,
        }
    }
}

/// Optional per-transaction overrides.
#[derive(Debug, Clone, Default)]
pub struct TxOverrides {
    pub gas_price: Option<U256>,
    pub gas_limit: Option<U256>,
    pub value: Option<U256>,
    pub nonce: Option<U256>,
}

impl TxOverrides {
    pub fn with_value(value: U256) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }
}

pub struct Dispatcher<'a> {
    chain: &'a dyn Chain,
    gas: GasPriceResolver<'a>,
    network: Network,
    poll_interval: Duration,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        chain: &'a dyn Chain,
        gas: GasPriceResolver<'a>,
        network: Network,
        poll_interval: Duration,
    ) -> Self {
        Self {
            chain,
            gas,
            network,
            poll_interval,
        }
    }

    /// Read-only contract call against the latest block.
    pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let tx = TransactionRequest::new().to(to).data(data);
        self.chain.call(&tx).await
    }

    /// Submit exactly one transaction and return its confirmed receipt.
    ///
    /// `to == None` deploys `data` as contract creation code.
    pub async fn send(
        &self,
        to: Option<Address>,
        data: Bytes,
        sender: &Sender,
        overrides: &TxOverrides,
    ) -> Result<TransactionReceipt> {
        let from = sender.address();

        let gas_price = match overrides.gas_price {
            Some(price) => price,
            None => self.gas.resolve_for(self.network).await?,
        };
        let nonce = match overrides.nonce {
            Some(nonce) => nonce,
            None => self.chain.transaction_count(from).await?,
        };

        let mut tx = TransactionRequest::new()
            .from(from)
            .data(data)
            .gas_price(gas_price)
            .nonce(nonce)
            .value(overrides.value.unwrap_or_default());
        if let Some(to) = to {
            tx = tx.to(to);
        }

        let gas_limit = match overrides.gas_limit {
            Some(limit) => limit,
            None => self.chain.estimate_gas(&tx).await?,
        };
        tx = tx.gas(gas_limit);

        debug!("Dispatching from {from:?}: nonce={nonce} gas={gas_limit} gas_price={gas_price}");

        let hash = match sender {
            Sender::LocalKey(wallet) => {
                let chain_id = self.chain.chain_id().await?;
                let typed: TypedTransaction = tx.chain_id(chain_id).into();
                let signature = wallet.sign_transaction_sync(&typed)?;
                self.chain
                    .send_raw_transaction(typed.rlp_signed(&signature))
                    .await?
            }
            Sender::NodeAccount(_) => self.chain.send_transaction(&tx).await?,
        };
        info!("Transaction broadcast: {hash:?}");

        let receipt = self.wait_for_receipt(hash).await?;
        if receipt.status == Some(U64::zero()) {
            return Err(OperatorError::TransactionReverted(format!(
                "transaction {hash:?} reverted in block {:?}",
                receipt.block_number
            )));
        }
        info!(
            "Transaction {hash:?} confirmed in block {:?} (gas used: {:?})",
            receipt.block_number, receipt.gas_used
        );
        Ok(receipt)
    }

    /// Poll until the node returns a receipt. There is no deadline.
    pub async fn wait_for_receipt(&self, hash: H256) -> Result<TransactionReceipt> {
        loop {
            if let Some(receipt) = self.chain.transaction_receipt(hash).await? {
                return Ok(receipt);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
