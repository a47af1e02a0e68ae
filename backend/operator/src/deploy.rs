//! Contract deployment: ProvNFT constructor variants and the Safe-owned
//! treasury layout.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::to_checksum;
use tracing::info;

use crate::artifact::Artifact;
use crate::dispatcher::{Dispatcher, Sender, TxOverrides};
use crate::errors::{OperatorError, Result};
use crate::provnft::encode_call;
use crate::shares::{validate_accounts, PayeeList};

/// Constructor arguments, one variant per ProvNFT revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructorArgs {
    /// Contracts without constructor parameters (the Safe singleton).
    Empty,
    /// `constructor(address[] payees, uint256[] shares)`
    PayeesV1 { payees: PayeeList },
    /// `constructor(string name, string symbol, address[] payees, uint256[] shares, uint256 mintFee)`
    NamedV2 {
        name: String,
        symbol: String,
        payees: PayeeList,
        mint_fee: U256,
    },
    /// `constructor(address safe, uint256 mintFee)`; all revenue goes to a multisig.
    SafeTreasury { safe: Address, mint_fee: U256 },
}

impl ConstructorArgs {
    pub fn payees(&self) -> Option<&PayeeList> {
        match self {
            Self::PayeesV1 { payees } | Self::NamedV2 { payees, .. } => Some(payees),
            Self::Empty | Self::SafeTreasury { .. } => None,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Empty => Vec::new(),
            Self::PayeesV1 { payees } => abi::encode(&payee_tokens(payees)),
            Self::NamedV2 {
                name,
                symbol,
                payees,
                mint_fee,
            } => {
                let mut tokens = vec![Token::String(name.clone()), Token::String(symbol.clone())];
                tokens.extend(payee_tokens(payees));
                tokens.push(Token::Uint(*mint_fee));
                abi::encode(&tokens)
            }
            Self::SafeTreasury { safe, mint_fee } => {
                abi::encode(&[Token::Address(*safe), Token::Uint(*mint_fee)])
            }
        }
    }
}

fn payee_tokens(payees: &PayeeList) -> Vec<Token> {
    vec![
        Token::Array(payees.payees().into_iter().map(Token::Address).collect()),
        Token::Array(
            payees
                .shares()
                .into_iter()
                .map(|s| Token::Uint(U256::from(s)))
                .collect(),
        ),
    ]
}

/// Everything one deployment needs. Consumed by [`deploy`].
#[derive(Debug, Clone)]
pub struct DeploymentParameters {
    pub contract_name: String,
    pub bytecode: Bytes,
    pub constructor_args: ConstructorArgs,
    pub overrides: TxOverrides,
}

impl DeploymentParameters {
    pub fn from_artifact(artifact: &Artifact, constructor_args: ConstructorArgs) -> Self {
        Self {
            contract_name: artifact.contract_name.clone(),
            bytecode: artifact.bytecode.clone(),
            constructor_args,
            overrides: TxOverrides::default(),
        }
    }

    /// Creation code followed by the ABI encoded constructor arguments.
    pub fn init_code(&self) -> Bytes {
        let mut code = self.bytecode.to_vec();
        code.extend(self.constructor_args.encode());
        code.into()
    }
}

pub async fn deploy(
    dispatcher: &Dispatcher<'_>,
    sender: &Sender,
    params: DeploymentParameters,
) -> Result<Address> {
    if params.bytecode.is_empty() {
        return Err(OperatorError::InvalidInput(format!(
            "{} has no creation bytecode",
            params.contract_name
        )));
    }

    if let Some(payees) = params.constructor_args.payees() {
        info!(
            "Deploying {} with {} payee(s) over {} total shares",
            params.contract_name,
            payees.len(),
            payees.total_shares()
        );
        for (payee, share) in payees.payees().iter().zip(payees.shares()) {
            info!("  {} -> {share}", to_checksum(payee, None));
        }
    }

    let receipt = dispatcher
        .send(None, params.init_code(), sender, &params.overrides)
        .await?;
    let address = receipt.contract_address.ok_or_else(|| OperatorError::Rpc {
        code: 0,
        message: format!("receipt for {} has no contract address", params.contract_name),
    })?;

    info!(
        "{} deployed to: {}",
        params.contract_name,
        to_checksum(&address, None)
    );
    Ok(address)
}

// ─────────────────────────────────────────────────────────
// Safe + NFT
// ─────────────────────────────────────────────────────────

/// Owners and approval threshold for the multisig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeSetup {
    owners: Vec<Address>,
    threshold: u64,
}

impl SafeSetup {
    pub fn new(owners: Vec<Address>, threshold: u64) -> Result<Self> {
        if owners.is_empty() {
            return Err(OperatorError::InvalidInput(
                "a Safe needs at least one owner".to_string(),
            ));
        }
        validate_accounts(&owners, "owner")?;
        if threshold == 0 || threshold > owners.len() as u64 {
            return Err(OperatorError::InvalidInput(format!(
                "threshold {threshold} must be between 1 and {}",
                owners.len()
            )));
        }
        Ok(Self { owners, threshold })
    }

    /// `setup(owners, threshold, to, data, fallbackHandler, paymentToken, payment, paymentReceiver)`
    /// with no delegate call, fallback handler or deployment refund.
    pub fn encode(&self) -> Bytes {
        encode_call(
            "setup",
            &[
                ParamType::Array(Box::new(ParamType::Address)),
                ParamType::Uint(256),
                ParamType::Address,
                ParamType::Bytes,
                ParamType::Address,
                ParamType::Address,
                ParamType::Uint(256),
                ParamType::Address,
            ],
            &[
                Token::Array(self.owners.iter().copied().map(Token::Address).collect()),
                Token::Uint(U256::from(self.threshold)),
                Token::Address(Address::zero()),
                Token::Bytes(Vec::new()),
                Token::Address(Address::zero()),
                Token::Address(Address::zero()),
                Token::Uint(U256::zero()),
                Token::Address(Address::zero()),
            ],
        )
    }
}

/// Deploy the Safe, configure its owners, then deploy ProvNFT paying into it.
///
/// Returns `(safe, nft)`.
pub async fn deploy_safe_and_nft(
    dispatcher: &Dispatcher<'_>,
    sender: &Sender,
    safe_artifact: &Artifact,
    nft_artifact: &Artifact,
    setup: &SafeSetup,
    mint_fee: U256,
) -> Result<(Address, Address)> {
    let safe = deploy(
        dispatcher,
        sender,
        DeploymentParameters::from_artifact(safe_artifact, ConstructorArgs::Empty),
    )
    .await?;

    dispatcher
        .send(Some(safe), setup.encode(), sender, &TxOverrides::default())
        .await?;
    info!(
        "Safe configured with {} owner(s), threshold {}",
        setup.owners.len(),
        setup.threshold
    );

    let nft = deploy(
        dispatcher,
        sender,
        DeploymentParameters::from_artifact(
            nft_artifact,
            ConstructorArgs::SafeTreasury { safe, mint_fee },
        ),
    )
    .await?;

    Ok((safe, nft))
}
