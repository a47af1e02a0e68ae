//! Calldata for the ProvNFT contract methods the operator drives.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, U256};

use crate::errors::{OperatorError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvNftCall {
    Mint { uri: String },
    MintBatch { amount: U256, uris: Vec<String> },
    Release { payee: Address },
    Releasable { payee: Address },
    Released { payee: Address },
    TotalReleased,
    SetMintFee { fee: U256 },
    ImageGenerationPayment { amount: U256 },
    Pause,
    Unpause,
}

impl ProvNftCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mint { .. } => "mint",
            Self::MintBatch { .. } => "mintBatch",
            Self::Release { .. } => "release",
            Self::Releasable { .. } => "releasable",
            Self::Released { .. } => "released",
            Self::TotalReleased => "totalReleased",
            Self::SetMintFee { .. } => "setMintFee",
            Self::ImageGenerationPayment { .. } => "imageGenerationPayment",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
        }
    }

    fn param_types(&self) -> Vec<ParamType> {
        match self {
            Self::Mint { .. } => vec![ParamType::String],
            Self::MintBatch { .. } => vec![
                ParamType::Uint(256),
                ParamType::Array(Box::new(ParamType::String)),
            ],
            Self::Release { .. } | Self::Releasable { .. } | Self::Released { .. } => {
                vec![ParamType::Address]
            }
            Self::SetMintFee { .. } | Self::ImageGenerationPayment { .. } => {
                vec![ParamType::Uint(256)]
            }
            Self::TotalReleased | Self::Pause | Self::Unpause => vec![],
        }
    }

    fn tokens(&self) -> Vec<Token> {
        match self {
            Self::Mint { uri } => vec![Token::String(uri.clone())],
            Self::MintBatch { amount, uris } => vec![
                Token::Uint(*amount),
                Token::Array(uris.iter().cloned().map(Token::String).collect()),
            ],
            Self::Release { payee } | Self::Releasable { payee } | Self::Released { payee } => {
                vec![Token::Address(*payee)]
            }
            Self::SetMintFee { fee } => vec![Token::Uint(*fee)],
            Self::ImageGenerationPayment { amount } => vec![Token::Uint(*amount)],
            Self::TotalReleased | Self::Pause | Self::Unpause => vec![],
        }
    }

    pub fn selector(&self) -> [u8; 4] {
        abi::short_signature(self.name(), &self.param_types())
    }

    pub fn encode(&self) -> Bytes {
        encode_call(self.name(), &self.param_types(), &self.tokens())
    }
}

/// `selector ++ abi.encode(args)`.
pub fn encode_call(name: &str, params: &[ParamType], tokens: &[Token]) -> Bytes {
    let mut data = abi::short_signature(name, params).to_vec();
    data.extend(abi::encode(tokens));
    data.into()
}

/// Decode the single `uint256` returned by a view call.
pub fn decode_uint(output: &[u8]) -> Result<U256> {
    match abi::decode(&[ParamType::Uint(256)], output)?.pop() {
        Some(Token::Uint(value)) => Ok(value),
        other => Err(OperatorError::Rpc {
            code: 0,
            message: format!("unexpected call output: {other:?}"),
        }),
    }
}

/// Total payment for minting `amount` tokens at `fee` each.
pub fn calculate_fee(fee: U256, amount: u64) -> Result<U256> {
    fee.checked_mul(U256::from(amount)).ok_or_else(|| {
        OperatorError::InvalidInput(format!("mint fee {fee} x {amount} overflows uint256"))
    })
}

/// Metadata URIs `prefix + id` for ids `start .. start + amount`.
pub fn batch_metadata_uris(prefix: &str, start: u64, amount: u64) -> Result<Vec<String>> {
    let end = start.checked_add(amount).ok_or_else(|| {
        OperatorError::InvalidInput(format!("token ids {start} + {amount} overflow u64"))
    })?;
    Ok((start..end).map(|id| format!("{prefix}{id}")).collect())
}
