//! Events emitted by the ProvNFT contract, decoded from receipt logs.
//!
//! The event signatures follow the ERC-1155 standard (`TransferSingle`,
//! `TransferBatch`, `URI`), OpenZeppelin's `PaymentSplitter` and `Pausable`,
//! and the contract's own `PayFee`.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Log, TransactionReceipt, H256, U256};
use ethers::utils::keccak256;
use serde::Serialize;

use crate::errors::{OperatorError, Result};

pub const TRANSFER_SINGLE: &str = "TransferSingle(address,address,address,uint256,uint256)";
pub const TRANSFER_BATCH: &str = "TransferBatch(address,address,address,uint256[],uint256[])";
pub const URI: &str = "URI(string,uint256)";
pub const PAYMENT_RELEASED: &str = "PaymentReleased(address,uint256)";
pub const PAYMENT_RECEIVED: &str = "PaymentReceived(address,uint256)";
pub const PAY_FEE: &str = "PayFee(address,uint256)";
pub const PAUSED: &str = "Paused(address)";
pub const UNPAUSED: &str = "Unpaused(address)";

/// All recognised event kinds from the ProvNFT contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TransferSingle,
    TransferBatch,
    Uri,
    PaymentReleased,
    PaymentReceived,
    PayFee,
    Paused,
    Unpaused,
    /// A log from this contract that we don't recognise.
    Unknown,
}

impl EventKind {
    const ALL: [(EventKind, &'static str); 8] = [
        (EventKind::TransferSingle, TRANSFER_SINGLE),
        (EventKind::TransferBatch, TRANSFER_BATCH),
        (EventKind::Uri, URI),
        (EventKind::PaymentReleased, PAYMENT_RELEASED),
        (EventKind::PaymentReceived, PAYMENT_RECEIVED),
        (EventKind::PayFee, PAY_FEE),
        (EventKind::Paused, PAUSED),
        (EventKind::Unpaused, UNPAUSED),
    ];

    /// Match the first log topic (the event signature hash).
    pub fn from_topic(topic: &H256) -> Self {
        Self::ALL
            .iter()
            .find(|(_, signature)| signature_topic(signature) == *topic)
            .map(|(kind, _)| *kind)
            .unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransferSingle => "TransferSingle",
            Self::TransferBatch => "TransferBatch",
            Self::Uri => "URI",
            Self::PaymentReleased => "PaymentReleased",
            Self::PaymentReceived => "PaymentReceived",
            Self::PayFee => "PayFee",
            Self::Paused => "Paused",
            Self::Unpaused => "Unpaused",
            Self::Unknown => "Unknown",
        }
    }
}

pub fn signature_topic(signature: &str) -> H256 {
    H256::from(keccak256(signature.as_bytes()))
}

/// A decoded ProvNFT event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProvNftEvent {
    TransferSingle {
        operator: Address,
        from: Address,
        to: Address,
        id: U256,
        value: U256,
    },
    TransferBatch {
        operator: Address,
        from: Address,
        to: Address,
        ids: Vec<U256>,
        values: Vec<U256>,
    },
    Uri {
        value: String,
        id: U256,
    },
    PaymentReleased {
        to: Address,
        amount: U256,
    },
    PaymentReceived {
        from: Address,
        amount: U256,
    },
    PayFee {
        sender: Address,
        amount: U256,
    },
    Paused {
        account: Address,
    },
    Unpaused {
        account: Address,
    },
    Unknown {
        topic: Option<H256>,
    },
}

impl ProvNftEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::TransferSingle { .. } => EventKind::TransferSingle,
            Self::TransferBatch { .. } => EventKind::TransferBatch,
            Self::Uri { .. } => EventKind::Uri,
            Self::PaymentReleased { .. } => EventKind::PaymentReleased,
            Self::PaymentReceived { .. } => EventKind::PaymentReceived,
            Self::PayFee { .. } => EventKind::PayFee,
            Self::Paused { .. } => EventKind::Paused,
            Self::Unpaused { .. } => EventKind::Unpaused,
            Self::Unknown { .. } => EventKind::Unknown,
        }
    }
}

/// Decode the logs `contract` emitted in a receipt. Logs from other
/// contracts, and logs that fail to decode, are skipped.
pub fn decode_receipt(receipt: &TransactionReceipt, contract: Address) -> Vec<ProvNftEvent> {
    receipt
        .logs
        .iter()
        .filter(|log| log.address == contract)
        .filter_map(|log| decode_log(log).ok())
        .collect()
}

pub fn decode_log(log: &Log) -> Result<ProvNftEvent> {
    let Some(first) = log.topics.first() else {
        return Ok(ProvNftEvent::Unknown { topic: None });
    };
    let data = &log.data[..];

    let event = match EventKind::from_topic(first) {
        EventKind::TransferSingle => {
            let mut values = decode_data(&[ParamType::Uint(256), ParamType::Uint(256)], data)?;
            ProvNftEvent::TransferSingle {
                operator: indexed_address(log, 1)?,
                from: indexed_address(log, 2)?,
                to: indexed_address(log, 3)?,
                id: take_uint(&mut values)?,
                value: take_uint(&mut values)?,
            }
        }
        EventKind::TransferBatch => {
            let array = ParamType::Array(Box::new(ParamType::Uint(256)));
            let mut values = decode_data(&[array.clone(), array], data)?;
            ProvNftEvent::TransferBatch {
                operator: indexed_address(log, 1)?,
                from: indexed_address(log, 2)?,
                to: indexed_address(log, 3)?,
                ids: take_uint_array(&mut values)?,
                values: take_uint_array(&mut values)?,
            }
        }
        EventKind::Uri => {
            let mut values = decode_data(&[ParamType::String], data)?;
            let value = match values.pop() {
                Some(Token::String(s)) => s,
                other => return Err(malformed("URI", other)),
            };
            ProvNftEvent::Uri {
                value,
                id: indexed_uint(log, 1)?,
            }
        }
        EventKind::PaymentReleased => {
            let (to, amount) = decode_address_amount(data)?;
            ProvNftEvent::PaymentReleased { to, amount }
        }
        EventKind::PaymentReceived => {
            let (from, amount) = decode_address_amount(data)?;
            ProvNftEvent::PaymentReceived { from, amount }
        }
        EventKind::PayFee => {
            let (sender, amount) = decode_address_amount(data)?;
            ProvNftEvent::PayFee { sender, amount }
        }
        EventKind::Paused => ProvNftEvent::Paused {
            account: decode_single_address(data)?,
        },
        EventKind::Unpaused => ProvNftEvent::Unpaused {
            account: decode_single_address(data)?,
        },
        EventKind::Unknown => ProvNftEvent::Unknown {
            topic: Some(*first),
        },
    };
    Ok(event)
}

// ─────────────────────────────────────────────────────────
// Field helpers
// ─────────────────────────────────────────────────────────

/// Decode non-indexed data; tokens come back reversed so callers can `pop`
/// them in declaration order.
fn decode_data(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>> {
    let mut tokens = abi::decode(types, data)?;
    tokens.reverse();
    Ok(tokens)
}

fn decode_address_amount(data: &[u8]) -> Result<(Address, U256)> {
    let mut values = decode_data(&[ParamType::Address, ParamType::Uint(256)], data)?;
    let address = match values.pop() {
        Some(Token::Address(a)) => a,
        other => return Err(malformed("address", other)),
    };
    Ok((address, take_uint(&mut values)?))
}

fn decode_single_address(data: &[u8]) -> Result<Address> {
    match decode_data(&[ParamType::Address], data)?.pop() {
        Some(Token::Address(a)) => Ok(a),
        other => Err(malformed("address", other)),
    }
}

fn take_uint(values: &mut Vec<Token>) -> Result<U256> {
    match values.pop() {
        Some(Token::Uint(v)) => Ok(v),
        other => Err(malformed("uint256", other)),
    }
}

fn take_uint_array(values: &mut Vec<Token>) -> Result<Vec<U256>> {
    match values.pop() {
        Some(Token::Array(items)) => items
            .into_iter()
            .map(|t| match t {
                Token::Uint(v) => Ok(v),
                other => Err(malformed("uint256[] item", Some(other))),
            })
            .collect(),
        other => Err(malformed("uint256[]", other)),
    }
}

fn indexed_topic(log: &Log, index: usize) -> Result<H256> {
    log.topics.get(index).copied().ok_or_else(|| {
        OperatorError::InvalidInput(format!("log is missing indexed topic {index}"))
    })
}

fn indexed_address(log: &Log, index: usize) -> Result<Address> {
    indexed_topic(log, index).map(Address::from)
}

fn indexed_uint(log: &Log, index: usize) -> Result<U256> {
    indexed_topic(log, index).map(|t| U256::from_big_endian(t.as_bytes()))
}

fn malformed(what: &str, got: Option<Token>) -> OperatorError {
    OperatorError::InvalidInput(format!("malformed event field {what}: {got:?}"))
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
