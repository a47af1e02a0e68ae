//! In-memory chain used by the unit tests.
//!
//! Decodes signed raw transactions, keeps per-account nonces and simulates
//! the slice of the ProvNFT contract the operator drives: payment splitter
//! balances, mint fee, minting, fee payment and pausing.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::abi::{self, ParamType, Token};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, Bytes, Log, NameOrAddress, TransactionReceipt, TransactionRequest, H256, U256, U64,
};
use ethers::utils::rlp::Rlp;

use crate::errors::{OperatorError, Result};
use crate::events::{self, signature_topic};
use crate::provnft::ProvNftCall;
use crate::rpc::Chain;

/// Well-known first hardhat/anvil development key.
pub const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const CHAIN_ID: u64 = 1337;

pub fn provnft_address() -> Address {
    Address::from_low_u64_be(0x0f0f_0f0f)
}

/// The single account the fake node signs for.
pub fn node_account() -> Address {
    Address::from_low_u64_be(0x0a0a)
}

/// A transaction the fake accepted for broadcast.
#[derive(Debug, Clone)]
pub struct SentTx {
    pub hash: H256,
    pub from: Address,
    pub to: Option<Address>,
    pub gas_price: U256,
    pub gas: U256,
    pub value: U256,
    pub nonce: U256,
    pub data: Bytes,
    pub signed_locally: bool,
}

#[derive(Default)]
struct State {
    gas_price: U256,
    nonces: HashMap<Address, U256>,
    broadcasts: Vec<SentTx>,
    receipts: HashMap<H256, TransactionReceipt>,
    fail_next_receipt: bool,
    releasable: HashMap<Address, U256>,
    released: HashMap<Address, U256>,
    total_released: U256,
    mint_fee: U256,
    paused: bool,
    next_token_id: u64,
}

struct Outcome {
    logs: Vec<Log>,
    contract_address: Option<Address>,
}

pub struct FakeChain {
    state: Mutex<State>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                gas_price: U256::from(2_000_000_000u64),
                next_token_id: 1,
                ..Default::default()
            }),
        }
    }

    pub fn set_gas_price(&self, price: U256) {
        self.state.lock().unwrap().gas_price = price;
    }

    pub fn set_releasable(&self, payee: Address, amount: U256) {
        self.state.lock().unwrap().releasable.insert(payee, amount);
    }

    pub fn set_mint_fee(&self, fee: U256) {
        self.state.lock().unwrap().mint_fee = fee;
    }

    pub fn mint_fee(&self) -> U256 {
        self.state.lock().unwrap().mint_fee
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    pub fn fail_next_receipt(&self) {
        self.state.lock().unwrap().fail_next_receipt = true;
    }

    pub fn broadcasts(&self) -> Vec<SentTx> {
        self.state.lock().unwrap().broadcasts.clone()
    }

    fn broadcast(&self, mut sent: SentTx) -> Result<H256> {
        let mut state = self.state.lock().unwrap();
        let outcome = execute(&mut state, sent.from, sent.to, &sent.data, sent.value, sent.nonce)?;

        let hash = H256::from_low_u64_be(state.broadcasts.len() as u64 + 1);
        sent.hash = hash;
        *state.nonces.entry(sent.from).or_default() += U256::one();

        let status = if std::mem::take(&mut state.fail_next_receipt) {
            U64::zero()
        } else {
            U64::one()
        };
        let receipt = TransactionReceipt {
            transaction_hash: hash,
            block_number: Some(U64::from(state.broadcasts.len() as u64 + 1)),
            from: sent.from,
            to: sent.to,
            gas_used: Some(U256::from(21_000u64)),
            status: Some(status),
            contract_address: outcome.contract_address,
            logs: outcome.logs,
            ..Default::default()
        };
        state.receipts.insert(hash, receipt);
        state.broadcasts.push(sent);
        Ok(hash)
    }
}

fn to_address(to: Option<&NameOrAddress>) -> Option<Address> {
    match to {
        Some(NameOrAddress::Address(a)) => Some(*a),
        _ => None,
    }
}

fn revert(reason: &str) -> OperatorError {
    OperatorError::TransactionReverted(reason.to_string())
}

fn log(topics: Vec<H256>, tokens: &[Token]) -> Log {
    Log {
        address: provnft_address(),
        topics,
        data: abi::encode(tokens).into(),
        ..Default::default()
    }
}

fn uint_topic(value: u64) -> H256 {
    let mut buf = [0u8; 32];
    U256::from(value).to_big_endian(&mut buf);
    H256::from(buf)
}

fn args(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>> {
    Ok(abi::decode(types, &data[4..])?)
}

fn selector_of(call: ProvNftCall) -> [u8; 4] {
    call.selector()
}

/// Apply a transaction to the simulated contract state.
fn execute(
    state: &mut State,
    from: Address,
    to: Option<Address>,
    data: &[u8],
    value: U256,
    nonce: U256,
) -> Result<Outcome> {
    let Some(to) = to else {
        return Ok(Outcome {
            logs: vec![],
            contract_address: Some(ethers::utils::get_contract_address(from, nonce)),
        });
    };
    if to != provnft_address() || data.len() < 4 {
        return Ok(Outcome {
            logs: vec![],
            contract_address: None,
        });
    }

    let selector: [u8; 4] = [data[0], data[1], data[2], data[3]];
    let zero = Address::zero();
    let mut logs = Vec::new();

    if selector == selector_of(ProvNftCall::Release { payee: zero }) {
        let payee = match args(&[ParamType::Address], data)?.pop() {
            Some(Token::Address(a)) => a,
            _ => return Err(revert("bad release argument")),
        };
        let amount = state.releasable.remove(&payee).unwrap_or_default();
        if amount.is_zero() {
            return Err(revert("PaymentSplitter: account is not due payment"));
        }
        *state.released.entry(payee).or_default() += amount;
        state.total_released += amount;
        logs.push(log(
            vec![signature_topic(events::PAYMENT_RELEASED)],
            &[Token::Address(payee), Token::Uint(amount)],
        ));
    } else if selector == selector_of(ProvNftCall::SetMintFee { fee: U256::zero() }) {
        if let Some(Token::Uint(fee)) = args(&[ParamType::Uint(256)], data)?.pop() {
            state.mint_fee = fee;
        }
    } else if selector == selector_of(ProvNftCall::Mint { uri: String::new() }) {
        if state.paused {
            return Err(revert("Pausable: paused"));
        }
        if value < state.mint_fee {
            return Err(revert("Insufficient payment"));
        }
        let uri = match args(&[ParamType::String], data)?.pop() {
            Some(Token::String(s)) => s,
            _ => return Err(revert("bad mint argument")),
        };
        let id = state.next_token_id;
        state.next_token_id += 1;
        logs.push(log(
            vec![
                signature_topic(events::TRANSFER_SINGLE),
                H256::from(from),
                H256::zero(),
                H256::from(from),
            ],
            &[Token::Uint(id.into()), Token::Uint(U256::one())],
        ));
        logs.push(log(
            vec![signature_topic(events::URI), uint_topic(id)],
            &[Token::String(uri)],
        ));
    } else if selector
        == selector_of(ProvNftCall::MintBatch {
            amount: U256::zero(),
            uris: vec![],
        })
    {
        if state.paused {
            return Err(revert("Pausable: paused"));
        }
        let mut tokens = args(
            &[
                ParamType::Uint(256),
                ParamType::Array(Box::new(ParamType::String)),
            ],
            data,
        )?;
        let uris = match tokens.pop() {
            Some(Token::Array(items)) => items,
            _ => return Err(revert("bad mintBatch argument")),
        };
        let amount = match tokens.pop() {
            Some(Token::Uint(a)) => a.as_u64(),
            _ => return Err(revert("bad mintBatch argument")),
        };
        if value < state.mint_fee * U256::from(amount) {
            return Err(revert("Insufficient payment"));
        }
        let mut ids = Vec::new();
        for uri in uris.into_iter().take(amount as usize) {
            let id = state.next_token_id;
            state.next_token_id += 1;
            ids.push(Token::Uint(id.into()));
            logs.push(log(vec![signature_topic(events::URI), uint_topic(id)], &[uri]));
        }
        let ones = vec![Token::Uint(U256::one()); ids.len()];
        logs.push(log(
            vec![
                signature_topic(events::TRANSFER_BATCH),
                H256::from(from),
                H256::zero(),
                H256::from(from),
            ],
            &[Token::Array(ids), Token::Array(ones)],
        ));
    } else if selector
        == selector_of(ProvNftCall::ImageGenerationPayment {
            amount: U256::zero(),
        })
    {
        let amount = match args(&[ParamType::Uint(256)], data)?.pop() {
            Some(Token::Uint(a)) => a,
            _ => return Err(revert("bad payment argument")),
        };
        if value != amount {
            return Err(revert("Incorrect payment amount"));
        }
        logs.push(log(
            vec![signature_topic(events::PAY_FEE)],
            &[Token::Address(from), Token::Uint(amount)],
        ));
    } else if selector == selector_of(ProvNftCall::Pause) {
        state.paused = true;
        logs.push(log(vec![signature_topic(events::PAUSED)], &[Token::Address(from)]));
    } else if selector == selector_of(ProvNftCall::Unpause) {
        state.paused = false;
        logs.push(log(vec![signature_topic(events::UNPAUSED)], &[Token::Address(from)]));
    }

    Ok(Outcome {
        logs,
        contract_address: None,
    })
}

#[async_trait]
impl Chain for FakeChain {
    async fn chain_id(&self) -> Result<u64> {
        Ok(CHAIN_ID)
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(vec![node_account()])
    }

    async fn gas_price(&self) -> Result<U256> {
        Ok(self.state.lock().unwrap().gas_price)
    }

    async fn transaction_count(&self, address: Address) -> Result<U256> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .nonces
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<U256> {
        Ok(U256::from(100_000u64))
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes> {
        let state = self.state.lock().unwrap();
        let data = tx.data.clone().unwrap_or_default();
        if data.len() < 4 {
            return Ok(Bytes::default());
        }
        let payee = match abi::decode(&[ParamType::Address], &data[4..]) {
            Ok(mut tokens) => match tokens.pop() {
                Some(Token::Address(a)) => a,
                _ => Address::zero(),
            },
            Err(_) => Address::zero(),
        };
        let zero = Address::zero();
        let selector = &data[..4];
        let value = if selector == selector_of(ProvNftCall::Releasable { payee: zero }) {
            state.releasable.get(&payee).copied().unwrap_or_default()
        } else if selector == selector_of(ProvNftCall::Released { payee: zero }) {
            state.released.get(&payee).copied().unwrap_or_default()
        } else if selector == selector_of(ProvNftCall::TotalReleased) {
            state.total_released
        } else {
            return Ok(Bytes::default());
        };
        Ok(abi::encode(&[Token::Uint(value)]).into())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256> {
        let (mut typed, signature) = TypedTransaction::decode_signed(&Rlp::new(&raw))
            .map_err(|e| OperatorError::InvalidInput(format!("undecodable raw tx: {e}")))?;
        // EIP-155: the sighash commits to the chain id.
        typed.set_chain_id(CHAIN_ID);
        let from = signature
            .recover(typed.sighash())
            .map_err(|e| OperatorError::InvalidInput(format!("bad signature: {e}")))?;

        self.broadcast(SentTx {
            hash: H256::zero(),
            from,
            to: to_address(typed.to()),
            gas_price: typed.gas_price().unwrap_or_default(),
            gas: typed.gas().copied().unwrap_or_default(),
            value: typed.value().copied().unwrap_or_default(),
            nonce: typed.nonce().copied().unwrap_or_default(),
            data: typed.data().cloned().unwrap_or_default(),
            signed_locally: true,
        })
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<H256> {
        self.broadcast(SentTx {
            hash: H256::zero(),
            from: tx.from.unwrap_or_default(),
            to: to_address(tx.to.as_ref()),
            gas_price: tx.gas_price.unwrap_or_default(),
            gas: tx.gas.unwrap_or_default(),
            value: tx.value.unwrap_or_default(),
            nonce: tx.nonce.unwrap_or_default(),
            data: tx.data.clone().unwrap_or_default(),
            signed_locally: false,
        })
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>> {
        Ok(self.state.lock().unwrap().receipts.get(&hash).cloned())
    }
}
