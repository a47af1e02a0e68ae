//! ProvNFT operations: payouts, mint fee administration, minting and
//! pausing. Each write is exactly one transaction through the [`Dispatcher`].

use ethers::types::{Address, TransactionReceipt, U256};
use ethers::utils::{format_ether, to_checksum};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dispatcher::{Dispatcher, Sender, TxOverrides};
use crate::errors::{OperatorError, Result};
use crate::events::{decode_receipt, ProvNftEvent};
use crate::provnft::{batch_metadata_uris, calculate_fee, decode_uint, ProvNftCall};

// ─────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────

async fn read_uint(dispatcher: &Dispatcher<'_>, contract: Address, call: ProvNftCall) -> Result<U256> {
    let output = dispatcher.call(contract, call.encode()).await?;
    decode_uint(&output)
}

pub async fn releasable(dispatcher: &Dispatcher<'_>, contract: Address, payee: Address) -> Result<U256> {
    read_uint(dispatcher, contract, ProvNftCall::Releasable { payee }).await
}

pub async fn released(dispatcher: &Dispatcher<'_>, contract: Address, payee: Address) -> Result<U256> {
    read_uint(dispatcher, contract, ProvNftCall::Released { payee }).await
}

pub async fn total_released(dispatcher: &Dispatcher<'_>, contract: Address) -> Result<U256> {
    read_uint(dispatcher, contract, ProvNftCall::TotalReleased).await
}

/// Splitter balances for one payee, in wei.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutInfo {
    pub total_released: U256,
    pub released: U256,
    pub releasable: U256,
}

pub async fn payout_info(
    dispatcher: &Dispatcher<'_>,
    contract: Address,
    payee: Address,
) -> Result<PayoutInfo> {
    let info = PayoutInfo {
        total_released: total_released(dispatcher, contract).await?,
        released: released(dispatcher, contract, payee).await?,
        releasable: releasable(dispatcher, contract, payee).await?,
    };
    info!("Amount already released by the contract: {} ETH", format_ether(info.total_released));
    info!("Amount already released to payee: {} ETH", format_ether(info.released));
    info!("Amount releasable to payee: {} ETH", format_ether(info.releasable));
    Ok(info)
}

// ─────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────

/// Send one ProvNFT call and decode the events its receipt carries.
async fn send_call(
    dispatcher: &Dispatcher<'_>,
    contract: Address,
    sender: &Sender,
    call: ProvNftCall,
    overrides: &TxOverrides,
) -> Result<(TransactionReceipt, Vec<ProvNftEvent>)> {
    debug!(
        "Calling {}() [0x{}] on {contract:?}",
        call.name(),
        hex::encode(call.selector())
    );
    let receipt = dispatcher
        .send(Some(contract), call.encode(), sender, overrides)
        .await?;

    let events = decode_receipt(&receipt, contract);
    for event in &events {
        info!("Event {}: {}", event.kind().as_str(), serde_json::to_string(event)?);
    }
    Ok((receipt, events))
}

#[derive(Debug, Clone)]
pub struct Withdrawal {
    /// Amount paid out by this transaction.
    pub amount: U256,
    /// Cumulative amount released to the payee after this transaction.
    pub released_total: U256,
    pub receipt: TransactionReceipt,
}

/// Release the payee's pending share of the collected fees.
///
/// Refuses to broadcast when nothing is releasable, so a repeated run after
/// a successful withdrawal fails instead of spending gas on a revert.
pub async fn withdraw(
    dispatcher: &Dispatcher<'_>,
    contract: Address,
    payee: Address,
    sender: &Sender,
) -> Result<Withdrawal> {
    let amount = releasable(dispatcher, contract, payee).await?;
    if amount.is_zero() {
        return Err(OperatorError::NothingReleasable(to_checksum(&payee, None)));
    }
    if sender.address() != payee {
        warn!(
            "Sender {:?} is not the payee; funds still go to {:?}",
            sender.address(),
            payee
        );
    }

    let (receipt, events) = send_call(
        dispatcher,
        contract,
        sender,
        ProvNftCall::Release { payee },
        &TxOverrides::default(),
    )
    .await?;

    let paid = events
        .iter()
        .find_map(|e| match e {
            ProvNftEvent::PaymentReleased { to, amount } if *to == payee => Some(*amount),
            _ => None,
        })
        .unwrap_or(amount);
    if paid != amount {
        warn!("Released {paid} wei but {amount} wei was releasable before the call");
    }

    let released_total = released(dispatcher, contract, payee).await?;

    Ok(Withdrawal {
        amount: paid,
        released_total,
        receipt,
    })
}

pub async fn set_mint_fee(
    dispatcher: &Dispatcher<'_>,
    contract: Address,
    sender: &Sender,
    fee: U256,
) -> Result<Vec<ProvNftEvent>> {
    let (_, events) = send_call(
        dispatcher,
        contract,
        sender,
        ProvNftCall::SetMintFee { fee },
        &TxOverrides::default(),
    )
    .await?;
    info!("Mint fee successfully reset to {fee} wei");
    Ok(events)
}

pub async fn mint(
    dispatcher: &Dispatcher<'_>,
    contract: Address,
    sender: &Sender,
    uri: String,
    fee: U256,
) -> Result<Vec<ProvNftEvent>> {
    let (_, events) = send_call(
        dispatcher,
        contract,
        sender,
        ProvNftCall::Mint { uri },
        &TxOverrides::with_value(fee),
    )
    .await?;
    Ok(events)
}

pub async fn mint_batch(
    dispatcher: &Dispatcher<'_>,
    contract: Address,
    sender: &Sender,
    amount: u64,
    start_id: u64,
    uri_prefix: &str,
    fee_per_token: U256,
) -> Result<Vec<ProvNftEvent>> {
    if amount == 0 {
        return Err(OperatorError::InvalidInput(
            "mint amount must be positive".to_string(),
        ));
    }
    let overrides = TxOverrides::with_value(calculate_fee(fee_per_token, amount)?);
    let call = ProvNftCall::MintBatch {
        amount: U256::from(amount),
        uris: batch_metadata_uris(uri_prefix, start_id, amount)?,
    };
    let (_, events) = send_call(dispatcher, contract, sender, call, &overrides).await?;
    Ok(events)
}

/// Pay for an image generation; the contract requires `value == amount`.
pub async fn pay_fee(
    dispatcher: &Dispatcher<'_>,
    contract: Address,
    sender: &Sender,
    amount: U256,
) -> Result<Vec<ProvNftEvent>> {
    let (_, events) = send_call(
        dispatcher,
        contract,
        sender,
        ProvNftCall::ImageGenerationPayment { amount },
        &TxOverrides::with_value(amount),
    )
    .await?;
    Ok(events)
}

pub async fn set_paused(
    dispatcher: &Dispatcher<'_>,
    contract: Address,
    sender: &Sender,
    paused: bool,
) -> Result<Vec<ProvNftEvent>> {
    let call = if paused {
        ProvNftCall::Pause
    } else {
        ProvNftCall::Unpause
    };
    let (_, events) = send_call(dispatcher, contract, sender, call, &TxOverrides::default()).await?;
    info!("Contract {}", if paused { "paused" } else { "unpaused" });
    Ok(events)
}
