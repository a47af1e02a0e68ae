//! ProvNFT operator: deploys the ERC-1155 payment splitter and runs the
//! day-to-day owner and payee operations against it.
//!
//! Every command is a single run: resolve the signer, dispatch one (or, for
//! the Safe deployment, three) transactions, log the outcome, exit.

mod artifact;
mod cli;
mod config;
mod deploy;
mod dispatcher;
mod errors;
mod events;
mod gas;
mod network;
mod ops;
mod provnft;
mod rpc;
mod shares;
#[cfg(test)]
mod testutil;

use std::time::Duration;

use ethers::utils::{format_ether, format_units};
use reqwest::Client;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use artifact::Artifact;
use cli::Command;
use config::Config;
use deploy::DeploymentParameters;
use dispatcher::{Dispatcher, Sender};
use errors::Result;
use gas::GasPriceResolver;
use network::Network;
use rpc::{Chain, RpcClient};
use shares::parse_address;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging; RUST_LOG overrides the default `info` level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args).await {
        error!(class = ?e.class(), "{e}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: &[String]) -> Result<()> {
    let command = Command::parse(args)?;

    if !command.needs_network() {
        if let Command::SaveAbi { artifact, out } = &command {
            Artifact::load(artifact)?.save_abi(out)?;
        }
        return Ok(());
    }

    let config = Config::from_env()?;
    info!("Network: {} ({})", config.network, config.rpc_url);

    let http = Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;
    let chain = RpcClient::new(http.clone(), config.rpc_url.clone());
    let gas = GasPriceResolver::new(&http, &chain, config.gas_station_url.as_deref());

    // ─── Read-only commands ───────────────────────────────
    if let Command::GasPrice { network } = &command {
        let network = network.as_deref().unwrap_or(config.network.as_str());
        let price = gas.resolve(network).await?;
        info!(
            "Gas price on {network}: {price} wei ({} gwei)",
            format_units(price, "gwei").unwrap_or_default()
        );
        return Ok(());
    }

    check_chain_id(&chain, config.network).await?;

    let dispatcher = Dispatcher::new(
        &chain,
        gas,
        config.network,
        Duration::from_millis(config.receipt_poll_interval_ms),
    );

    if let Command::Info { payee } = &command {
        let contract = parse_address(config.require_contract_address()?)?;
        ops::payout_info(&dispatcher, contract, *payee).await?;
        return Ok(());
    }

    // ─── Transactions ─────────────────────────────────────
    let from = match &command {
        Command::SetMintFee { from, .. } => Some(*from),
        _ => None,
    };
    let sender = match &command {
        Command::Withdraw { private_key, .. } => Sender::from_private_key(private_key)?,
        _ => Sender::resolve(config.private_key.as_deref(), from, &chain).await?,
    };
    info!("Sending from {:?}", sender.address());

    match command {
        Command::Deploy {
            artifact,
            constructor_args,
        } => {
            let artifact = Artifact::load(&artifact)?;
            deploy::deploy(
                &dispatcher,
                &sender,
                DeploymentParameters::from_artifact(&artifact, constructor_args),
            )
            .await?;
        }
        Command::DeploySafeAndNft {
            safe_artifact,
            nft_artifact,
            setup,
            mint_fee,
        } => {
            deploy::deploy_safe_and_nft(
                &dispatcher,
                &sender,
                &Artifact::load(&safe_artifact)?,
                &Artifact::load(&nft_artifact)?,
                &setup,
                mint_fee,
            )
            .await?;
        }
        Command::SetMintFee { contract, fee, .. } => {
            ops::set_mint_fee(&dispatcher, contract, &sender, fee).await?;
        }
        Command::Withdraw { payee, .. } => {
            let contract = parse_address(config.require_contract_address()?)?;
            let withdrawal = ops::withdraw(&dispatcher, contract, payee, &sender).await?;
            info!("₪₪₪₪₪ {} ETH withdrawn ₪₪₪₪₪", format_ether(withdrawal.amount));
            info!(
                "Total released to payee: {} ETH (tx {:?})",
                format_ether(withdrawal.released_total),
                withdrawal.receipt.transaction_hash
            );
        }
        Command::Mint { contract, uri, fee } => {
            ops::mint(&dispatcher, contract, &sender, uri, fee).await?;
        }
        Command::MintBatch {
            contract,
            amount,
            start_id,
            uri_prefix,
            fee_per_token,
        } => {
            ops::mint_batch(
                &dispatcher,
                contract,
                &sender,
                amount,
                start_id,
                &uri_prefix,
                fee_per_token,
            )
            .await?;
        }
        Command::PayFee { contract, amount } => {
            ops::pay_fee(&dispatcher, contract, &sender, amount).await?;
        }
        Command::SetPaused { contract, paused } => {
            ops::set_paused(&dispatcher, contract, &sender, paused).await?;
        }
        Command::GasPrice { .. } | Command::Info { .. } | Command::SaveAbi { .. } => {}
    }
    Ok(())
}

/// Warn when the node behind RPC_URL is not the chain NETWORK names.
async fn check_chain_id(chain: &dyn Chain, network: Network) -> Result<()> {
    let Some(expected) = network.expected_chain_id() else {
        return Ok(());
    };
    let actual = chain.chain_id().await?;
    if actual != expected {
        warn!("{network} expects chain id {expected} but the node reports {actual}");
    }
    Ok(())
}
