//! Positional command line: `operator <command> [args...]`.

use std::path::PathBuf;

use ethers::types::{Address, U256};
use ethers::utils::parse_units;

use crate::deploy::{ConstructorArgs, SafeSetup};
use crate::errors::{OperatorError, Result};
use crate::shares::{parse_address, parse_address_list, PayeeList, SplitMode};

pub const USAGE: &str = "usage: operator <command> [args...]

  gas-price [network]
  deploy <artifact> v1 <payees,...> [evenly|<total>]
  deploy <artifact> v2 <name> <symbol> <mint_fee> <payees,...> [evenly|<total>]
  deploy-safe-and-nft <safe_artifact> <nft_artifact> <owners,...> <threshold> [mint_fee]
  set-mint-fee <contract> <from> <fee>
  withdraw <payee> <private_key>
  info <payee>
  mint <contract> <uri> <fee>
  mint-batch <contract> <amount> <start_id> <uri_prefix> <fee_per_token>
  pay-fee <contract> <amount>
  pause <contract>
  unpause <contract>
  save-abi <artifact> <out_path>

Amounts are in wei unless suffixed with `gwei` or `ether` (e.g. 0.001ether).";

/// Mint fee used by the Safe deployment when none is given.
pub const DEFAULT_SAFE_MINT_FEE: &str = "0.001ether";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GasPrice {
        network: Option<String>,
    },
    Deploy {
        artifact: PathBuf,
        constructor_args: ConstructorArgs,
    },
    DeploySafeAndNft {
        safe_artifact: PathBuf,
        nft_artifact: PathBuf,
        setup: SafeSetup,
        mint_fee: U256,
    },
    SetMintFee {
        contract: Address,
        from: Address,
        fee: U256,
    },
    Withdraw {
        payee: Address,
        private_key: String,
    },
    Info {
        payee: Address,
    },
    Mint {
        contract: Address,
        uri: String,
        fee: U256,
    },
    MintBatch {
        contract: Address,
        amount: u64,
        start_id: u64,
        uri_prefix: String,
        fee_per_token: U256,
    },
    PayFee {
        contract: Address,
        amount: U256,
    },
    SetPaused {
        contract: Address,
        paused: bool,
    },
    SaveAbi {
        artifact: PathBuf,
        out: PathBuf,
    },
}

impl Command {
    /// Parse the arguments following the program name.
    pub fn parse(args: &[String]) -> Result<Self> {
        let name = args.first().map(String::as_str).ok_or_else(usage)?;
        let rest = &args[1..];

        let command = match name {
            "gas-price" => Self::GasPrice {
                network: rest.first().cloned(),
            },
            "deploy" => Self::Deploy {
                artifact: PathBuf::from(arg(rest, 0)?),
                constructor_args: parse_constructor_args(&rest[1..])?,
            },
            "deploy-safe-and-nft" => Self::DeploySafeAndNft {
                safe_artifact: PathBuf::from(arg(rest, 0)?),
                nft_artifact: PathBuf::from(arg(rest, 1)?),
                setup: SafeSetup::new(
                    parse_address_list(arg(rest, 2)?)?,
                    parse_count(arg(rest, 3)?, "threshold")?,
                )?,
                mint_fee: parse_amount(
                    rest.get(4).map(String::as_str).unwrap_or(DEFAULT_SAFE_MINT_FEE),
                )?,
            },
            "set-mint-fee" => Self::SetMintFee {
                contract: parse_address(arg(rest, 0)?)?,
                from: parse_address(arg(rest, 1)?)?,
                fee: parse_amount(arg(rest, 2)?)?,
            },
            "withdraw" => Self::Withdraw {
                payee: parse_address(arg(rest, 0)?)?,
                private_key: arg(rest, 1)?.to_string(),
            },
            "info" => Self::Info {
                payee: parse_address(arg(rest, 0)?)?,
            },
            "mint" => Self::Mint {
                contract: parse_address(arg(rest, 0)?)?,
                uri: arg(rest, 1)?.to_string(),
                fee: parse_amount(arg(rest, 2)?)?,
            },
            "mint-batch" => Self::MintBatch {
                contract: parse_address(arg(rest, 0)?)?,
                amount: parse_count(arg(rest, 1)?, "amount")?,
                start_id: parse_count(arg(rest, 2)?, "start_id")?,
                uri_prefix: arg(rest, 3)?.to_string(),
                fee_per_token: parse_amount(arg(rest, 4)?)?,
            },
            "pay-fee" => Self::PayFee {
                contract: parse_address(arg(rest, 0)?)?,
                amount: parse_amount(arg(rest, 1)?)?,
            },
            "pause" | "unpause" => Self::SetPaused {
                contract: parse_address(arg(rest, 0)?)?,
                paused: name == "pause",
            },
            "save-abi" => Self::SaveAbi {
                artifact: PathBuf::from(arg(rest, 0)?),
                out: PathBuf::from(arg(rest, 1)?),
            },
            other => {
                return Err(OperatorError::InvalidInput(format!(
                    "unknown command `{other}`\n{USAGE}"
                )))
            }
        };
        Ok(command)
    }

    /// Whether the command talks to a node at all.
    pub fn needs_network(&self) -> bool {
        !matches!(self, Self::SaveAbi { .. })
    }
}

fn usage() -> OperatorError {
    OperatorError::InvalidInput(USAGE.to_string())
}

fn arg(args: &[String], index: usize) -> Result<&str> {
    args.get(index).map(String::as_str).ok_or_else(usage)
}

fn parse_constructor_args(args: &[String]) -> Result<ConstructorArgs> {
    let mode = |index: usize| -> Result<SplitMode> {
        args.get(index)
            .map(|m| m.parse())
            .unwrap_or(Ok(SplitMode::default()))
    };
    match arg(args, 0)? {
        "v1" => Ok(ConstructorArgs::PayeesV1 {
            payees: PayeeList::parse(arg(args, 1)?, mode(2)?)?,
        }),
        "v2" => Ok(ConstructorArgs::NamedV2 {
            name: arg(args, 1)?.to_string(),
            symbol: arg(args, 2)?.to_string(),
            mint_fee: parse_amount(arg(args, 3)?)?,
            payees: PayeeList::parse(arg(args, 4)?, mode(5)?)?,
        }),
        other => Err(OperatorError::InvalidInput(format!(
            "unknown constructor variant `{other}` (expected v1 or v2)"
        ))),
    }
}

fn parse_count(raw: &str, what: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| OperatorError::InvalidInput(format!("invalid {what}: {raw}")))
}

/// Parse a wei amount; `gwei` and `ether` suffixes are converted.
pub fn parse_amount(raw: &str) -> Result<U256> {
    let raw = raw.trim();
    let invalid = || OperatorError::InvalidInput(format!("invalid amount: {raw}"));

    for unit in ["ether", "gwei"] {
        if let Some(value) = raw.strip_suffix(unit) {
            let parsed = parse_units(value.trim(), unit).map_err(|_| invalid())?;
            return Ok(parsed.into());
        }
    }
    U256::from_dec_str(raw).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(String::from).collect()
    }

    const A: &str = "0xAB80b7719B06aeD5B3814dbaf54DfdF75B26ab78";
    const B: &str = "0x41196385fB1ec44F30c2E64D789dBa2ba004Bb24";
    const C: &str = "0xE33cb5b4B828C775122FB90F7Dcc7c750b4aee3f";

    #[test]
    fn parses_amounts() {
        assert_eq!(parse_amount("1000").unwrap(), U256::from(1000u64));
        assert_eq!(
            parse_amount("10gwei").unwrap(),
            U256::from(10_000_000_000u64)
        );
        assert_eq!(
            parse_amount("0.001ether").unwrap(),
            U256::from(1_000_000_000_000_000u64)
        );
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("lots").is_err());
    }

    #[test]
    fn parses_withdraw() {
        let cmd = Command::parse(&args(&format!("withdraw {A} deadbeef"))).unwrap();
        assert_eq!(
            cmd,
            Command::Withdraw {
                payee: parse_address(A).unwrap(),
                private_key: "deadbeef".into(),
            }
        );
    }

    #[test]
    fn parses_v1_deploy_with_even_split() {
        let cmd = Command::parse(&args(&format!(
            "deploy artifacts/ProvNFT.json v1 {A},{B},{C} evenly"
        )))
        .unwrap();
        match cmd {
            Command::Deploy {
                artifact,
                constructor_args: ConstructorArgs::PayeesV1 { payees },
            } => {
                assert_eq!(artifact, PathBuf::from("artifacts/ProvNFT.json"));
                assert_eq!(payees.shares(), vec![1, 1, 1]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_v2_deploy_with_default_total() {
        let cmd = Command::parse(&args(&format!(
            "deploy ProvNFT.json v2 Provenance PRV 0.001ether {A},{B},{C}"
        )))
        .unwrap();
        match cmd {
            Command::Deploy {
                constructor_args:
                    ConstructorArgs::NamedV2 {
                        name,
                        symbol,
                        payees,
                        mint_fee,
                    },
                ..
            } => {
                assert_eq!(name, "Provenance");
                assert_eq!(symbol, "PRV");
                assert_eq!(payees.shares(), vec![33, 33, 34]);
                assert_eq!(mint_fee, U256::from(1_000_000_000_000_000u64));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn safe_deploy_defaults_mint_fee() {
        let cmd = Command::parse(&args(&format!(
            "deploy-safe-and-nft Safe.json ProvNFT.json {A},{B},{C} 2"
        )))
        .unwrap();
        match cmd {
            Command::DeploySafeAndNft { mint_fee, .. } => {
                assert_eq!(mint_fee, parse_amount(DEFAULT_SAFE_MINT_FEE).unwrap())
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Command::parse(&args(&format!(
            "deploy-safe-and-nft Safe.json ProvNFT.json {A} 2"
        )))
        .is_err());
    }

    #[test]
    fn pause_and_unpause() {
        assert_eq!(
            Command::parse(&args(&format!("unpause {A}"))).unwrap(),
            Command::SetPaused {
                contract: parse_address(A).unwrap(),
                paused: false,
            }
        );
    }

    #[test]
    fn rejects_missing_and_unknown() {
        assert!(matches!(
            Command::parse(&[]),
            Err(OperatorError::InvalidInput(_))
        ));
        assert!(Command::parse(&args("withdraw")).is_err());
        assert!(Command::parse(&args("selfdestruct")).is_err());
        assert!(Command::parse(&args(&format!("set-mint-fee {A} notanaddress 5"))).is_err());
        assert!(Command::parse(&args(&format!("deploy x.json v3 {A}"))).is_err());
    }

    #[test]
    fn save_abi_needs_no_network() {
        let cmd = Command::parse(&args("save-abi ProvNFT.json abis/ProvNFT.json")).unwrap();
        assert!(!cmd.needs_network());
        assert!(Command::parse(&args("gas-price mumbai"))
            .unwrap()
            .needs_network());
    }
}
