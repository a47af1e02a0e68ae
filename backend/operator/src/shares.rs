//! Payee share allocation for the ProvNFT payment splitter.
//!
//! The contract only stores integer weights; a payee's cut of released
//! funds is `shares / total_shares`. Two allocation modes are supported:
//!
//! * [`SplitMode::Evenly`]: one share per payee.
//! * [`SplitMode::Remainder`]: a fixed total (100 by default) divided by
//!   floor, with the last payee absorbing the remainder.

use std::collections::HashSet;
use std::str::FromStr;

use ethers::types::Address;

use crate::errors::{OperatorError, Result};

pub const DEFAULT_TOTAL_SHARES: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    Evenly,
    Remainder { total: u64 },
}

impl Default for SplitMode {
    fn default() -> Self {
        Self::Remainder {
            total: DEFAULT_TOTAL_SHARES,
        }
    }
}

impl FromStr for SplitMode {
    type Err = OperatorError;

    /// `evenly`, or a non-negative total share count.
    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("evenly") {
            return Ok(Self::Evenly);
        }
        s.parse::<u64>()
            .map(|total| Self::Remainder { total })
            .map_err(|_| OperatorError::InvalidInput(format!("invalid share total: {s}")))
    }
}

/// Split shares across `n` payees.
pub fn allocate(n: usize, mode: SplitMode) -> Result<Vec<u64>> {
    if n == 0 {
        return Err(OperatorError::InvalidInput(
            "at least one payee is required".to_string(),
        ));
    }
    match mode {
        SplitMode::Evenly => Ok(vec![1; n]),
        SplitMode::Remainder { total } => {
            let mut remaining = total;
            let mut shares = Vec::with_capacity(n);
            for i in 0..n {
                let share = if i == n - 1 {
                    remaining
                } else {
                    remaining / (n - i) as u64
                };
                remaining -= share;
                shares.push(share);
            }
            Ok(shares)
        }
    }
}

/// Ordered payees with their share weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayeeList {
    entries: Vec<(Address, u64)>,
}

impl PayeeList {
    pub fn new(payees: Vec<Address>, mode: SplitMode) -> Result<Self> {
        validate_accounts(&payees, "payee")?;
        let shares = allocate(payees.len(), mode)?;
        Ok(Self {
            entries: payees.into_iter().zip(shares).collect(),
        })
    }

    /// Parse a comma separated address list.
    pub fn parse(csv: &str, mode: SplitMode) -> Result<Self> {
        Self::new(parse_address_list(csv)?, mode)
    }

    pub fn payees(&self) -> Vec<Address> {
        self.entries.iter().map(|(a, _)| *a).collect()
    }

    pub fn shares(&self) -> Vec<u64> {
        self.entries.iter().map(|(_, s)| *s).collect()
    }

    pub fn total_shares(&self) -> u64 {
        self.entries.iter().map(|(_, s)| s).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Accounts handed to a contract must be distinct and non-zero.
pub fn validate_accounts(accounts: &[Address], what: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(accounts.len());
    for account in accounts {
        if account.is_zero() {
            return Err(OperatorError::InvalidInput(format!(
                "{what} address must not be zero"
            )));
        }
        if !seen.insert(*account) {
            return Err(OperatorError::InvalidInput(format!(
                "duplicate {what} address {account:?}"
            )));
        }
    }
    Ok(())
}

pub fn parse_address(raw: &str) -> Result<Address> {
    Address::from_str(raw.trim())
        .map_err(|_| OperatorError::InvalidInput(format!("invalid address: {raw}")))
}

pub fn parse_address_list(csv: &str) -> Result<Vec<Address>> {
    csv.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_address)
        .collect()
}
