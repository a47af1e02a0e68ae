//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("Transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("Nothing releasable for payee {0}")]
    NothingReleasable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Signing error: {0}")]
    Signing(#[from] ethers::signers::WalletError),

    #[error("ABI error: {0}")]
    Abi(#[from] ethers::abi::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse grouping used by callers that need to tell bad input apart from
/// chain rejections and transport faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Detected locally before anything was sent.
    Input,
    /// The node or contract refused the request.
    Rejected,
    /// Transport, encoding or environment failure.
    Fault,
}

impl OperatorError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidInput(_) | Self::UnsupportedNetwork(_) | Self::Config(_) => {
                ErrorClass::Input
            }
            Self::TransactionReverted(_) | Self::NothingReleasable(_) => ErrorClass::Rejected,
            Self::Http(_)
            | Self::Rpc { .. }
            | Self::Json(_)
            | Self::Io(_)
            | Self::Signing(_)
            | Self::Abi(_) => ErrorClass::Fault,
        }
    }
}

pub type Result<T> = std::result::Result<T, OperatorError>;
