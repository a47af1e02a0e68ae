//! Compiled contract artifacts (hardhat, truffle or forge JSON output).

use std::path::Path;

use ethers::types::Bytes;
use serde_json::Value;
use tracing::info;

use crate::errors::{OperatorError, Result};

#[derive(Debug, Clone)]
pub struct Artifact {
    pub contract_name: String,
    pub abi: Value,
    pub bytecode: Bytes,
}

impl Artifact {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let fallback_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("contract");
        Self::from_json(&serde_json::from_str(&raw)?, fallback_name)
    }

    /// Accepts `"bytecode": "0x…"` (hardhat, truffle) and
    /// `"bytecode": {"object": "0x…"}` (forge).
    pub fn from_json(json: &Value, fallback_name: &str) -> Result<Self> {
        let abi = json
            .get("abi")
            .cloned()
            .ok_or_else(|| OperatorError::InvalidInput("artifact has no abi".to_string()))?;

        let bytecode_hex = json
            .get("bytecode")
            .and_then(|b| b.as_str().or_else(|| b.get("object").and_then(|o| o.as_str())))
            .ok_or_else(|| OperatorError::InvalidInput("artifact has no bytecode".to_string()))?;
        let bytecode = hex::decode(bytecode_hex.trim_start_matches("0x"))
            .map_err(|e| OperatorError::InvalidInput(format!("invalid artifact bytecode: {e}")))?;

        let contract_name = json
            .get("contractName")
            .and_then(|n| n.as_str())
            .unwrap_or(fallback_name)
            .to_string();

        Ok(Self {
            contract_name,
            abi,
            bytecode: bytecode.into(),
        })
    }

    /// Write the ABI as pretty JSON, creating parent directories as needed.
    pub fn save_abi(&self, out: impl AsRef<Path>) -> Result<()> {
        let out = out.as_ref();
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(out, serde_json::to_string_pretty(&self.abi)?)?;
        info!("ABI for {} saved to {}", self.contract_name, out.display());
        Ok(())
    }
}
