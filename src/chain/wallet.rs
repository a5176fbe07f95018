//! Operator wallet management.
//!
//! # Security
//! - The private key is loaded ONLY from an environment variable
//! - The key is never logged or serialized

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::chain::types::{ChainError, ChainResult};

/// Environment variable name for the operator private key.
pub const OPERATOR_KEY_ENV_VAR: &str = "PAYOUT_OPERATOR_PRIVATE_KEY";

/// The operator account used to sign and fund outgoing transfers.
#[derive(Debug, Clone)]
pub struct OperatorWallet {
    signer: PrivateKeySigner,
}

impl OperatorWallet {
    /// Create a wallet from a hex-encoded private key string
    /// (with or without 0x prefix).
    pub fn from_private_key(private_key_hex: &str) -> ChainResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| ChainError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::info!(address = %signer.address(), "Operator wallet initialized");

        Ok(Self { signer })
    }

    /// Load the wallet from `PAYOUT_OPERATOR_PRIVATE_KEY`.
    pub fn from_env() -> ChainResult<Self> {
        let private_key = std::env::var(OPERATOR_KEY_ENV_VAR).map_err(|_| {
            ChainError::Wallet(format!(
                "Environment variable {} not set",
                OPERATOR_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key)
    }

    /// The operator account address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Signing wallet for provider construction.
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}
