//! Chain-specific types and error definitions.

use alloy::primitives::{Address, TxHash, U256};
use thiserror::Error;

// Re-export ChainConfig from the config module to avoid duplication
pub use crate::config::schema::ChainConfig;

/// EIP-1559 fee parameters for a transfer, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// A value transfer ready to be signed and broadcast.
#[derive(Debug, Clone)]
pub struct ChainTransfer {
    pub to: Address,
    pub value_wei: U256,
    pub fees: FeeEstimate,
}

/// Result of a confirmed transfer.
#[derive(Debug, Clone, Copy)]
pub struct TransferOutcome {
    pub tx_hash: TxHash,
    pub block_height: u64,
    pub fee_spent_wei: U256,
}

/// Where a previously submitted transaction stands right now.
#[derive(Debug, Clone, Copy)]
pub enum ReceiptStatus {
    /// Included and at the required confirmation depth.
    Confirmed(TransferOutcome),
    /// Still pending in the mempool or below the required depth.
    Pending,
    /// The network no longer knows the transaction.
    Unknown,
}

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Every configured endpoint failed its liveness probe.
    #[error("no reachable endpoint ({attempted} attempted)")]
    NoReachableEndpoint { attempted: usize },

    /// RPC connection or request failed.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("rpc timeout after {0} seconds")]
    Timeout(u64),

    /// Bounded confirmation wait elapsed without inclusion.
    #[error("transaction {tx_hash} unconfirmed after {waited_secs} seconds")]
    ConfirmationTimeout { tx_hash: TxHash, waited_secs: u64 },

    /// The network reports the transaction as no longer pending.
    #[error("transaction {tx_hash} dropped without inclusion")]
    TransactionDropped { tx_hash: TxHash },

    /// Transaction was included but reverted.
    #[error("transaction {tx_hash} reverted on-chain")]
    Reverted { tx_hash: TxHash },

    /// Invalid private key format or signing failure.
    #[error("wallet error: {0}")]
    Wallet(String),
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;
