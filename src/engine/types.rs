//! Conversion request and outcome types.

use alloy::primitives::{Address, TxHash, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::types::ChainError;
use crate::ledger::types::LedgerError;

/// How the caller expresses the amount to convert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AmountSelector {
    /// Absolute native amount.
    Native(Decimal),
    /// Absolute fiat amount, converted at the static rate.
    Fiat(Decimal),
    /// Percentage of the available native balance (50 = half).
    Percent(Decimal),
    /// Everything currently available.
    All,
}

impl AmountSelector {
    /// Resolve to a native amount against the availability read right now.
    ///
    /// Percentage and "all" selectors bind to `available_native` at this
    /// instant, never to a later snapshot.
    pub fn resolve(&self, available_native: Decimal, rate: Decimal) -> Decimal {
        match self {
            AmountSelector::Native(native) => *native,
            AmountSelector::Fiat(fiat) => *fiat / rate,
            AmountSelector::Percent(pct) => available_native * *pct / Decimal::from(100),
            AmountSelector::All => available_native,
        }
    }
}

/// Input to a conversion: what to send, and where.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    /// Destination; the configured treasury address when absent.
    #[serde(default)]
    pub recipient: Option<Address>,
    /// Requested amount.
    pub amount: AmountSelector,
}

/// A committed conversion, as surfaced to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReceipt {
    pub tx_hash: TxHash,
    pub native_sent: Decimal,
    pub fiat_equivalent: Decimal,
    pub recipient: Address,
    pub block_height: u64,
    pub fee_spent_wei: U256,
    pub explorer_url: String,
}

/// Terminal state of a conversion request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// Confirmed on-chain and committed to the ledger.
    Committed(ConversionReceipt),
    /// Broadcast but not confirmed within the bounded wait. The ledger
    /// reservation stays held until an operator reconciles the hash.
    PendingUnconfirmed {
        tx_hash: TxHash,
        native_submitted: Decimal,
    },
}

/// A submitted transfer awaiting reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct PendingConversion {
    pub tx_hash: TxHash,
    pub native_submitted: Decimal,
    pub recipient: Address,
    pub submitted_at: DateTime<Utc>,
}

/// Result of an operator-triggered reconciliation.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The transaction confirmed; the held reservation was committed.
    Committed(ConversionReceipt),
    /// Still in flight; the reservation remains held.
    StillPending,
    /// The network no longer knows the transaction; the reservation was
    /// released.
    Dropped { released: Decimal },
    /// The hash is not pending (already committed, released, or never
    /// ours). No-op.
    AlreadyReconciled,
}

/// Errors raised by the conversion engine.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Resolved amount was zero or negative.
    #[error("nothing to convert (resolved {resolved} native)")]
    NothingToConvert { resolved: Decimal },

    /// Resolved amount exceeds the available balance.
    #[error("requested {requested} native exceeds available {available}")]
    RequestedExceedsAvailable {
        requested: Decimal,
        available: Decimal,
    },

    /// Ledger rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Operator account cannot cover the transfer plus the fee reserve.
    #[error("operator wallet underfunded: on-chain balance {balance} native, needed {needed}")]
    OperatorWalletUnderfunded { balance: Decimal, needed: Decimal },

    /// Broadcast failed; nothing reached the network.
    #[error("submission failed: {0}")]
    SubmissionFailed(#[source] ChainError),

    /// Chain access failed before anything was broadcast.
    #[error(transparent)]
    Chain(#[from] ChainError),
}
