//! Ledger types and error definitions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Earnings credited into the ledger.
    Credit,
    /// Earnings converted into an on-chain transfer.
    Conversion,
}

/// One immutable entry in the append-only transaction log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Entry kind.
    pub kind: RecordKind,
    /// Amount in native units.
    pub native_amount: Decimal,
    /// Amount in fiat units.
    pub fiat_amount: Decimal,
    /// Credit source label, or recipient address for conversions.
    pub counterparty: String,
    /// On-chain transaction hash (conversions only, once confirmed).
    pub tx_hash: Option<String>,
    /// Inclusion block height (conversions only, once confirmed).
    pub block_height: Option<u64>,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
}

/// Balance available for conversion, net of withdrawals and reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableBalance {
    pub fiat: Decimal,
    pub native: Decimal,
}

/// Snapshot of the cumulative ledger counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsTotals {
    pub credited_fiat: Decimal,
    pub credited_native: Decimal,
    pub withdrawn_fiat: Decimal,
    pub withdrawn_native: Decimal,
    pub reserved_native: Decimal,
    pub available: AvailableBalance,
}

/// Result of a successful credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditReceipt {
    pub fiat_credited: Decimal,
    pub native_credited: Decimal,
    pub totals: EarningsTotals,
}

/// Errors raised by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Credit input was missing, zero, or negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Reservation asked for more than the available native balance.
    #[error("insufficient funds: requested {requested} native, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    /// A withdrawal reservation is already outstanding.
    #[error("a conversion is already in flight ({reserved} native reserved)")]
    ReservationInProgress { reserved: Decimal },

    /// Commit attempted for more than the reserved amount.
    #[error("overdraft attempt: reserved {reserved} native, tried to commit {attempted}")]
    OverdraftAttempt {
        reserved: Decimal,
        attempted: Decimal,
    },

    /// Handle does not match the outstanding reservation.
    #[error("unknown or stale reservation handle")]
    UnknownReservation,
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
