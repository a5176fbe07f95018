//! In-memory earnings ledger.
//!
//! # Responsibilities
//! - Track cumulative credited and withdrawn value in fiat and native units
//! - Serialize withdrawals through a single-flight reservation protocol
//! - Keep an append-only transaction log for auditing

pub mod book;
pub mod types;

pub use book::{Ledger, ReservationHandle};
pub use types::{
    AvailableBalance, CreditReceipt, EarningsTotals, LedgerError, LedgerResult, RecordKind,
    TransactionRecord,
};
