//! Conversion engine: turns ledger earnings into on-chain transfers.

pub mod convert;
pub mod types;

pub use convert::{ConversionEngine, EngineSettings};
pub use types::{
    AmountSelector, ConversionOutcome, ConversionReceipt, ConvertError, PendingConversion,
    ReconcileOutcome, TransferRequest,
};
