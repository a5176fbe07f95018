//! Chain access: endpoint failover, operator wallet, transfer submission
//! and confirmation.

pub mod connector;
pub mod types;
pub mod units;
pub mod wallet;

pub use connector::{ChainConnector, ChainSession, RpcConnector};
pub use types::{
    ChainError, ChainResult, ChainTransfer, FeeEstimate, ReceiptStatus, TransferOutcome,
};
pub use units::{native_to_wei, wei_to_native};
pub use wallet::OperatorWallet;
