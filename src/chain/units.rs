//! Conversion between decimal native amounts and wei.
//!
//! Ledger arithmetic stays in `Decimal` end to end; wei enters the picture
//! only at the signing boundary and when reading on-chain balances.

use alloy::primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::chain::types::{ChainError, ChainResult};

/// Wei per native unit (10^18).
const WEI_PER_NATIVE: u64 = 1_000_000_000_000_000_000;

/// Convert a decimal native amount to wei, truncating sub-wei precision.
pub fn native_to_wei(amount: Decimal) -> ChainResult<U256> {
    if amount < Decimal::ZERO {
        return Err(ChainError::Rpc(format!(
            "cannot convert negative amount {amount} to wei"
        )));
    }
    amount
        .checked_mul(Decimal::from(WEI_PER_NATIVE))
        .map(|wei| wei.trunc())
        .and_then(|wei| wei.to_u128())
        .map(U256::from)
        .ok_or_else(|| ChainError::Rpc(format!("amount {amount} out of range for a wei value")))
}

/// Convert a wei balance to a decimal native amount.
///
/// Balances beyond `i128::MAX` wei (about 1.7e20 native units) saturate;
/// no real account comes anywhere near that.
pub fn wei_to_native(wei: U256) -> Decimal {
    let raw: i128 = match i128::try_from(wei) {
        Ok(v) => v,
        Err(_) => i128::MAX,
    };
    Decimal::from_i128_with_scale(raw, 18).normalize()
}
