//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML config
//! files. Decimal-valued fields are written as strings in config files
//! ("0.005"), never as binary floats.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Root configuration for the payout engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PayoutConfig {
    /// API listener settings.
    pub listener: ListenerConfig,

    /// Chain endpoint and confirmation settings.
    pub chain: ChainConfig,

    /// Treasury destination and explorer settings.
    pub treasury: TreasuryConfig,

    /// Ledger accounting settings.
    pub ledger: LedgerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// API listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Chain access configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URLs in priority order; the first live one wins.
    pub endpoints: Vec<String>,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// Per-call RPC timeout in seconds (also bounds the liveness probe).
    pub rpc_timeout_secs: u64,

    /// Confirmation depth required before a transfer is committed.
    pub min_confirmations: u64,

    /// Bounded wait for confirmation in seconds.
    pub confirmation_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub confirmation_poll_ms: u64,

    /// Fallback max fee per gas in gwei when estimation fails.
    pub default_max_fee_gwei: u64,

    /// Fallback priority fee per gas in gwei when estimation fails.
    pub default_priority_fee_gwei: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://localhost:8545".to_string()],
            chain_id: 1,
            rpc_timeout_secs: 10,
            min_confirmations: 1,
            confirmation_timeout_secs: 120,
            confirmation_poll_ms: 2000,
            default_max_fee_gwei: 40,
            default_priority_fee_gwei: 2,
        }
    }
}

/// Treasury destination configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TreasuryConfig {
    /// Default recipient address for conversions.
    pub address: String,

    /// Explorer link template; `{tx}` is replaced with the transaction hash.
    pub explorer_tx_url: String,
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            explorer_tx_url: "https://etherscan.io/tx/{tx}".to_string(),
        }
    }
}

/// Ledger accounting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Static fiat-per-native exchange rate.
    pub exchange_rate: Decimal,

    /// Native-unit margin withheld from transfers to cover transaction cost.
    pub fee_reserve: Decimal,

    /// How many transaction records `GetEarnings` returns.
    pub recent_records: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            exchange_rate: Decimal::from(3450),
            // 0.005 native units
            fee_reserve: Decimal::new(5, 3),
            recent_records: 20,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
