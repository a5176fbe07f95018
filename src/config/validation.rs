//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, positive exchange rate)
//! - Check chain and treasury settings are usable before startup
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: PayoutConfig → Result<(), Vec<ValidationError>>

use alloy::primitives::Address;
use rust_decimal::Decimal;
use url::Url;

use crate::config::schema::PayoutConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &PayoutConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut err = |field: &str, message: String| {
        errors.push(ValidationError {
            field: field.to_string(),
            message,
        });
    };

    if config.chain.endpoints.is_empty() {
        err("chain.endpoints", "at least one RPC endpoint is required".into());
    }
    for (i, endpoint) in config.chain.endpoints.iter().enumerate() {
        if endpoint.parse::<Url>().is_err() {
            err(
                &format!("chain.endpoints[{i}]"),
                format!("'{endpoint}' is not a valid URL"),
            );
        }
    }
    if config.chain.rpc_timeout_secs == 0 {
        err("chain.rpc_timeout_secs", "must be greater than zero".into());
    }
    if config.chain.min_confirmations == 0 {
        err("chain.min_confirmations", "must be at least 1".into());
    }
    if config.chain.confirmation_poll_ms == 0 {
        err("chain.confirmation_poll_ms", "must be greater than zero".into());
    }

    if config.treasury.address.is_empty() {
        err("treasury.address", "treasury address is required".into());
    } else if config.treasury.address.parse::<Address>().is_err() {
        err(
            "treasury.address",
            format!("'{}' is not a valid address", config.treasury.address),
        );
    }
    if !config.treasury.explorer_tx_url.contains("{tx}") {
        err(
            "treasury.explorer_tx_url",
            "template must contain the {tx} placeholder".into(),
        );
    }

    if config.ledger.exchange_rate <= Decimal::ZERO {
        err("ledger.exchange_rate", "must be positive".into());
    }
    if config.ledger.fee_reserve < Decimal::ZERO {
        err("ledger.fee_reserve", "must not be negative".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> PayoutConfig {
        let mut config = PayoutConfig::default();
        config.treasury.address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_treasury_address() {
        let mut config = valid_config();
        config.treasury.address = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "treasury.address"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.chain.endpoints = vec!["not a url".to_string()];
        config.ledger.exchange_rate = Decimal::ZERO;
        config.treasury.explorer_tx_url = "https://example.org/".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_zero_confirmations_rejected() {
        let mut config = valid_config();
        config.chain.min_confirmations = 0;
        assert!(validate_config(&config).is_err());
    }
}
