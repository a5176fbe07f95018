//! Configuration: schema, loading, validation.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{ChainConfig, LedgerConfig, ListenerConfig, PayoutConfig, TreasuryConfig};
pub use validation::{validate_config, ValidationError};
