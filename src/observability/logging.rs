//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem
//! - Respect `RUST_LOG` when set, fall back to the configured level
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - Money fields are logged as decimal strings, never floats
//! - Private keys are never logged

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `default_level` applies to this
/// crate's events.
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("payout_engine={default_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
