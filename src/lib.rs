//! Earnings ledger and on-chain payout engine.
//!
//! # Architecture Overview
//!
//! ```text
//!   Credit / Convert request          ┌──────────────────────────────┐
//!   ───────────────────────────────▶ │     api (transport glue)     │
//!                                    └──────────────┬───────────────┘
//!                                                   ▼
//!                                    ┌──────────────────────────────┐
//!                                    │      engine (conversion)     │
//!                                    │ resolve → reserve → check →  │
//!                                    │ submit → confirm → commit    │
//!                                    └───────┬──────────────┬───────┘
//!                                            ▼              ▼
//!                                    ┌──────────────┐ ┌──────────────┐
//!                                    │    ledger    │ │    chain     │
//!                                    │ credits,     │ │ endpoint     │
//!                                    │ reservations │ │ failover,    │
//!                                    │ audit log    │ │ submit/await │
//!                                    └──────────────┘ └──────────────┘
//! ```
//!
//! The ledger is the single source of truth for what may be converted; the
//! chain module is the only place that touches the network; the engine ties
//! the two together under the commit/rollback rules.

// Core subsystems
pub mod chain;
pub mod config;
pub mod engine;
pub mod ledger;

// Boundary and cross-cutting concerns
pub mod api;
pub mod observability;

pub use chain::connector::{ChainConnector, ChainSession, RpcConnector};
pub use config::schema::PayoutConfig;
pub use engine::convert::{ConversionEngine, EngineSettings};
pub use ledger::book::Ledger;
