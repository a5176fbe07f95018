//! payout-engine binary: load config, wire the core, serve the API.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use payout_engine::api::{create_router, AppState};
use payout_engine::chain::wallet::OperatorWallet;
use payout_engine::chain::RpcConnector;
use payout_engine::config::load_config;
use payout_engine::observability;
use payout_engine::{ConversionEngine, EngineSettings, Ledger, PayoutConfig};

#[derive(Debug, Parser)]
#[command(name = "payout-engine", about = "Earnings ledger and on-chain payout engine")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "payout.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        eprintln!(
            "config file {} not found, using defaults",
            cli.config.display()
        );
        PayoutConfig::default()
    };

    observability::logging::init(&config.observability.log_level);
    tracing::info!("payout-engine v0.1.0 starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let wallet = OperatorWallet::from_env()?;
    let connector = Arc::new(RpcConnector::new(config.chain.clone(), wallet)?);
    let ledger = Arc::new(Ledger::new(config.ledger.exchange_rate));
    let settings = EngineSettings::from_config(&config)?;
    let engine = Arc::new(ConversionEngine::new(ledger, connector, settings));

    tracing::info!(
        endpoints = config.chain.endpoints.len(),
        chain_id = config.chain.chain_id,
        treasury = %config.treasury.address,
        exchange_rate = %config.ledger.exchange_rate,
        "Core assembled"
    );

    let state = AppState {
        engine,
        recent_records: config.ledger.recent_records,
    };
    let app = create_router(state);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for requests");
    axum::serve(listener, app).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
