//! Chain connector: endpoint failover and session operations.
//!
//! # Responsibilities
//! - Probe configured endpoints in priority order and bind the first live one
//! - Query chain state (height, balances, fees) with bounded timeouts
//! - Sign and broadcast value transfers via the operator wallet
//! - Poll for confirmation and detect dropped transactions

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::future::{Future, IntoFuture};
use std::time::Duration;
use tokio::time::{interval, timeout};
use url::Url;

use crate::chain::types::{
    ChainConfig, ChainError, ChainResult, ChainTransfer, FeeEstimate, ReceiptStatus,
    TransferOutcome,
};
use crate::chain::wallet::OperatorWallet;

/// Consecutive not-found polls before a submitted transaction is treated
/// as dropped from the network.
const DROP_THRESHOLD: u32 = 3;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// A connection bound to one live endpoint, used for all calls within a
/// single operation.
#[async_trait]
pub trait ChainSession: Send + Sync + std::fmt::Debug {
    /// Address of the operator account that signs transfers.
    fn operator_address(&self) -> Address;

    /// Latest block height.
    async fn current_height(&self) -> ChainResult<u64>;

    /// On-chain balance of an address in wei.
    async fn account_balance(&self, address: Address) -> ChainResult<U256>;

    /// Current fee parameters, falling back to configured defaults when the
    /// network supplies none.
    async fn fee_estimate(&self) -> ChainResult<FeeEstimate>;

    /// Sign and broadcast a transfer. Returns the transaction hash
    /// immediately; does not wait for inclusion.
    async fn submit(&self, transfer: ChainTransfer) -> ChainResult<TxHash>;

    /// Block until the transaction reaches the required confirmation depth.
    async fn await_confirmation(
        &self,
        tx_hash: TxHash,
        min_confirmations: u64,
    ) -> ChainResult<TransferOutcome>;

    /// One-shot status check for a previously submitted transaction.
    async fn check_receipt(
        &self,
        tx_hash: TxHash,
        min_confirmations: u64,
    ) -> ChainResult<ReceiptStatus>;
}

/// Hands out sessions; each conversion operation connects once and uses the
/// resulting session for all of its chain calls.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    async fn connect(&self) -> ChainResult<Box<dyn ChainSession>>;
}

/// JSON-RPC connector over a prioritized endpoint list.
#[derive(Clone)]
pub struct RpcConnector {
    endpoints: Vec<Url>,
    wallet: OperatorWallet,
    config: ChainConfig,
}

impl RpcConnector {
    /// Create a connector from configuration and the operator wallet.
    pub fn new(config: ChainConfig, wallet: OperatorWallet) -> ChainResult<Self> {
        let mut endpoints = Vec::new();
        for url_str in &config.endpoints {
            match url_str.parse::<Url>() {
                Ok(url) => endpoints.push(url),
                Err(e) => {
                    tracing::warn!(url = %url_str, error = %e, "Ignoring invalid endpoint URL");
                }
            }
        }
        if endpoints.is_empty() {
            return Err(ChainError::Rpc(
                "no valid RPC endpoints configured".to_string(),
            ));
        }

        Ok(Self {
            endpoints,
            wallet,
            config,
        })
    }

    fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.config.rpc_timeout_secs)
    }
}

#[async_trait]
impl ChainConnector for RpcConnector {
    /// Try each endpoint in priority order with a liveness probe (fetch the
    /// current height) and bind the first one that answers in time.
    async fn connect(&self) -> ChainResult<Box<dyn ChainSession>> {
        let probe_timeout = self.rpc_timeout();

        for (i, url) in self.endpoints.iter().enumerate() {
            let provider = ProviderBuilder::new()
                .wallet(self.wallet.ethereum_wallet())
                .connect_http(url.clone())
                .erased();

            match timeout(probe_timeout, provider.get_block_number()).await {
                Ok(Ok(height)) => {
                    tracing::debug!(endpoint = %url, priority = i, height, "Endpoint live");
                    return Ok(Box::new(RpcSession {
                        provider,
                        endpoint: url.to_string(),
                        operator: self.wallet.address(),
                        config: self.config.clone(),
                    }));
                }
                Ok(Err(e)) => {
                    tracing::warn!(endpoint = %url, priority = i, error = %e, "Liveness probe failed");
                }
                Err(_) => {
                    tracing::warn!(endpoint = %url, priority = i, "Liveness probe timed out");
                }
            }
        }

        Err(ChainError::NoReachableEndpoint {
            attempted: self.endpoints.len(),
        })
    }
}

/// Session bound to a single live endpoint.
pub struct RpcSession {
    provider: DynProvider,
    endpoint: String,
    operator: Address,
    config: ChainConfig,
}

impl RpcSession {
    async fn rpc<T, E, F>(&self, fut: F) -> ChainResult<T>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>> + Send,
    {
        let secs = self.config.rpc_timeout_secs;
        match timeout(Duration::from_secs(secs), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ChainError::Rpc(format!("{} ({})", e, self.endpoint))),
            Err(_) => Err(ChainError::Timeout(secs)),
        }
    }
}

#[async_trait]
impl ChainSession for RpcSession {
    fn operator_address(&self) -> Address {
        self.operator
    }

    async fn current_height(&self) -> ChainResult<u64> {
        self.rpc(self.provider.get_block_number()).await
    }

    async fn account_balance(&self, address: Address) -> ChainResult<U256> {
        self.rpc(self.provider.get_balance(address).into_future())
            .await
    }

    async fn fee_estimate(&self) -> ChainResult<FeeEstimate> {
        match self.rpc(self.provider.estimate_eip1559_fees()).await {
            Ok(estimate) => Ok(FeeEstimate {
                max_fee_per_gas: estimate.max_fee_per_gas,
                max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Fee estimation failed, using configured defaults");
                Ok(FeeEstimate {
                    max_fee_per_gas: self.config.default_max_fee_gwei as u128 * WEI_PER_GWEI,
                    max_priority_fee_per_gas: self.config.default_priority_fee_gwei as u128
                        * WEI_PER_GWEI,
                })
            }
        }
    }

    async fn submit(&self, transfer: ChainTransfer) -> ChainResult<TxHash> {
        let nonce = self
            .rpc(self.provider.get_transaction_count(self.operator).into_future())
            .await?;

        let tx = TransactionRequest::default()
            .with_from(self.operator)
            .with_to(transfer.to)
            .with_value(transfer.value_wei)
            .with_nonce(nonce)
            .with_chain_id(self.config.chain_id)
            .with_gas_limit(21_000)
            .with_max_fee_per_gas(transfer.fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(transfer.fees.max_priority_fee_per_gas);

        let pending = self.rpc(self.provider.send_transaction(tx)).await?;
        let tx_hash = *pending.tx_hash();

        tracing::info!(
            tx_hash = %tx_hash,
            to = %transfer.to,
            value_wei = %transfer.value_wei,
            nonce,
            "Transfer broadcast"
        );
        Ok(tx_hash)
    }

    async fn await_confirmation(
        &self,
        tx_hash: TxHash,
        min_confirmations: u64,
    ) -> ChainResult<TransferOutcome> {
        let wait_secs = self.config.confirmation_timeout_secs;
        let poll = Duration::from_millis(self.config.confirmation_poll_ms);
        let mut not_found = 0u32;

        let result = timeout(Duration::from_secs(wait_secs), async {
            let mut ticker = interval(poll);
            loop {
                ticker.tick().await;

                match self.check_receipt(tx_hash, min_confirmations).await? {
                    ReceiptStatus::Confirmed(outcome) => return Ok(outcome),
                    ReceiptStatus::Pending => {
                        not_found = 0;
                        tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    }
                    ReceiptStatus::Unknown => {
                        not_found += 1;
                        if not_found >= DROP_THRESHOLD {
                            return Err(ChainError::TransactionDropped { tx_hash });
                        }
                    }
                }
            }
        })
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(_) => Err(ChainError::ConfirmationTimeout {
                tx_hash,
                waited_secs: wait_secs,
            }),
        }
    }

    async fn check_receipt(
        &self,
        tx_hash: TxHash,
        min_confirmations: u64,
    ) -> ChainResult<ReceiptStatus> {
        let receipt = match self
            .rpc(self.provider.get_transaction_receipt(tx_hash))
            .await?
        {
            Some(receipt) => receipt,
            None => {
                // No receipt: distinguish still-pending from forgotten.
                let known = self
                    .rpc(self.provider.get_transaction_by_hash(tx_hash))
                    .await?
                    .is_some();
                return Ok(if known {
                    ReceiptStatus::Pending
                } else {
                    ReceiptStatus::Unknown
                });
            }
        };

        if !receipt.status() {
            return Err(ChainError::Reverted { tx_hash });
        }

        let current = self.rpc(self.provider.get_block_number()).await?;
        let tx_block = receipt.block_number.unwrap_or(current);
        let confirmations = current.saturating_sub(tx_block);
        if confirmations < min_confirmations {
            return Ok(ReceiptStatus::Pending);
        }

        let fee_spent = receipt.gas_used as u128 * receipt.effective_gas_price;
        Ok(ReceiptStatus::Confirmed(TransferOutcome {
            tx_hash,
            block_height: tx_block,
            fee_spent_wei: U256::from(fee_spent),
        }))
    }
}

impl std::fmt::Debug for RpcSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcSession")
            .field("endpoint", &self.endpoint)
            .field("operator", &self.operator)
            .field("chain_id", &self.config.chain_id)
            .finish()
    }
}

impl std::fmt::Debug for RpcConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcConnector")
            .field("endpoints", &self.endpoints)
            .field("chain_id", &self.config.chain_id)
            .field("rpc_timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
