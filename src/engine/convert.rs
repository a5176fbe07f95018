//! End-to-end conversion orchestration.
//!
//! A request walks Requested → Reserved → BalanceChecked → Submitted →
//! Confirmed → Committed. Failures before broadcast roll the reservation
//! back; failures after broadcast hold it, because rolling back while a
//! transaction might still confirm would open a double-spend window.

use alloy::primitives::{Address, TxHash};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::chain::connector::ChainConnector;
use crate::chain::types::{ChainResult, ChainTransfer, ReceiptStatus, TransferOutcome};
use crate::chain::units::{native_to_wei, wei_to_native};
use crate::config::loader::ConfigError;
use crate::config::schema::PayoutConfig;
use crate::config::validation::ValidationError;
use crate::engine::types::{
    ConversionOutcome, ConversionReceipt, ConvertError, PendingConversion, ReconcileOutcome,
    TransferRequest,
};
use crate::ledger::book::{Ledger, ReservationHandle};
use crate::observability::metrics::record_conversion;

/// Engine settings distilled from the configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Default recipient for conversions.
    pub treasury: Address,
    /// Native margin withheld so the operator account can pay gas.
    pub fee_reserve: Decimal,
    /// Confirmation depth before a transfer is committed.
    pub min_confirmations: u64,
    /// Explorer link template with a `{tx}` placeholder.
    pub explorer_tx_url: String,
}

impl EngineSettings {
    /// Extract engine settings from a validated configuration.
    pub fn from_config(config: &PayoutConfig) -> Result<Self, ConfigError> {
        let treasury = config.treasury.address.parse().map_err(|e| {
            ConfigError::Validation(vec![ValidationError {
                field: "treasury.address".to_string(),
                message: format!("'{}' is not a valid address: {}", config.treasury.address, e),
            }])
        })?;
        Ok(Self {
            treasury,
            fee_reserve: config.ledger.fee_reserve,
            min_confirmations: config.chain.min_confirmations,
            explorer_tx_url: config.treasury.explorer_tx_url.clone(),
        })
    }
}

struct PendingEntry {
    handle: ReservationHandle,
    native_submitted: Decimal,
    recipient: Address,
    submitted_at: chrono::DateTime<chrono::Utc>,
}

/// Orchestrates withdrawals: ledger reservation, on-chain transfer,
/// commit or rollback.
pub struct ConversionEngine {
    ledger: Arc<Ledger>,
    chain: Arc<dyn ChainConnector>,
    settings: EngineSettings,
    /// Submitted-but-unconfirmed transfers awaiting reconciliation.
    pending: Mutex<HashMap<TxHash, PendingEntry>>,
}

impl ConversionEngine {
    /// Create an engine over a shared ledger and chain connector.
    pub fn new(
        ledger: Arc<Ledger>,
        chain: Arc<dyn ChainConnector>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            ledger,
            chain,
            settings,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Convert a portion of the earnings ledger into an on-chain transfer.
    pub async fn convert(
        &self,
        request: TransferRequest,
    ) -> Result<ConversionOutcome, ConvertError> {
        let recipient = request.recipient.unwrap_or(self.settings.treasury);

        // Requested: resolve against the availability read right now.
        let available = self.ledger.available().native;
        let resolved = request.amount.resolve(available, self.ledger.rate());
        if resolved <= Decimal::ZERO {
            return Err(ConvertError::NothingToConvert { resolved });
        }
        if resolved > available {
            return Err(ConvertError::RequestedExceedsAvailable {
                requested: resolved,
                available,
            });
        }

        // Reserved.
        let handle = self.ledger.reserve_for_withdrawal(resolved)?;
        tracing::info!(native = %resolved, recipient = %recipient, "Conversion reserved");

        let session = match self.chain.connect().await {
            Ok(session) => session,
            Err(e) => return Err(self.abort(&handle, e.into())),
        };

        // BalanceChecked: cap the send by what the operator account holds,
        // net of the fee reserve.
        let operator = session.operator_address();
        let on_chain = match session.account_balance(operator).await {
            Ok(wei) => wei_to_native(wei),
            Err(e) => return Err(self.abort(&handle, e.into())),
        };
        let sendable = resolved.min(on_chain - self.settings.fee_reserve);
        if sendable <= Decimal::ZERO {
            return Err(self.abort(
                &handle,
                ConvertError::OperatorWalletUnderfunded {
                    balance: on_chain,
                    needed: resolved + self.settings.fee_reserve,
                },
            ));
        }

        // Submitted.
        let fees = match session.fee_estimate().await {
            Ok(fees) => fees,
            Err(e) => return Err(self.abort(&handle, ConvertError::SubmissionFailed(e))),
        };
        let value_wei = match native_to_wei(sendable) {
            Ok(wei) => wei,
            Err(e) => return Err(self.abort(&handle, ConvertError::SubmissionFailed(e))),
        };
        let transfer = ChainTransfer {
            to: recipient,
            value_wei,
            fees,
        };
        let tx_hash = match session.submit(transfer).await {
            Ok(hash) => hash,
            Err(e) => return Err(self.abort(&handle, ConvertError::SubmissionFailed(e))),
        };

        // Confirmed → Committed, or held as pending. Broadcast is
        // irrevocable, so a confirmation failure must not release the
        // reservation.
        match session
            .await_confirmation(tx_hash, self.settings.min_confirmations)
            .await
        {
            Ok(outcome) => {
                let receipt = self.commit(&handle, sendable, recipient, outcome)?;
                Ok(ConversionOutcome::Committed(receipt))
            }
            Err(e) => {
                tracing::warn!(
                    tx_hash = %tx_hash,
                    native = %sendable,
                    error = %e,
                    "Confirmation not observed; holding reservation for reconciliation"
                );
                self.pending.lock().unwrap().insert(
                    tx_hash,
                    PendingEntry {
                        handle,
                        native_submitted: sendable,
                        recipient,
                        submitted_at: chrono::Utc::now(),
                    },
                );
                record_conversion("pending");
                Ok(ConversionOutcome::PendingUnconfirmed {
                    tx_hash,
                    native_submitted: sendable,
                })
            }
        }
    }

    /// Re-check a pending transfer and settle it exactly once.
    ///
    /// Idempotent: a hash that is no longer pending reports
    /// [`ReconcileOutcome::AlreadyReconciled`] without touching the ledger.
    pub async fn reconcile(&self, tx_hash: TxHash) -> Result<ReconcileOutcome, ConvertError> {
        let entry = self.pending.lock().unwrap().remove(&tx_hash);
        let Some(entry) = entry else {
            return Ok(ReconcileOutcome::AlreadyReconciled);
        };

        let session = match self.chain.connect().await {
            Ok(session) => session,
            Err(e) => {
                self.restore(tx_hash, entry);
                return Err(e.into());
            }
        };

        match session
            .check_receipt(tx_hash, self.settings.min_confirmations)
            .await
        {
            Ok(ReceiptStatus::Confirmed(outcome)) => {
                let receipt =
                    self.commit(&entry.handle, entry.native_submitted, entry.recipient, outcome)?;
                Ok(ReconcileOutcome::Committed(receipt))
            }
            Ok(ReceiptStatus::Pending) => {
                self.restore(tx_hash, entry);
                Ok(ReconcileOutcome::StillPending)
            }
            Ok(ReceiptStatus::Unknown) => {
                let released = entry.handle.amount();
                self.ledger.rollback_reservation(&entry.handle)?;
                record_conversion("rolled_back");
                tracing::warn!(tx_hash = %tx_hash, native = %released, "Dropped transaction reconciled, reservation released");
                Ok(ReconcileOutcome::Dropped { released })
            }
            Err(e) => {
                self.restore(tx_hash, entry);
                Err(e.into())
            }
        }
    }

    /// Transfers awaiting reconciliation.
    pub fn pending(&self) -> Vec<PendingConversion> {
        self.pending
            .lock()
            .unwrap()
            .iter()
            .map(|(tx_hash, entry)| PendingConversion {
                tx_hash: *tx_hash,
                native_submitted: entry.native_submitted,
                recipient: entry.recipient,
                submitted_at: entry.submitted_at,
            })
            .collect()
    }

    /// Operator account address and current on-chain balance.
    pub async fn operator_balance(&self) -> ChainResult<(Address, Decimal)> {
        let session = self.chain.connect().await?;
        let address = session.operator_address();
        let wei = session.account_balance(address).await?;
        Ok((address, wei_to_native(wei)))
    }

    /// The ledger shared with the query surface.
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    fn commit(
        &self,
        handle: &ReservationHandle,
        sendable: Decimal,
        recipient: Address,
        outcome: TransferOutcome,
    ) -> Result<ConversionReceipt, ConvertError> {
        let tx_hash_str = outcome.tx_hash.to_string();
        self.ledger.commit_withdrawal(
            handle,
            sendable,
            &recipient.to_string(),
            &tx_hash_str,
            outcome.block_height,
        )?;
        record_conversion("committed");
        Ok(ConversionReceipt {
            tx_hash: outcome.tx_hash,
            native_sent: sendable,
            fiat_equivalent: self.ledger.fiat_equivalent(sendable),
            recipient,
            block_height: outcome.block_height,
            fee_spent_wei: outcome.fee_spent_wei,
            explorer_url: self.settings.explorer_tx_url.replace("{tx}", &tx_hash_str),
        })
    }

    fn abort(&self, handle: &ReservationHandle, err: ConvertError) -> ConvertError {
        if let Err(rollback_err) = self.ledger.rollback_reservation(handle) {
            tracing::error!(error = %rollback_err, "Reservation rollback failed");
        }
        record_conversion("rolled_back");
        err
    }

    fn restore(&self, tx_hash: TxHash, entry: PendingEntry) {
        self.pending.lock().unwrap().insert(tx_hash, entry);
    }
}

impl std::fmt::Debug for ConversionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionEngine")
            .field("settings", &self.settings)
            .field("pending", &self.pending.lock().unwrap().len())
            .finish()
    }
}
