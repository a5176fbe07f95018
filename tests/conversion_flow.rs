//! End-to-end conversion flow tests against a programmable mock chain.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use payout_engine::chain::{
    native_to_wei, ChainConnector, ChainError, ChainResult, ChainSession, ChainTransfer,
    FeeEstimate, ReceiptStatus, TransferOutcome,
};
use payout_engine::engine::types::{
    AmountSelector, ConversionOutcome, ConvertError, ReconcileOutcome, TransferRequest,
};
use payout_engine::ledger::types::LedgerError;
use payout_engine::{ConversionEngine, EngineSettings, Ledger};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[derive(Debug, Clone, Copy)]
enum ConfirmBehavior {
    ConfirmAt(u64),
    Timeout,
    Dropped,
}

#[derive(Debug, Clone, Copy)]
enum CheckBehavior {
    ConfirmedAt(u64),
    Pending,
    Unknown,
}

struct MockInner {
    operator: Address,
    balance_wei: U256,
    fail_connect: bool,
    fail_submit: bool,
    confirm: ConfirmBehavior,
    check: CheckBehavior,
    submitted: Vec<(Address, U256)>,
    hash_counter: u8,
}

/// Mock chain implementing both the connector and the session side.
#[derive(Clone)]
struct MockChain {
    inner: Arc<Mutex<MockInner>>,
}

impl std::fmt::Debug for MockChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockChain").finish_non_exhaustive()
    }
}

impl MockChain {
    fn new(operator_balance_native: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                operator: Address::repeat_byte(0x0f),
                balance_wei: native_to_wei(dec(operator_balance_native)).unwrap(),
                fail_connect: false,
                fail_submit: false,
                confirm: ConfirmBehavior::ConfirmAt(128),
                check: CheckBehavior::Pending,
                submitted: Vec::new(),
                hash_counter: 0,
            })),
        }
    }

    fn set_confirm(&self, behavior: ConfirmBehavior) {
        self.inner.lock().unwrap().confirm = behavior;
    }

    fn set_check(&self, behavior: CheckBehavior) {
        self.inner.lock().unwrap().check = behavior;
    }

    fn set_fail_submit(&self, fail: bool) {
        self.inner.lock().unwrap().fail_submit = fail;
    }

    fn submitted(&self) -> Vec<(Address, U256)> {
        self.inner.lock().unwrap().submitted.clone()
    }

    fn outcome(tx_hash: TxHash, block_height: u64) -> TransferOutcome {
        TransferOutcome {
            tx_hash,
            block_height,
            fee_spent_wei: U256::from(21_000u64) * U256::from(1_000_000_000u64),
        }
    }
}

#[async_trait]
impl ChainConnector for MockChain {
    async fn connect(&self) -> ChainResult<Box<dyn ChainSession>> {
        if self.inner.lock().unwrap().fail_connect {
            return Err(ChainError::NoReachableEndpoint { attempted: 1 });
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl ChainSession for MockChain {
    fn operator_address(&self) -> Address {
        self.inner.lock().unwrap().operator
    }

    async fn current_height(&self) -> ChainResult<u64> {
        Ok(128)
    }

    async fn account_balance(&self, _address: Address) -> ChainResult<U256> {
        Ok(self.inner.lock().unwrap().balance_wei)
    }

    async fn fee_estimate(&self) -> ChainResult<FeeEstimate> {
        Ok(FeeEstimate {
            max_fee_per_gas: 30_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
        })
    }

    async fn submit(&self, transfer: ChainTransfer) -> ChainResult<TxHash> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_submit {
            return Err(ChainError::Rpc("broadcast rejected".to_string()));
        }
        inner.submitted.push((transfer.to, transfer.value_wei));
        inner.hash_counter += 1;
        let mut bytes = [0u8; 32];
        bytes[31] = inner.hash_counter;
        Ok(TxHash::from(bytes))
    }

    async fn await_confirmation(
        &self,
        tx_hash: TxHash,
        _min_confirmations: u64,
    ) -> ChainResult<TransferOutcome> {
        match self.inner.lock().unwrap().confirm {
            ConfirmBehavior::ConfirmAt(block) => Ok(Self::outcome(tx_hash, block)),
            ConfirmBehavior::Timeout => Err(ChainError::ConfirmationTimeout {
                tx_hash,
                waited_secs: 1,
            }),
            ConfirmBehavior::Dropped => Err(ChainError::TransactionDropped { tx_hash }),
        }
    }

    async fn check_receipt(
        &self,
        tx_hash: TxHash,
        _min_confirmations: u64,
    ) -> ChainResult<ReceiptStatus> {
        match self.inner.lock().unwrap().check {
            CheckBehavior::ConfirmedAt(block) => {
                Ok(ReceiptStatus::Confirmed(Self::outcome(tx_hash, block)))
            }
            CheckBehavior::Pending => Ok(ReceiptStatus::Pending),
            CheckBehavior::Unknown => Ok(ReceiptStatus::Unknown),
        }
    }
}

const RATE: &str = "3450";

fn settings() -> EngineSettings {
    EngineSettings {
        treasury: Address::repeat_byte(0x42),
        fee_reserve: dec("0.005"),
        min_confirmations: 1,
        explorer_tx_url: "https://etherscan.io/tx/{tx}".to_string(),
    }
}

fn engine_with(chain: &MockChain) -> (Arc<Ledger>, ConversionEngine) {
    let ledger = Arc::new(Ledger::new(dec(RATE)));
    let engine = ConversionEngine::new(ledger.clone(), Arc::new(chain.clone()), settings());
    (ledger, engine)
}

fn percent(p: &str) -> TransferRequest {
    TransferRequest {
        recipient: None,
        amount: AmountSelector::Percent(dec(p)),
    }
}

#[tokio::test]
async fn test_fifty_percent_conversion_commits_exactly_sent_amount() {
    let chain = MockChain::new("0.02");
    let (ledger, engine) = engine_with(&chain);

    ledger.credit(Some(dec("100")), None, "api").unwrap();
    let available = ledger.available().native;
    let expected = available / Decimal::TWO;

    let outcome = engine.convert(percent("50")).await.unwrap();
    let receipt = match outcome {
        ConversionOutcome::Committed(receipt) => receipt,
        other => panic!("expected committed, got {other:?}"),
    };

    assert_eq!(receipt.native_sent, expected);
    assert_eq!(receipt.recipient, Address::repeat_byte(0x42));
    assert_eq!(receipt.block_height, 128);
    assert_eq!(receipt.fiat_equivalent, expected * dec(RATE));
    assert!(receipt.explorer_url.starts_with("https://etherscan.io/tx/0x"));

    let totals = ledger.totals();
    assert_eq!(totals.withdrawn_native, expected);
    assert_eq!(totals.reserved_native, Decimal::ZERO);
    assert_eq!(ledger.available().native, available - expected);

    // The broadcast value matches the committed amount exactly.
    let submitted = chain.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].1, native_to_wei(expected).unwrap());
}

#[tokio::test]
async fn test_underfunded_operator_rolls_back() {
    // Balance below the fee reserve: nothing is sendable.
    let chain = MockChain::new("0.002");
    let (ledger, engine) = engine_with(&chain);
    ledger.credit(Some(dec("100")), None, "api").unwrap();

    let err = engine.convert(percent("50")).await.unwrap_err();
    match err {
        ConvertError::OperatorWalletUnderfunded { balance, .. } => {
            assert_eq!(balance, dec("0.002"));
        }
        other => panic!("expected underfunded, got {other}"),
    }

    let totals = ledger.totals();
    assert_eq!(totals.reserved_native, Decimal::ZERO);
    assert_eq!(totals.withdrawn_native, Decimal::ZERO);
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_sendable_capped_by_operator_balance() {
    // Requested 100% but the operator can only cover 0.01 after the
    // reserve; the engine sends the capped amount and commits only that.
    let chain = MockChain::new("0.015");
    let (ledger, engine) = engine_with(&chain);
    ledger.credit(Some(dec("100")), None, "api").unwrap();
    let available = ledger.available().native;
    assert!(available > dec("0.01"));

    let outcome = engine
        .convert(TransferRequest {
            recipient: None,
            amount: AmountSelector::All,
        })
        .await
        .unwrap();

    let receipt = match outcome {
        ConversionOutcome::Committed(receipt) => receipt,
        other => panic!("expected committed, got {other:?}"),
    };
    assert_eq!(receipt.native_sent, dec("0.01"));

    let totals = ledger.totals();
    assert_eq!(totals.withdrawn_native, dec("0.01"));
    assert_eq!(totals.reserved_native, Decimal::ZERO);
}

#[tokio::test]
async fn test_submission_failure_rolls_back() {
    let chain = MockChain::new("1");
    chain.set_fail_submit(true);
    let (ledger, engine) = engine_with(&chain);
    ledger.credit(Some(dec("100")), None, "api").unwrap();

    let err = engine.convert(percent("50")).await.unwrap_err();
    assert!(matches!(err, ConvertError::SubmissionFailed(_)));

    assert_eq!(ledger.totals().reserved_native, Decimal::ZERO);
    assert_eq!(ledger.totals().withdrawn_native, Decimal::ZERO);
}

#[tokio::test]
async fn test_confirmation_timeout_holds_reservation_then_reconcile_commits_once() {
    let chain = MockChain::new("1");
    chain.set_confirm(ConfirmBehavior::Timeout);
    let (ledger, engine) = engine_with(&chain);
    ledger.credit(Some(dec("100")), None, "api").unwrap();

    let outcome = engine.convert(percent("50")).await.unwrap();
    let (tx_hash, submitted) = match outcome {
        ConversionOutcome::PendingUnconfirmed {
            tx_hash,
            native_submitted,
        } => (tx_hash, native_submitted),
        other => panic!("expected pending, got {other:?}"),
    };

    // Reservation is still held; nothing is withdrawn yet.
    let totals = ledger.totals();
    assert_eq!(totals.reserved_native, submitted);
    assert_eq!(totals.withdrawn_native, Decimal::ZERO);

    let pending = engine.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].tx_hash, tx_hash);

    // A second conversion is refused while the reservation is held.
    let err = engine.convert(percent("10")).await.unwrap_err();
    assert!(matches!(
        err,
        ConvertError::Ledger(LedgerError::ReservationInProgress { .. })
    ));

    // Still pending on the first reconcile attempt.
    chain.set_check(CheckBehavior::Pending);
    assert!(matches!(
        engine.reconcile(tx_hash).await.unwrap(),
        ReconcileOutcome::StillPending
    ));
    assert_eq!(ledger.totals().reserved_native, submitted);

    // The transaction lands; reconciliation commits it exactly once.
    chain.set_check(CheckBehavior::ConfirmedAt(200));
    let receipt = match engine.reconcile(tx_hash).await.unwrap() {
        ReconcileOutcome::Committed(receipt) => receipt,
        other => panic!("expected committed, got {other:?}"),
    };
    assert_eq!(receipt.block_height, 200);
    assert_eq!(receipt.native_sent, submitted);

    let totals = ledger.totals();
    assert_eq!(totals.withdrawn_native, submitted);
    assert_eq!(totals.reserved_native, Decimal::ZERO);

    // Re-reconciling the same hash is a no-op, not a double commit.
    assert!(matches!(
        engine.reconcile(tx_hash).await.unwrap(),
        ReconcileOutcome::AlreadyReconciled
    ));
    assert_eq!(ledger.totals().withdrawn_native, submitted);
    assert!(engine.pending().is_empty());
}

#[tokio::test]
async fn test_reconcile_dropped_transaction_releases_reservation() {
    let chain = MockChain::new("1");
    chain.set_confirm(ConfirmBehavior::Dropped);
    let (ledger, engine) = engine_with(&chain);
    ledger.credit(Some(dec("100")), None, "api").unwrap();
    let before = ledger.available().native;

    let outcome = engine.convert(percent("50")).await.unwrap();
    let tx_hash = match outcome {
        ConversionOutcome::PendingUnconfirmed { tx_hash, .. } => tx_hash,
        other => panic!("expected pending, got {other:?}"),
    };

    chain.set_check(CheckBehavior::Unknown);
    let released = match engine.reconcile(tx_hash).await.unwrap() {
        ReconcileOutcome::Dropped { released } => released,
        other => panic!("expected dropped, got {other:?}"),
    };
    assert!(released > Decimal::ZERO);

    // Funds are back; nothing was withdrawn.
    assert_eq!(ledger.available().native, before);
    assert_eq!(ledger.totals().withdrawn_native, Decimal::ZERO);
}

#[tokio::test]
async fn test_requested_exceeds_available_is_rejected_without_side_effects() {
    let chain = MockChain::new("1");
    let (ledger, engine) = engine_with(&chain);
    ledger.credit(Some(dec("10")), None, "api").unwrap();

    let err = engine
        .convert(TransferRequest {
            recipient: None,
            amount: AmountSelector::Native(dec("1")),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::RequestedExceedsAvailable { .. }));
    assert_eq!(ledger.totals().reserved_native, Decimal::ZERO);
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_empty_ledger_has_nothing_to_convert() {
    let chain = MockChain::new("1");
    let (_ledger, engine) = engine_with(&chain);

    let err = engine
        .convert(TransferRequest {
            recipient: None,
            amount: AmountSelector::All,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::NothingToConvert { .. }));
}

#[tokio::test]
async fn test_explicit_recipient_overrides_treasury() {
    let chain = MockChain::new("1");
    let (ledger, engine) = engine_with(&chain);
    ledger.credit(Some(dec("100")), None, "api").unwrap();

    let other = Address::repeat_byte(0x77);
    let outcome = engine
        .convert(TransferRequest {
            recipient: Some(other),
            amount: AmountSelector::Percent(dec("25")),
        })
        .await
        .unwrap();

    match outcome {
        ConversionOutcome::Committed(receipt) => assert_eq!(receipt.recipient, other),
        other => panic!("expected committed, got {other:?}"),
    }
    assert_eq!(chain.submitted()[0].0, other);
}
