//! The earnings book: counters, reservation protocol, transaction log.
//!
//! All read-modify-write sequences run under one mutex so that two
//! concurrent conversions cannot both observe sufficient availability and
//! reserve against the same funds. The lock is never held across an await
//! point; callers get plain synchronous methods.

use rust_decimal::Decimal;
use std::sync::Mutex;
use uuid::Uuid;

use crate::ledger::types::{
    AvailableBalance, CreditReceipt, EarningsTotals, LedgerError, LedgerResult, RecordKind,
    TransactionRecord,
};

/// Claim on reserved funds during an in-flight conversion.
///
/// Returned by [`Ledger::reserve_for_withdrawal`] and accepted back by
/// commit and rollback. Holding the handle does not release the funds;
/// exactly one of commit or rollback must be called.
#[derive(Debug)]
pub struct ReservationHandle {
    id: Uuid,
    amount: Decimal,
}

impl ReservationHandle {
    /// Native amount held by this reservation.
    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

#[derive(Debug, Default)]
struct Book {
    credited_fiat: Decimal,
    credited_native: Decimal,
    withdrawn_fiat: Decimal,
    withdrawn_native: Decimal,
    /// Outstanding reservation, at most one at a time.
    reservation: Option<(Uuid, Decimal)>,
    log: Vec<TransactionRecord>,
}

impl Book {
    fn reserved_native(&self) -> Decimal {
        self.reservation.map(|(_, amount)| amount).unwrap_or(Decimal::ZERO)
    }

    fn available(&self) -> AvailableBalance {
        AvailableBalance {
            fiat: self.credited_fiat - self.withdrawn_fiat,
            native: self.credited_native - self.withdrawn_native - self.reserved_native(),
        }
    }

    fn totals(&self) -> EarningsTotals {
        EarningsTotals {
            credited_fiat: self.credited_fiat,
            credited_native: self.credited_native,
            withdrawn_fiat: self.withdrawn_fiat,
            withdrawn_native: self.withdrawn_native,
            reserved_native: self.reserved_native(),
            available: self.available(),
        }
    }
}

/// Process-wide earnings ledger.
///
/// Single logical instance, shared as `Arc<Ledger>` between the conversion
/// engine and the query surface. Backing store is volatile memory; only the
/// consistency rules are guaranteed here.
#[derive(Debug)]
pub struct Ledger {
    /// Static fiat-per-native exchange rate.
    rate: Decimal,
    book: Mutex<Book>,
}

impl Ledger {
    /// Create an empty ledger with the configured exchange rate.
    pub fn new(rate: Decimal) -> Self {
        Self {
            rate,
            book: Mutex::new(Book::default()),
        }
    }

    /// The configured fiat-per-native exchange rate.
    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Fiat value of a native amount at the configured rate.
    pub fn fiat_equivalent(&self, native: Decimal) -> Decimal {
        native * self.rate
    }

    /// Native value of a fiat amount at the configured rate.
    pub fn native_equivalent(&self, fiat: Decimal) -> Decimal {
        fiat / self.rate
    }

    /// Credit earnings into the ledger.
    ///
    /// At least one of `fiat` and `native` must be supplied; the missing
    /// side is derived at the configured rate. Appends a credit record.
    pub fn credit(
        &self,
        fiat: Option<Decimal>,
        native: Option<Decimal>,
        source: &str,
    ) -> LedgerResult<CreditReceipt> {
        let (fiat_amount, native_amount) = match (fiat, native) {
            (None, None) => {
                return Err(LedgerError::InvalidAmount(
                    "either a fiat or a native amount is required".to_string(),
                ))
            }
            (Some(f), Some(n)) => (f, n),
            (Some(f), None) => (f, self.native_equivalent(f)),
            (None, Some(n)) => (self.fiat_equivalent(n), n),
        };

        if fiat_amount <= Decimal::ZERO || native_amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "credit amounts must be positive (fiat {fiat_amount}, native {native_amount})"
            )));
        }

        let mut book = self.book.lock().unwrap();
        book.credited_fiat += fiat_amount;
        book.credited_native += native_amount;
        book.log.push(TransactionRecord {
            kind: RecordKind::Credit,
            native_amount,
            fiat_amount,
            counterparty: source.to_string(),
            tx_hash: None,
            block_height: None,
            timestamp: chrono::Utc::now(),
        });

        tracing::info!(
            fiat = %fiat_amount,
            native = %native_amount,
            source = source,
            "Earnings credited"
        );

        Ok(CreditReceipt {
            fiat_credited: fiat_amount,
            native_credited: native_amount,
            totals: book.totals(),
        })
    }

    /// Current availability, net of withdrawals and any held reservation.
    pub fn available(&self) -> AvailableBalance {
        self.book.lock().unwrap().available()
    }

    /// Snapshot of all counters.
    pub fn totals(&self) -> EarningsTotals {
        self.book.lock().unwrap().totals()
    }

    /// The most recent `n` transaction records, newest last.
    pub fn recent(&self, n: usize) -> Vec<TransactionRecord> {
        let book = self.book.lock().unwrap();
        let start = book.log.len().saturating_sub(n);
        book.log[start..].to_vec()
    }

    /// Hold `native` out of the available balance for an in-flight
    /// conversion.
    ///
    /// Only one reservation may be outstanding at a time; a second call
    /// fails with [`LedgerError::ReservationInProgress`] regardless of
    /// amount. This is the designed backpressure signal for concurrent
    /// conversion requests.
    pub fn reserve_for_withdrawal(&self, native: Decimal) -> LedgerResult<ReservationHandle> {
        if native <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "reservation amount must be positive (got {native})"
            )));
        }

        let mut book = self.book.lock().unwrap();
        if let Some((_, reserved)) = book.reservation {
            return Err(LedgerError::ReservationInProgress { reserved });
        }
        let available = book.available().native;
        if native > available {
            return Err(LedgerError::InsufficientFunds {
                requested: native,
                available,
            });
        }

        let id = Uuid::new_v4();
        book.reservation = Some((id, native));
        tracing::debug!(reservation = %id, native = %native, "Funds reserved for withdrawal");
        Ok(ReservationHandle { id, amount: native })
    }

    /// Finalize a reservation after the on-chain transfer confirmed.
    ///
    /// `actual_sent` may be less than the reserved amount (fee-adjusted)
    /// but never more; a larger value fails with
    /// [`LedgerError::OverdraftAttempt`] and leaves every counter and the
    /// reservation untouched.
    pub fn commit_withdrawal(
        &self,
        handle: &ReservationHandle,
        actual_sent: Decimal,
        recipient: &str,
        tx_hash: &str,
        block_height: u64,
    ) -> LedgerResult<()> {
        let mut book = self.book.lock().unwrap();
        let (id, reserved) = book.reservation.ok_or(LedgerError::UnknownReservation)?;
        if id != handle.id {
            return Err(LedgerError::UnknownReservation);
        }
        if actual_sent > reserved {
            return Err(LedgerError::OverdraftAttempt {
                reserved,
                attempted: actual_sent,
            });
        }

        let fiat_sent = actual_sent * self.rate;
        book.reservation = None;
        book.withdrawn_native += actual_sent;
        book.withdrawn_fiat += fiat_sent;
        book.log.push(TransactionRecord {
            kind: RecordKind::Conversion,
            native_amount: actual_sent,
            fiat_amount: fiat_sent,
            counterparty: recipient.to_string(),
            tx_hash: Some(tx_hash.to_string()),
            block_height: Some(block_height),
            timestamp: chrono::Utc::now(),
        });

        tracing::info!(
            native = %actual_sent,
            fiat = %fiat_sent,
            tx_hash = tx_hash,
            block_height = block_height,
            "Withdrawal committed"
        );
        Ok(())
    }

    /// Release a reservation with no other ledger change.
    ///
    /// Used when the on-chain step fails before anything irrevocable
    /// happened.
    pub fn rollback_reservation(&self, handle: &ReservationHandle) -> LedgerResult<()> {
        let mut book = self.book.lock().unwrap();
        let (id, reserved) = book.reservation.ok_or(LedgerError::UnknownReservation)?;
        if id != handle.id {
            return Err(LedgerError::UnknownReservation);
        }
        book.reservation = None;
        tracing::info!(reservation = %id, native = %reserved, "Reservation rolled back");
        Ok(())
    }
}
