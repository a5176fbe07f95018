//! HTTP boundary for the core operations.
//!
//! Thin transport glue over the ledger and conversion engine; every route
//! maps one boundary operation onto a core call and serializes the typed
//! result. `/earnings/convert` and `/earnings/cashout` are aliases for the
//! same conversion handler.

use alloy::primitives::TxHash;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::engine::convert::ConversionEngine;
use crate::engine::types::{ConvertError, TransferRequest};
use crate::ledger::types::LedgerError;
use crate::observability::metrics::record_credit;

/// Shared application state. Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversionEngine>,
    /// How many transaction records `GET /earnings` returns.
    pub recent_records: usize,
}

/// Build the full router with all boundary operations.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/earnings", get(get_earnings))
        .route("/earnings/credit", post(credit_earnings))
        .route("/earnings/convert", post(convert_earnings))
        .route("/earnings/cashout", post(convert_earnings))
        .route("/earnings/pending", get(get_pending))
        .route("/earnings/reconcile", post(reconcile))
        .route("/operator/balance", get(get_operator_balance))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error wrapper mapping the core taxonomy onto status codes: input errors
/// → 400, resource errors → 409, network errors → 502.
struct ApiError(ConvertError);

impl From<ConvertError> for ApiError {
    fn from(err: ConvertError) -> Self {
        Self(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(ConvertError::Ledger(err))
    }
}

impl From<crate::chain::types::ChainError> for ApiError {
    fn from(err: crate::chain::types::ChainError) -> Self {
        Self(ConvertError::Chain(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ConvertError::NothingToConvert { .. }
            | ConvertError::RequestedExceedsAvailable { .. }
            | ConvertError::Ledger(LedgerError::InvalidAmount(_)) => StatusCode::BAD_REQUEST,
            ConvertError::Ledger(LedgerError::InsufficientFunds { .. })
            | ConvertError::Ledger(LedgerError::ReservationInProgress { .. })
            | ConvertError::OperatorWalletUnderfunded { .. } => StatusCode::CONFLICT,
            ConvertError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ConvertError::SubmissionFailed(_) | ConvertError::Chain(_) => StatusCode::BAD_GATEWAY,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct CreditRequest {
    fiat_amount: Option<Decimal>,
    native_amount: Option<Decimal>,
    #[serde(default = "default_source")]
    source: String,
}

fn default_source() -> String {
    "api".to_string()
}

async fn credit_earnings(
    State(state): State<AppState>,
    Json(req): Json<CreditRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt =
        state
            .engine
            .ledger()
            .credit(req.fiat_amount, req.native_amount, &req.source)?;
    record_credit();
    Ok(Json(receipt))
}

#[derive(Debug, Serialize)]
struct EarningsResponse {
    totals: crate::ledger::types::EarningsTotals,
    recent_transactions: Vec<crate::ledger::types::TransactionRecord>,
}

async fn get_earnings(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.engine.ledger();
    Json(EarningsResponse {
        totals: ledger.totals(),
        recent_transactions: ledger.recent(state.recent_records),
    })
}

async fn convert_earnings(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.engine.convert(request).await?;
    Ok(Json(outcome))
}

async fn get_pending(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.pending())
}

#[derive(Debug, Deserialize)]
struct ReconcileRequest {
    tx_hash: TxHash,
}

async fn reconcile(
    State(state): State<AppState>,
    Json(req): Json<ReconcileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.engine.reconcile(req.tx_hash).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
struct OperatorBalanceResponse {
    address: String,
    native_balance: Decimal,
}

async fn get_operator_balance(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let (address, native_balance) = state.engine.operator_balance().await?;
    Ok(Json(OperatorBalanceResponse {
        address: address.to_string(),
        native_balance,
    }))
}
