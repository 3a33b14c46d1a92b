//! # HTTP API
//!
//! | Method | Path                             | Description                    |
//! |--------|----------------------------------|--------------------------------|
//! | POST   | `/api/send`                      | Transfer between two wallets   |
//! | GET    | `/api/wallet/:address/balance`   | Balance of one wallet          |
//! | GET    | `/api/transactions?count=N`      | Last N transactions            |
//! | GET    | `/api/wallets`                   | Every wallet with its balance  |
//!
//! Amounts cross this boundary as decimal units (`12.5`); the service works in
//! cents.

mod error;

pub use error::*;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::application::LedgerService;
use crate::domain::{cents_to_units, parse_cents, Cents, Transaction, Wallet};

/// Number of transactions returned when `count` is omitted.
pub const DEFAULT_HISTORY_COUNT: i64 = 10;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LedgerService>,
}

impl AppState {
    pub fn new(service: LedgerService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /api/send`.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub from: String,
    pub to: String,
    pub amount: AmountInput,
}

/// An amount in units, given either as a JSON number or a decimal string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(serde_json::Number),
    Text(String),
}

impl AmountInput {
    /// Parse into exact cents without going through floating point.
    pub fn to_cents(&self) -> Result<Cents, ApiError> {
        let text = match self {
            AmountInput::Number(n) => n.to_string(),
            AmountInput::Text(s) => s.clone(),
        };
        parse_cents(&text)
            .map_err(|e| ApiError::BadRequest(format!("Invalid amount '{}': {}", text, e)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendResponse {
    pub message: String,
    pub transaction: TransactionView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionView {
    pub uuid: Uuid,
    pub from_address: String,
    pub to_address: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<Transaction> for TransactionView {
    fn from(tx: Transaction) -> Self {
        Self {
            uuid: tx.id,
            from_address: tx.from_address,
            to_address: tx.to_address,
            amount: cents_to_units(tx.amount_cents),
            timestamp: tx.timestamp,
        }
    }
}

impl From<Wallet> for BalanceResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            address: wallet.address,
            balance: cents_to_units(wallet.balance),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Kept as text so that a non-numeric value is a 400, not a rejection
    pub count: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/send", post(send_handler))
        .route("/api/wallet/:address/balance", get(balance_handler))
        .route("/api/transactions", get(transactions_handler))
        .route("/api/wallets", get(wallets_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let router = create_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received, draining connections");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn send_handler(
    State(state): State<AppState>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<SendResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let amount_cents = request.amount.to_cents()?;

    let transaction = state
        .service
        .transfer(&request.from, &request.to, amount_cents)
        .await?;

    Ok(Json(SendResponse {
        message: "transfer completed".to_string(),
        transaction: transaction.into(),
    }))
}

async fn balance_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.service.get_balance(&address).await?;
    Ok(Json(BalanceResponse {
        address,
        balance: cents_to_units(balance),
    }))
}

async fn transactions_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<TransactionView>>, ApiError> {
    let count = match query.count.as_deref() {
        None => DEFAULT_HISTORY_COUNT,
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ApiError::BadRequest(format!("Invalid 'count' parameter: {}", raw)))?,
    };

    let transactions = state.service.list_recent_transactions(count).await?;
    Ok(Json(transactions.into_iter().map(Into::into).collect()))
}

async fn wallets_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<BalanceResponse>>, ApiError> {
    let wallets = state.service.list_wallets().await?;
    Ok(Json(wallets.into_iter().map(Into::into).collect()))
}
