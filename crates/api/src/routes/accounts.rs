//! Account balance routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_core::balance::{Account, AuditReport, LedgerRecord, OperationType};
use tally_shared::types::{AccountId, TransactionId};

use crate::{AppState, error::ApiError};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/{id}", get(get_account).patch(update_balance))
        .route("/accounts/{id}/transactions", get(list_transactions))
        .route("/accounts/{id}/audit", get(audit_account))
}

/// Request body for opening an account.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    /// Opening balance, non-negative.
    pub initial_balance: Decimal,
}

/// Request body for a deposit or withdrawal.
#[derive(Debug, Deserialize)]
pub struct UpdateBalanceRequest {
    /// Amount to apply. The sign is ignored; `type` decides the direction.
    pub amount: Decimal,
    /// `deposit` or `withdraw`.
    #[serde(rename = "type")]
    pub operation: OperationType,
}

/// Response for an account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// Account ID.
    pub id: AccountId,
    /// Current balance.
    pub balance: Decimal,
    /// Balance the account was opened with.
    pub initial_balance: Decimal,
    /// Number of committed balance updates.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last committed update.
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            balance: account.balance,
            initial_balance: account.initial_balance,
            version: account.version,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Response for a ledger record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Record ID.
    pub id: TransactionId,
    /// Owning account.
    pub account_id: AccountId,
    /// `deposit` or `withdraw`.
    #[serde(rename = "type")]
    pub operation: OperationType,
    /// Signed balance change.
    pub amount_change: Decimal,
    /// Balance after the change.
    pub balance: Decimal,
    /// Account version after the change.
    pub version: i64,
    /// Commit timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<LedgerRecord> for TransactionResponse {
    fn from(record: LedgerRecord) -> Self {
        Self {
            id: record.id,
            account_id: record.account_id,
            operation: record.operation,
            amount_change: record.amount_change,
            balance: record.balance,
            version: record.version,
            created_at: record.created_at,
        }
    }
}

/// POST `/accounts` - Open an account.
async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.service.create_account(payload.initial_balance).await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

/// GET `/accounts/{id}` - Read an account.
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.service.get_account(id).await?;
    Ok(Json(account.into()))
}

/// PATCH `/accounts/{id}` - Deposit or withdraw.
async fn update_balance(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
    Json(payload): Json<UpdateBalanceRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .service
        .update_balance(id, payload.amount, payload.operation)
        .await?;
    Ok(Json(account.into()))
}

/// GET `/accounts/{id}/transactions` - Ledger history, oldest first.
async fn list_transactions(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let records = state.service.list_transactions(id).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// GET `/accounts/{id}/audit` - Replay the ledger against the stored balance.
async fn audit_account(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Result<Json<AuditReport>, ApiError> {
    Ok(Json(state.service.audit_account(id).await?))
}
