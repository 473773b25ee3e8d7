//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Account, CreateAccountParams, Currency, Entry, ListAccountsParams, ListEntriesParams,
    OperationContext, Transfer, TransferTxnParams, TransferTxnResult,
};
use crate::error::{AppError, AppResult};

use super::AppState;

const MIN_PAGE_SIZE: i64 = 5;
const MAX_PAGE_SIZE: i64 = 10;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub user_id: i64,
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListAccountsQuery {
    pub user_id: i64,
    pub page_id: i64,
    pub page_size: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageQuery {
    pub page_id: i64,
    pub page_size: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Account the money is debited from
    pub from_account_id: i64,
    /// Account the money is credited to
    pub to_account_id: i64,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntriesResponse {
    pub account_id: i64,
    pub entries: Vec<Entry>,
}

fn parse_currency(code: &str) -> AppResult<Currency> {
    code.parse::<Currency>()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))
}

/// Translate `page_id`/`page_size` into `(limit, offset)`
fn page_bounds(page_id: i64, page_size: i64) -> AppResult<(i64, i64)> {
    if page_id < 1 {
        return Err(AppError::InvalidRequest("page_id must be at least 1".to_string()));
    }
    if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(AppError::InvalidRequest(format!(
            "page_size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}"
        )));
    }

    let offset = (page_id - 1)
        .checked_mul(page_size)
        .ok_or_else(|| AppError::InvalidRequest("page_id is out of range".to_string()))?;

    Ok((page_size, offset))
}

impl TransferRequest {
    /// Check the request shape before any account is loaded
    pub fn validate(&self) -> AppResult<Currency> {
        if self.from_account_id < 1 || self.to_account_id < 1 {
            return Err(AppError::InvalidRequest(
                "account ids must be at least 1".to_string(),
            ));
        }
        if self.amount <= 0 {
            return Err(AppError::InvalidRequest("amount must be positive".to_string()));
        }
        if self.from_account_id == self.to_account_id {
            return Err(AppError::InvalidRequest(
                "cannot transfer to the same account".to_string(),
            ));
        }

        parse_currency(&self.currency)
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account).get(list_accounts))
        .route("/accounts/:account_id", get(get_account))
        .route("/accounts/:account_id/entries", get(list_entries))
        .route("/transfers", post(create_transfer))
        .route("/transfers/:transfer_id", get(get_transfer))
}

// =========================================================================
// Accounts
// =========================================================================

/// Open a zero-balance account
async fn create_account(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<CreateAccountRequest>,
) -> AppResult<(StatusCode, Json<Account>)> {
    let currency = parse_currency(&request.currency)?;

    if !context.may_act_for(request.user_id) {
        return Err(AppError::UnauthorizedUser(request.user_id));
    }

    let account = state
        .store
        .create_account(CreateAccountParams {
            user_id: request.user_id,
            currency: currency.code().to_string(),
            balance: 0,
        })
        .await?;

    tracing::info!(account_id = account.id, user_id = account.user_id, "Account created");

    Ok((StatusCode::CREATED, Json(account)))
}

async fn get_account(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<i64>,
) -> AppResult<Json<Account>> {
    let account = state.store.get_account(account_id).await?;

    if !context.may_act_for(account.user_id) {
        return Err(AppError::UnauthorizedAccount(account.id));
    }

    Ok(Json(account))
}

async fn list_accounts(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Query(query): Query<ListAccountsQuery>,
) -> AppResult<Json<Vec<Account>>> {
    let (limit, offset) = page_bounds(query.page_id, query.page_size)?;

    if !context.may_act_for(query.user_id) {
        return Err(AppError::UnauthorizedUser(query.user_id));
    }

    let accounts = state
        .store
        .list_accounts(ListAccountsParams {
            user_id: query.user_id,
            limit,
            offset,
        })
        .await?;

    Ok(Json(accounts))
}

async fn list_entries(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<EntriesResponse>> {
    let (limit, offset) = page_bounds(query.page_id, query.page_size)?;

    let account = state.store.get_account(account_id).await?;
    if !context.may_act_for(account.user_id) {
        return Err(AppError::UnauthorizedAccount(account.id));
    }

    let entries = state
        .store
        .list_entries(ListEntriesParams {
            account_id,
            limit,
            offset,
        })
        .await?;

    Ok(Json(EntriesResponse {
        account_id,
        entries,
    }))
}

// =========================================================================
// Transfers
// =========================================================================

/// Validate a transfer request and hand it to the ledger.
///
/// The ledger adjusts balances unconditionally, so currency, ownership and
/// sufficient funds are all checked here first.
async fn create_transfer(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<TransferRequest>,
) -> AppResult<Json<TransferTxnResult>> {
    let currency = request.validate()?;

    let from_account = valid_account(&state, request.from_account_id, currency).await?;

    if !context.may_act_for(from_account.user_id) {
        return Err(AppError::UnauthorizedAccount(from_account.id));
    }

    if from_account.balance < request.amount {
        return Err(AppError::InsufficientBalance {
            account_id: from_account.id,
            balance: from_account.balance,
        });
    }

    valid_account(&state, request.to_account_id, currency).await?;

    let params = TransferTxnParams::new(
        request.from_account_id,
        request.to_account_id,
        request.amount,
    );
    let result = state.store.transfer_txn(params, &context).await?;

    tracing::info!(
        transfer_id = result.transfer.id,
        correlation_id = ?context.correlation_id,
        "Transfer completed"
    );

    Ok(Json(result))
}

async fn get_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<i64>,
) -> AppResult<Json<Transfer>> {
    let transfer = state.store.get_transfer(transfer_id).await?;
    Ok(Json(transfer))
}

/// Load an account and check it holds `currency`
async fn valid_account(
    state: &AppState,
    account_id: i64,
    currency: Currency,
) -> AppResult<Account> {
    let account = state.store.get_account(account_id).await?;

    if account.currency != currency.code() {
        return Err(AppError::CurrencyMismatch {
            account_id: account.id,
            account: account.currency,
            requested: currency.code().to_string(),
        });
    }

    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(from: i64, to: i64, amount: i64, currency: &str) -> TransferRequest {
        TransferRequest {
            from_account_id: from,
            to_account_id: to,
            amount,
            currency: currency.to_string(),
        }
    }

    #[test]
    fn test_transfer_request_validation() {
        assert_eq!(request(1, 2, 10, "USD").validate().unwrap(), Currency::Usd);
        assert!(request(0, 2, 10, "USD").validate().is_err());
        assert!(request(1, 2, 0, "USD").validate().is_err());
        assert!(request(1, 2, -5, "USD").validate().is_err());
        assert!(request(3, 3, 10, "USD").validate().is_err());
        assert!(request(1, 2, 10, "GBP").validate().is_err());
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(1, 5).unwrap(), (5, 0));
        assert_eq!(page_bounds(3, 10).unwrap(), (10, 20));
        assert!(page_bounds(0, 5).is_err());
        assert!(page_bounds(1, 4).is_err());
        assert!(page_bounds(1, 11).is_err());
    }

    #[test]
    fn test_page_bounds_rejects_offset_overflow() {
        let err = page_bounds(i64::MAX, 10).unwrap_err();
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);

        let last = i64::MAX / 10 + 1;
        assert_eq!(page_bounds(last, 10).unwrap(), (10, (last - 1) * 10));
        assert!(page_bounds(last + 1, 10).is_err());
    }
}
