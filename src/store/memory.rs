//! In-memory store
//!
//! Implements [`Store`] over maps behind one async mutex. Used to exercise
//! the service layer without a database. The transfer path stages every
//! write before applying any of them, so a failed transfer leaves nothing
//! behind, matching the database-backed store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::{
    Account, CreateAccountParams, Entry, ListAccountsParams, ListEntriesParams, OperationContext,
    Transfer, TransferTxnParams, TransferTxnResult,
};

use super::transfer::{balance_adjustments, validate};
use super::{Store, StoreError, Violation};

#[derive(Debug, Default)]
struct Ledger {
    accounts: BTreeMap<i64, Account>,
    transfers: BTreeMap<i64, Transfer>,
    entries: BTreeMap<i64, Entry>,
    last_account_id: i64,
    last_transfer_id: i64,
    last_entry_id: i64,
}

impl Ledger {
    fn account(&self, id: i64) -> Result<&Account, StoreError> {
        self.accounts
            .get(&id)
            .ok_or_else(|| StoreError::account_not_found(id))
    }
}

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledger: Mutex<Ledger>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored transfers and entries
    pub async fn row_counts(&self) -> (usize, usize) {
        let ledger = self.ledger.lock().await;
        (ledger.transfers.len(), ledger.entries.len())
    }
}

fn adjusted(account: &Account, delta: i64) -> Result<Account, StoreError> {
    let balance = account.balance.checked_add(delta).ok_or_else(|| {
        StoreError::InvalidArgument(format!("balance overflow on account {}", account.id))
    })?;

    Ok(Account {
        balance,
        ..account.clone()
    })
}

fn page<T>(rows: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    rows.skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError> {
        let mut ledger = self.ledger.lock().await;

        let duplicate = ledger
            .accounts
            .values()
            .any(|a| a.user_id == params.user_id && a.currency == params.currency);
        if duplicate {
            return Err(StoreError::ConstraintViolation {
                violation: Violation::Unique,
                constraint: Some("accounts_user_currency_key".to_string()),
                message: format!(
                    "user {} already has a {} account",
                    params.user_id, params.currency
                ),
            });
        }

        ledger.last_account_id += 1;
        let account = Account {
            id: ledger.last_account_id,
            user_id: params.user_id,
            balance: params.balance,
            currency: params.currency,
            created_at: Utc::now(),
        };
        ledger.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn get_account(&self, id: i64) -> Result<Account, StoreError> {
        let ledger = self.ledger.lock().await;
        ledger.account(id).cloned()
    }

    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError> {
        let ledger = self.ledger.lock().await;
        let owned = ledger
            .accounts
            .values()
            .filter(|a| a.user_id == params.user_id)
            .cloned();
        Ok(page(owned, params.limit, params.offset))
    }

    async fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError> {
        let ledger = self.ledger.lock().await;
        ledger.transfers.get(&id).cloned().ok_or(StoreError::NotFound {
            entity: "Transfer",
            id,
        })
    }

    async fn get_entry(&self, id: i64) -> Result<Entry, StoreError> {
        let ledger = self.ledger.lock().await;
        ledger
            .entries
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "Entry", id })
    }

    async fn list_entries(&self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError> {
        let ledger = self.ledger.lock().await;
        let posted = ledger
            .entries
            .values()
            .filter(|e| e.account_id == params.account_id)
            .cloned();
        Ok(page(posted, params.limit, params.offset))
    }

    async fn transfer_txn(
        &self,
        params: TransferTxnParams,
        ctx: &OperationContext,
    ) -> Result<TransferTxnResult, StoreError> {
        validate(&params)?;

        let mut ledger = self.ledger.lock().await;
        ledger.account(params.from_account_id)?;
        ledger.account(params.to_account_id)?;

        let now = Utc::now();
        let transfer = Transfer {
            id: ledger.last_transfer_id + 1,
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
            created_at: now,
        };
        let from_entry = Entry {
            id: ledger.last_entry_id + 1,
            account_id: params.from_account_id,
            amount: -params.amount,
            created_at: now,
        };
        let to_entry = Entry {
            id: ledger.last_entry_id + 2,
            account_id: params.to_account_id,
            amount: params.amount,
            created_at: now,
        };

        let [(first_id, first_delta), (second_id, second_delta)] = balance_adjustments(&params);
        let first = adjusted(ledger.account(first_id)?, first_delta)?;
        let second = adjusted(ledger.account(second_id)?, second_delta)?;

        // Nothing below can fail
        ledger.last_transfer_id = transfer.id;
        ledger.last_entry_id = to_entry.id;
        ledger.transfers.insert(transfer.id, transfer.clone());
        ledger.entries.insert(from_entry.id, from_entry.clone());
        ledger.entries.insert(to_entry.id, to_entry.clone());
        ledger.accounts.insert(first.id, first.clone());
        ledger.accounts.insert(second.id, second.clone());

        let (from_account, to_account) = if first.id == params.from_account_id {
            (first, second)
        } else {
            (second, first)
        };

        tracing::debug!(
            transfer_id = transfer.id,
            correlation_id = ?ctx.correlation_id,
            "In-memory transfer applied"
        );

        Ok(TransferTxnResult {
            transfer,
            from_account,
            to_account,
            from_entry,
            to_entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ErrorKind;
    use std::sync::Arc;

    async fn open(store: &MemoryStore, user_id: i64, balance: i64) -> Account {
        store
            .create_account(CreateAccountParams {
                user_id,
                currency: "USD".to_string(),
                balance,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_transfer_moves_balance() {
        let store = MemoryStore::new();
        let a = open(&store, 1, 100).await;
        let b = open(&store, 2, 50).await;

        let result = store
            .transfer_txn(TransferTxnParams::new(a.id, b.id, 10), &OperationContext::new())
            .await
            .unwrap();

        assert_eq!(result.from_account.id, a.id);
        assert_eq!(result.from_account.balance, 90);
        assert_eq!(result.to_account.id, b.id);
        assert_eq!(result.to_account.balance, 60);
        assert_eq!(result.from_entry.amount + result.to_entry.amount, 0);
        assert_eq!(store.row_counts().await, (1, 2));
    }

    #[tokio::test]
    async fn test_reverse_direction_maps_roles() {
        let store = MemoryStore::new();
        let a = open(&store, 1, 100).await;
        let b = open(&store, 2, 50).await;

        let result = store
            .transfer_txn(TransferTxnParams::new(b.id, a.id, 20), &OperationContext::new())
            .await
            .unwrap();

        assert_eq!(result.from_account.id, b.id);
        assert_eq!(result.from_account.balance, 30);
        assert_eq!(result.to_account.id, a.id);
        assert_eq!(result.to_account.balance, 120);
    }

    #[tokio::test]
    async fn test_missing_account_leaves_no_rows() {
        let store = MemoryStore::new();
        let a = open(&store, 1, 100).await;

        let err = store
            .transfer_txn(TransferTxnParams::new(a.id, 999, 10), &OperationContext::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.row_counts().await, (0, 0));
        assert_eq!(store.get_account(a.id).await.unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_balance_overflow_leaves_no_rows() {
        let store = MemoryStore::new();
        let full = open(&store, 1, i64::MAX).await;
        let payer = open(&store, 2, 10).await;

        let err = store
            .transfer_txn(TransferTxnParams::new(payer.id, full.id, 1), &OperationContext::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(store.row_counts().await, (0, 0));
        assert_eq!(store.get_account(full.id).await.unwrap().balance, i64::MAX);
        assert_eq!(store.get_account(payer.id).await.unwrap().balance, 10);
    }

    #[tokio::test]
    async fn test_duplicate_currency_account_rejected() {
        let store = MemoryStore::new();
        open(&store, 1, 0).await;

        let err = store
            .create_account(CreateAccountParams {
                user_id: 1,
                currency: "USD".to_string(),
                balance: 0,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[tokio::test]
    async fn test_concurrent_opposing_transfers() {
        let store = Arc::new(MemoryStore::new());
        let a = open(&store, 1, 1_000).await;
        let b = open(&store, 2, 1_000).await;

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            let (from, to) = if i % 2 == 0 { (a.id, b.id) } else { (b.id, a.id) };
            handles.push(tokio::spawn(async move {
                store
                    .transfer_txn(TransferTxnParams::new(from, to, 10), &OperationContext::new())
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.get_account(a.id).await.unwrap().balance, 1_000);
        assert_eq!(store.get_account(b.id).await.unwrap().balance, 1_000);
        assert_eq!(store.row_counts().await, (10, 20));
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let store = MemoryStore::new();
        for currency in ["USD", "EUR", "CAD"] {
            store
                .create_account(CreateAccountParams {
                    user_id: 5,
                    currency: currency.to_string(),
                    balance: 0,
                })
                .await
                .unwrap();
        }
        open(&store, 6, 0).await;

        let first = store
            .list_accounts(ListAccountsParams {
                user_id: 5,
                limit: 2,
                offset: 0,
            })
            .await
            .unwrap();
        let rest = store
            .list_accounts(ListAccountsParams {
                user_id: 5,
                limit: 2,
                offset: 2,
            })
            .await
            .unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(rest.len(), 1);
        assert!(first.iter().chain(&rest).all(|a| a.user_id == 5));
    }
}
