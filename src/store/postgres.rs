//! PostgreSQL store

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{
    Account, CreateAccountParams, Entry, ListAccountsParams, ListEntriesParams, OperationContext,
    Transfer, TransferTxnParams, TransferTxnResult,
};

use super::{transfer, Queries, Store, StoreError};

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new PgStore with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Queries::new(&mut conn).create_account(&params).await
    }

    async fn get_account(&self, id: i64) -> Result<Account, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Queries::new(&mut conn).get_account(id).await
    }

    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Queries::new(&mut conn).list_accounts(&params).await
    }

    async fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Queries::new(&mut conn).get_transfer(id).await
    }

    async fn get_entry(&self, id: i64) -> Result<Entry, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Queries::new(&mut conn).get_entry(id).await
    }

    async fn list_entries(&self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Queries::new(&mut conn).list_entries(&params).await
    }

    async fn transfer_txn(
        &self,
        params: TransferTxnParams,
        ctx: &OperationContext,
    ) -> Result<TransferTxnResult, StoreError> {
        transfer::transfer_txn(&self.pool, params, ctx).await
    }
}
