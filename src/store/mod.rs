//! Store module
//!
//! Persistence for accounts, transfers and entries, and the transfer
//! engine that ties them together.
//!
//! The service layer only sees the [`Store`] capability. [`PgStore`] is the
//! production implementation on PostgreSQL and [`MemoryStore`] keeps
//! everything in process memory for tests.

mod error;
mod memory;
mod postgres;
mod queries;
pub mod transfer;
mod txn;

use async_trait::async_trait;

use crate::domain::{
    Account, CreateAccountParams, Entry, ListAccountsParams, ListEntriesParams, OperationContext,
    Transfer, TransferTxnParams, TransferTxnResult,
};

pub use error::{ErrorKind, StoreError, Violation};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use queries::Queries;
pub use txn::exec_txn;

/// Ledger operations available to the service layer
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError>;

    async fn get_account(&self, id: i64) -> Result<Account, StoreError>;

    /// Accounts of one user, ordered by id
    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError>;

    async fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError>;

    async fn get_entry(&self, id: i64) -> Result<Entry, StoreError>;

    /// Entries posted against one account, ordered by id
    async fn list_entries(&self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError>;

    /// Atomically move money between two accounts.
    ///
    /// Callers check existence, currency, ownership and balance first; this
    /// only rejects a non-positive amount or identical accounts.
    async fn transfer_txn(
        &self,
        params: TransferTxnParams,
        ctx: &OperationContext,
    ) -> Result<TransferTxnResult, StoreError>;
}
