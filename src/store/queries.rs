//! Record Repository
//!
//! Single-statement reads and writes against `accounts`, `transfers` and
//! `entries`. A `Queries` is bound to one connection: a pooled connection
//! for plain reads, or the connection of an in-flight transaction when
//! handed out by [`super::exec_txn`].

use sqlx::PgConnection;

use crate::domain::{
    Account, CreateAccountParams, Entry, ListAccountsParams, ListEntriesParams, Transfer,
};

use super::StoreError;

/// Statements bound to one connection
pub struct Queries<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> Queries<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Server process id of the bound connection
    pub async fn backend_pid(&mut self) -> Result<i32, StoreError> {
        let pid = sqlx::query_scalar("SELECT pg_backend_pid()")
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(pid)
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    pub async fn create_account(
        &mut self,
        params: &CreateAccountParams,
    ) -> Result<Account, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (user_id, balance, currency)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, balance, currency, created_at
            "#,
        )
        .bind(params.user_id)
        .bind(params.balance)
        .bind(&params.currency)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(account)
    }

    pub async fn get_account(&mut self, id: i64) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, user_id, balance, currency, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StoreError::account_not_found(id))
    }

    pub async fn list_accounts(
        &mut self,
        params: &ListAccountsParams,
    ) -> Result<Vec<Account>, StoreError> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, user_id, balance, currency, created_at
            FROM accounts
            WHERE user_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(params.user_id)
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(accounts)
    }

    /// Add `delta` to the stored balance and return the updated row.
    ///
    /// The store evaluates `balance + $2` itself while holding the row lock,
    /// so concurrent adjustments of one account serialize without lost
    /// updates.
    pub async fn add_account_balance(
        &mut self,
        id: i64,
        delta: i64,
    ) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET balance = balance + $2
            WHERE id = $1
            RETURNING id, user_id, balance, currency, created_at
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StoreError::account_not_found(id))
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    pub async fn create_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            INSERT INTO transfers (from_account_id, to_account_id, amount)
            VALUES ($1, $2, $3)
            RETURNING id, from_account_id, to_account_id, amount, created_at
            "#,
        )
        .bind(from_account_id)
        .bind(to_account_id)
        .bind(amount)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(transfer)
    }

    pub async fn get_transfer(&mut self, id: i64) -> Result<Transfer, StoreError> {
        sqlx::query_as::<_, Transfer>(
            r#"
            SELECT id, from_account_id, to_account_id, amount, created_at
            FROM transfers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "Transfer",
            id,
        })
    }

    // =========================================================================
    // Entries
    // =========================================================================

    pub async fn create_entry(
        &mut self,
        account_id: i64,
        amount: i64,
    ) -> Result<Entry, StoreError> {
        let entry = sqlx::query_as::<_, Entry>(
            r#"
            INSERT INTO entries (account_id, amount)
            VALUES ($1, $2)
            RETURNING id, account_id, amount, created_at
            "#,
        )
        .bind(account_id)
        .bind(amount)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(entry)
    }

    pub async fn get_entry(&mut self, id: i64) -> Result<Entry, StoreError> {
        sqlx::query_as::<_, Entry>(
            r#"
            SELECT id, account_id, amount, created_at
            FROM entries
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or(StoreError::NotFound { entity: "Entry", id })
    }

    pub async fn list_entries(
        &mut self,
        params: &ListEntriesParams,
    ) -> Result<Vec<Entry>, StoreError> {
        let entries = sqlx::query_as::<_, Entry>(
            r#"
            SELECT id, account_id, amount, created_at
            FROM entries
            WHERE account_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(params.account_id)
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(entries)
    }
}
