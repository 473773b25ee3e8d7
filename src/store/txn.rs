//! Transaction Coordinator
//!
//! Runs a unit of work inside one database transaction.

use futures::future::BoxFuture;
use sqlx::PgPool;

use super::{Queries, StoreError};

/// Run `work` against a [`Queries`] bound to a fresh transaction.
///
/// Commits when `work` succeeds. When it fails the transaction is rolled
/// back and the error returned; if the rollback fails too, both errors are
/// returned together as [`StoreError::RollbackFailed`]. The transaction never
/// outlives this call: if the returned future is dropped early, sqlx rolls
/// the transaction back when it is dropped.
pub async fn exec_txn<T, F>(pool: &PgPool, work: F) -> Result<T, StoreError>
where
    F: for<'c> FnOnce(Queries<'c>) -> BoxFuture<'c, Result<T, StoreError>>,
{
    let mut tx = pool.begin().await.map_err(StoreError::Begin)?;

    let outcome = work(Queries::new(&mut *tx)).await;

    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(StoreError::Commit)?;
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Unit of work failed, rolling back");

            if let Err(rollback) = tx.rollback().await {
                tracing::error!(
                    error = %err,
                    rollback_error = %rollback,
                    "Rollback failed"
                );
                return Err(StoreError::RollbackFailed {
                    source: Box::new(err),
                    rollback,
                });
            }

            Err(err)
        }
    }
}
