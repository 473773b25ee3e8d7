//! Ledger Transfer Engine
//!
//! Records one transfer, its two entries and both balance adjustments in a
//! single transaction.
//!
//! Row locks on the two accounts are taken by the balance updates. Those
//! updates are always issued lower account id first, whichever side is
//! being debited, so two transfers over the same pair of accounts lock them
//! in the same order even when they run in opposite directions. That rules
//! out the A-then-B / B-then-A circular wait.

use sqlx::PgPool;

use crate::domain::{OperationContext, TransferTxnParams, TransferTxnResult};

use super::{exec_txn, Queries, StoreError};

const TRANSFER_FROM_FK: &str = "transfers_from_account_id_fkey";
const TRANSFER_TO_FK: &str = "transfers_to_account_id_fkey";
const ENTRY_ACCOUNT_FK: &str = "entries_account_id_fkey";

/// Reject a transfer before it reaches the store
pub fn validate(params: &TransferTxnParams) -> Result<(), StoreError> {
    if params.amount <= 0 {
        return Err(StoreError::InvalidArgument(format!(
            "amount must be positive (got {})",
            params.amount
        )));
    }

    if params.from_account_id == params.to_account_id {
        return Err(StoreError::InvalidArgument(
            "cannot transfer to the same account".to_string(),
        ));
    }

    Ok(())
}

/// The two `(account_id, delta)` balance adjustments of a transfer, in the
/// order they must be applied: lower account id first.
pub fn balance_adjustments(params: &TransferTxnParams) -> [(i64, i64); 2] {
    let debit = (params.from_account_id, -params.amount);
    let credit = (params.to_account_id, params.amount);

    if params.from_account_id < params.to_account_id {
        [debit, credit]
    } else {
        [credit, debit]
    }
}

/// Move `params.amount` from one account to the other.
///
/// Either everything is written or nothing is. A missing account surfaces as
/// [`StoreError::NotFound`].
#[tracing::instrument(
    name = "transfer_txn",
    skip(pool, ctx),
    fields(
        from = params.from_account_id,
        to = params.to_account_id,
        amount = params.amount,
        correlation_id = ?ctx.correlation_id,
    ),
    err
)]
pub async fn transfer_txn(
    pool: &PgPool,
    params: TransferTxnParams,
    ctx: &OperationContext,
) -> Result<TransferTxnResult, StoreError> {
    validate(&params)?;

    let result = exec_txn(pool, move |q| Box::pin(record_transfer(q, params))).await?;

    tracing::debug!(
        transfer_id = result.transfer.id,
        from_balance = result.from_account.balance,
        to_balance = result.to_account.balance,
        "Transfer committed"
    );

    Ok(result)
}

async fn record_transfer(
    mut q: Queries<'_>,
    params: TransferTxnParams,
) -> Result<TransferTxnResult, StoreError> {
    let TransferTxnParams {
        from_account_id,
        to_account_id,
        amount,
    } = params;

    let transfer = q
        .create_transfer(from_account_id, to_account_id, amount)
        .await
        .map_err(|e| {
            e.or_missing_account(TRANSFER_FROM_FK, from_account_id)
                .or_missing_account(TRANSFER_TO_FK, to_account_id)
        })?;

    let from_entry = q
        .create_entry(from_account_id, -amount)
        .await
        .map_err(|e| e.or_missing_account(ENTRY_ACCOUNT_FK, from_account_id))?;

    let to_entry = q
        .create_entry(to_account_id, amount)
        .await
        .map_err(|e| e.or_missing_account(ENTRY_ACCOUNT_FK, to_account_id))?;

    let [(first_id, first_delta), (second_id, second_delta)] = balance_adjustments(&params);
    let first = q.add_account_balance(first_id, first_delta).await?;
    let second = q.add_account_balance(second_id, second_delta).await?;

    let (from_account, to_account) = if first.id == from_account_id {
        (first, second)
    } else {
        (second, first)
    };

    Ok(TransferTxnResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ErrorKind;

    #[test]
    fn test_lower_id_adjusted_first_when_debited() {
        let params = TransferTxnParams::new(3, 8, 25);
        assert_eq!(balance_adjustments(&params), [(3, -25), (8, 25)]);
    }

    #[test]
    fn test_lower_id_adjusted_first_when_credited() {
        let params = TransferTxnParams::new(8, 3, 25);
        assert_eq!(balance_adjustments(&params), [(3, 25), (8, -25)]);
    }

    #[test]
    fn test_opposite_transfers_share_lock_order() {
        let forward = balance_adjustments(&TransferTxnParams::new(11, 4, 1));
        let backward = balance_adjustments(&TransferTxnParams::new(4, 11, 1));

        let forward_ids: Vec<i64> = forward.iter().map(|(id, _)| *id).collect();
        let backward_ids: Vec<i64> = backward.iter().map(|(id, _)| *id).collect();
        assert_eq!(forward_ids, backward_ids);
    }

    #[test]
    fn test_adjustments_sum_to_zero() {
        let [(_, a), (_, b)] = balance_adjustments(&TransferTxnParams::new(5, 2, 40));
        assert_eq!(a + b, 0);
    }

    #[test]
    fn test_validate_rejects_non_positive_amount() {
        for amount in [0, -1, i64::MIN] {
            let err = validate(&TransferTxnParams::new(1, 2, amount)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn test_validate_rejects_same_account() {
        let err = validate(&TransferTxnParams::new(4, 4, 10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(validate(&TransferTxnParams::new(4, 5, 10)).is_ok());
    }
}
