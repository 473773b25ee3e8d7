//! Domain module
//!
//! Ledger records and request-scoped metadata.

pub mod context;
pub mod currency;
pub mod models;

pub use context::OperationContext;
pub use currency::{Currency, CurrencyError};
pub use models::{
    Account, CreateAccountParams, Entry, ListAccountsParams, ListEntriesParams, Transfer,
    TransferTxnParams, TransferTxnResult,
};
