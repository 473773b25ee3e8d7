//! simple_bank Library
//!
//! Double-entry ledger transfers on PostgreSQL, with the HTTP service layer
//! around them. Re-exports modules for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod store;

pub use config::Config;
pub use domain::{Account, Entry, OperationContext, Transfer, TransferTxnParams, TransferTxnResult};
pub use error::{AppError, AppResult};
pub use store::{ErrorKind, MemoryStore, PgStore, Store, StoreError};
