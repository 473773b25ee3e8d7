//! Store Errors
//!
//! Error types for ledger persistence and the transfer engine.

/// Coarse error classification surfaced to the service layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed amount or identical accounts
    InvalidArgument,
    /// Referenced record absent at read or write time
    NotFound,
    /// Referential, uniqueness or check failure reported by the store
    ConstraintViolation,
    /// Transaction lifecycle or connection failure
    InternalFailure,
}

/// Which integrity rule the store rejected a write with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    ForeignKey,
    Unique,
    Check,
    NotNull,
}

/// Errors that can occur in the store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Constraint violation: {message}")]
    ConstraintViolation {
        violation: Violation,
        constraint: Option<String>,
        message: String,
    },

    #[error("Failed to begin transaction: {0}")]
    Begin(#[source] sqlx::Error),

    #[error("Failed to commit transaction: {0}")]
    Commit(#[source] sqlx::Error),

    /// The unit of work failed and so did the rollback. Both are kept.
    #[error("Transaction error: {source}, rollback error: {rollback}")]
    RollbackFailed {
        source: Box<StoreError>,
        rollback: sqlx::Error,
    },

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    pub fn account_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "Account",
            id,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            StoreError::Begin(_)
            | StoreError::Commit(_)
            | StoreError::RollbackFailed { .. }
            | StoreError::Database(_) => ErrorKind::InternalFailure,
        }
    }

    /// Name of the violated constraint, if the store reported one
    pub fn constraint(&self) -> Option<&str> {
        match self {
            StoreError::ConstraintViolation { constraint, .. } => constraint.as_deref(),
            _ => None,
        }
    }

    /// Turn a foreign-key violation on `constraint` into `NotFound` for
    /// `account_id`. Any other error is returned unchanged.
    pub fn or_missing_account(self, constraint: &str, account_id: i64) -> Self {
        let missing = matches!(
            &self,
            StoreError::ConstraintViolation {
                violation: Violation::ForeignKey,
                constraint: Some(name),
                ..
            } if name == constraint
        );

        if missing {
            StoreError::account_not_found(account_id)
        } else {
            self
        }
    }
}

/// SQLSTATE `numeric_value_out_of_range`, raised when a balance leaves `BIGINT`
const NUMERIC_OUT_OF_RANGE: &str = "22003";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind as DbErrorKind;

        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE) {
                return StoreError::InvalidArgument(db_err.message().to_string());
            }

            let violation = match db_err.kind() {
                DbErrorKind::ForeignKeyViolation => Some(Violation::ForeignKey),
                DbErrorKind::UniqueViolation => Some(Violation::Unique),
                DbErrorKind::CheckViolation => Some(Violation::Check),
                DbErrorKind::NotNullViolation => Some(Violation::NotNull),
                _ => None,
            };

            if let Some(violation) = violation {
                return StoreError::ConstraintViolation {
                    violation,
                    constraint: db_err.constraint().map(str::to_string),
                    message: db_err.message().to_string(),
                };
            }
        }

        StoreError::Database(err)
    }
}
