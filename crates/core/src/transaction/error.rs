//! Transaction Creator error types.

use thiserror::Error;

/// Errors raised by the Transaction Creator.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction storage error: {0}")]
    Storage(String),
}

impl From<TransactionError> for ledgerstream_shared::AppError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Storage(msg) => Self::Database(msg),
        }
    }
}
