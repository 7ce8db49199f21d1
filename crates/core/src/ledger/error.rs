//! Ledger error types.

use ledgerstream_shared::types::TransactionId;
use thiserror::Error;

/// Errors raised by the Ledger Service (§7, §9 "Ledger atomicity").
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A ledger entry already exists for this `transaction_id`. Callers
    /// treat re-appending as a no-op (§4.9 Idempotency).
    #[error("duplicate ledger entry for transaction {0}")]
    DuplicateEntry(TransactionId),

    /// The account's balance changed between read and write; the caller
    /// should retry with a freshly read balance.
    #[error("concurrent balance update detected")]
    BalanceConflict,

    /// Retries were exhausted (§9: N=5) without a successful append, or a
    /// post-write invariant check failed. Fatal for this approval.
    #[error("ledger invariant violated: {0}")]
    InvariantViolation(String),

    /// The referenced account does not exist.
    #[error("account not found")]
    AccountNotFound,

    /// Underlying storage failure.
    #[error("ledger storage error: {0}")]
    Storage(String),
}

impl From<LedgerError> for ledgerstream_shared::AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DuplicateEntry(id) => Self::DuplicateEntry(id.to_string()),
            LedgerError::InvariantViolation(msg) => Self::InvariantViolation(msg),
            LedgerError::AccountNotFound => Self::NotFound("account".to_string()),
            LedgerError::BalanceConflict => {
                Self::InvariantViolation("balance conflict retries exhausted".to_string())
            }
            LedgerError::Storage(msg) => Self::Database(msg),
        }
    }
}
