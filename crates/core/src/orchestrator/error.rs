//! Orchestrator error types (§7).

use thiserror::Error;

use crate::category::CategoryError;
use crate::extraction::ExtractionError;
use crate::ledger::LedgerError;
use crate::transaction::TransactionError;

/// Errors raised while running one document through the pipeline.
///
/// Most failures here are terminal for that document (the Orchestrator
/// catches them and marks the document `failed`) rather than bubbling up
/// to the caller — see `Orchestrator::run` vs `process_document`.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("document repository error: {0}")]
    Repository(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("per-document processing budget exceeded")]
    Timeout,
}

impl From<OrchestratorError> for ledgerstream_shared::AppError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Timeout => Self::Timeout("document processing budget exceeded".to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}
