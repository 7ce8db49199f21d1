//! Ledger Service (§4.9): append-only, idempotent balance-changing entries.

mod error;
mod service;
#[cfg(test)]
mod service_props;
mod types;

pub use error::LedgerError;
pub use service::{LedgerRepository, LedgerService, MAX_APPEND_RETRIES};
pub use types::{AppendRequest, BalanceHistoryPoint, LedgerEntry, LedgerTransactionType};
