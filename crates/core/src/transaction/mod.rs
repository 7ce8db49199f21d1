//! Transaction Creator (§4.8): decides whether and how to materialize
//! extracted records as transactions.

mod error;
mod service;
mod types;

pub use error::TransactionError;
pub use service::{TransactionCreator, TransactionRepository};
pub use types::{CreateTransactionInput, CreationOutcome, Transaction, TransactionStatus};
