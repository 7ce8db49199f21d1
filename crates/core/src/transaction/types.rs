//! Transaction domain types (§3).

use chrono::{DateTime, NaiveDate, Utc};
use ledgerstream_shared::types::{AccountId, BusinessId, CategoryId, DocumentId, TransactionId, UserId};
use rust_decimal::Decimal;

/// §3 Transaction status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

/// A materialized transaction (§3), as produced by the Transaction
/// Creator.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub business_id: BusinessId,
    pub account_id: AccountId,
    pub category_id: Option<CategoryId>,
    pub user_id: UserId,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
    pub vendor: Option<String>,
    pub payment_method: Option<String>,
    pub is_income: bool,
    pub status: TransactionStatus,
    pub notes: String,
    pub source_document_id: Option<DocumentId>,
    pub transaction_index: Option<usize>,
    pub created_at: DateTime<Utc>,
}

/// Input to transaction creation: an extracted record plus the
/// identifiers the Orchestrator already resolved (business, account,
/// acting user, source document).
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    pub business_id: BusinessId,
    pub account_id: AccountId,
    pub user_id: UserId,
    pub source_document_id: Option<DocumentId>,
    pub vendor: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub payment_method: Option<String>,
    pub is_income: Option<bool>,
    pub confidence: f32,
    pub transaction_index: Option<usize>,
}

/// Outcome of creating one transaction: the record plus whether it was
/// skipped (below the multi-transaction confidence floor).
#[derive(Debug, Clone)]
pub enum CreationOutcome {
    Created(Transaction),
    Skipped { reason: String },
}
