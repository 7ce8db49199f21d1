//! Ledger domain types (§3 `LedgerEntry`, §4.9 Ledger Service).

use chrono::{DateTime, Utc};
use ledgerstream_shared::types::{AccountId, BusinessId, LedgerEntryId, TransactionId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The two kinds of balance-changing event the ledger records.
///
/// A transfer is modeled as two approvals — one expense from the source
/// account, one income to the destination — never as its own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerTransactionType {
    /// Balance-increasing event.
    Income,
    /// Balance-decreasing event.
    Expense,
}

/// An immutable ledger entry: the only writer of `Account.current_balance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier.
    pub id: LedgerEntryId,
    /// Owning business.
    pub business_id: BusinessId,
    /// Account this entry changed the balance of.
    pub account_id: AccountId,
    /// The transaction this entry was posted for. Unique: exactly one
    /// entry per transaction.
    pub transaction_id: TransactionId,
    /// Account balance immediately before this entry.
    pub amount_before: Decimal,
    /// Signed delta applied to the balance (`+` income, `-` expense).
    pub change_amount: Decimal,
    /// Account balance immediately after this entry.
    pub amount_after: Decimal,
    /// Income or expense.
    pub transaction_type: LedgerTransactionType,
    /// Human-readable description, carried from the transaction.
    pub description: String,
    /// User attributed with the approval that produced this entry.
    pub created_by: UserId,
    /// When this entry was appended.
    pub created_at: DateTime<Utc>,
}

/// Input to `LedgerService::append`, prior to balance computation.
#[derive(Debug, Clone)]
pub struct AppendRequest {
    /// Owning business.
    pub business_id: BusinessId,
    /// Account to post against.
    pub account_id: AccountId,
    /// Transaction this posting is for.
    pub transaction_id: TransactionId,
    /// Signed delta to apply (`+amount` for income, `-amount` for expense).
    pub change_amount: Decimal,
    /// Income or expense.
    pub transaction_type: LedgerTransactionType,
    /// User attributed with the approval.
    pub created_by: UserId,
    /// Description carried onto the ledger entry.
    pub description: String,
}

/// A single point in an account's balance history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceHistoryPoint {
    /// When the balance changed.
    pub at: DateTime<Utc>,
    /// The balance after the change.
    pub balance: Decimal,
    /// The entry responsible for the change.
    pub ledger_entry_id: LedgerEntryId,
}
