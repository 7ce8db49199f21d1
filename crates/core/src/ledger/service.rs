//! Ledger service: append-only balance-changing entries (§4.9).

use std::sync::Arc;

use chrono::Utc;
use ledgerstream_shared::types::{AccountId, BusinessId, LedgerEntryId, PageRequest, PageResponse, TransactionId};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::error::LedgerError;
use super::types::{AppendRequest, BalanceHistoryPoint, LedgerEntry};

/// Maximum compare-and-swap retries before an append gives up (§9).
pub const MAX_APPEND_RETRIES: u32 = 5;

/// Repository seam for ledger persistence, implemented by the db crate.
///
/// `try_append` is the atomic "insert entry + write back balance" unit
/// §4.9 requires: implementers back it with a serializable database
/// transaction or a compare-and-swap on `(account_id, current_balance)`.
/// It must fail with `LedgerError::DuplicateEntry` if an entry already
/// exists for `entry.transaction_id`, and with
/// `LedgerError::BalanceConflict` if `expected_before` no longer matches
/// the account's stored balance at write time.
pub trait LedgerRepository: Send + Sync {
    /// Reads the account's current balance.
    fn get_account_balance(
        &self,
        account_id: AccountId,
    ) -> impl std::future::Future<Output = Result<Decimal, LedgerError>> + Send;

    /// Atomically inserts `entry` and writes `new_balance` back onto the
    /// account, provided the account's balance still equals
    /// `expected_before`.
    fn try_append(
        &self,
        entry: LedgerEntry,
        expected_before: Decimal,
    ) -> impl std::future::Future<Output = Result<LedgerEntry, LedgerError>> + Send;

    /// Paginated, business/account-filtered ledger entry listing.
    fn list_entries(
        &self,
        business_id: BusinessId,
        account_id: Option<AccountId>,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<PageResponse<LedgerEntry>, LedgerError>> + Send;

    /// Every entry ever posted for an account, oldest first.
    fn list_all_for_account(
        &self,
        account_id: AccountId,
    ) -> impl std::future::Future<Output = Result<Vec<LedgerEntry>, LedgerError>> + Send;

    /// The single entry for a transaction, if one has been posted (P2).
    fn find_by_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> impl std::future::Future<Output = Result<Option<LedgerEntry>, LedgerError>> + Send;
}

/// Ledger service: the only writer of `Account.current_balance`.
pub struct LedgerService<R: LedgerRepository> {
    repo: Arc<R>,
}

impl<R: LedgerRepository> LedgerService<R> {
    /// Creates a new ledger service over the given repository.
    #[must_use]
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Appends a balance-changing entry for `request.transaction_id`.
    ///
    /// Reads `amount_before`, computes `amount_after = amount_before +
    /// change_amount`, and atomically inserts the entry while writing the
    /// new balance back onto the account. Retries up to
    /// [`MAX_APPEND_RETRIES`] times on a detected concurrent update before
    /// surfacing `InvariantViolation`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::DuplicateEntry` if an entry already exists for
    /// this transaction (callers should swallow this, per §4.9
    /// idempotency), or `LedgerError::InvariantViolation` if retries are
    /// exhausted.
    pub async fn append(&self, request: AppendRequest) -> Result<LedgerEntry, LedgerError> {
        for attempt in 0..=MAX_APPEND_RETRIES {
            let amount_before = self.repo.get_account_balance(request.account_id).await?;
            let amount_after = amount_before + request.change_amount;

            let entry = LedgerEntry {
                id: LedgerEntryId::new(),
                business_id: request.business_id,
                account_id: request.account_id,
                transaction_id: request.transaction_id,
                amount_before,
                change_amount: request.change_amount,
                amount_after,
                transaction_type: request.transaction_type,
                description: request.description.clone(),
                created_by: request.created_by,
                created_at: Utc::now(),
            };

            match self.repo.try_append(entry, amount_before).await {
                Ok(entry) => {
                    info!(
                        transaction_id = %request.transaction_id,
                        account_id = %request.account_id,
                        amount_before = %amount_before,
                        amount_after = %entry.amount_after,
                        "ledger entry appended"
                    );
                    return Ok(entry);
                }
                Err(LedgerError::DuplicateEntry(id)) => {
                    return Err(LedgerError::DuplicateEntry(id));
                }
                Err(LedgerError::BalanceConflict) => {
                    warn!(
                        transaction_id = %request.transaction_id,
                        attempt,
                        "ledger balance conflict, retrying"
                    );
                    continue;
                }
                Err(other) => return Err(other),
            }
        }

        Err(LedgerError::InvariantViolation(format!(
            "exhausted {MAX_APPEND_RETRIES} retries appending ledger entry for transaction {}",
            request.transaction_id
        )))
    }

    /// Paginated, business/account-filtered ledger entries.
    ///
    /// # Errors
    ///
    /// Returns a `LedgerError` on storage failure.
    pub async fn get_ledger_entries(
        &self,
        business_id: BusinessId,
        account_id: Option<AccountId>,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerEntry>, LedgerError> {
        self.repo.list_entries(business_id, account_id, page).await
    }

    /// The running balance after each entry posted to `account_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a `LedgerError` on storage failure.
    pub async fn get_account_balance_history(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<BalanceHistoryPoint>, LedgerError> {
        let entries = self.repo.list_all_for_account(account_id).await?;
        Ok(entries
            .into_iter()
            .map(|e| BalanceHistoryPoint {
                at: e.created_at,
                balance: e.amount_after,
                ledger_entry_id: e.id,
            })
            .collect())
    }

    /// The ledger entry posted for `transaction_id`, if any (P2 support).
    ///
    /// # Errors
    ///
    /// Returns a `LedgerError` on storage failure.
    pub async fn get_transaction_ledger_entry(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        self.repo.find_by_transaction(transaction_id).await
    }

    /// Recomputes an account's balance from scratch by summing every
    /// entry's `change_amount`, independent of the stored `current_balance`
    /// column. Used to verify P1 during reconciliation or tests.
    ///
    /// # Errors
    ///
    /// Returns a `LedgerError` on storage failure.
    pub async fn calculate_account_balance_from_ledger(
        &self,
        account_id: AccountId,
    ) -> Result<Decimal, LedgerError> {
        let entries = self.repo.list_all_for_account(account_id).await?;
        Ok(entries.iter().map(|e| e.change_amount).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::LedgerTransactionType;
    use ledgerstream_shared::types::UserId;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryLedger {
        balances: Mutex<std::collections::HashMap<AccountId, Decimal>>,
        entries: Mutex<Vec<LedgerEntry>>,
    }

    impl LedgerRepository for InMemoryLedger {
        async fn get_account_balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
            Ok(*self
                .balances
                .lock()
                .unwrap()
                .get(&account_id)
                .unwrap_or(&Decimal::ZERO))
        }

        async fn try_append(
            &self,
            entry: LedgerEntry,
            expected_before: Decimal,
        ) -> Result<LedgerEntry, LedgerError> {
            let mut entries = self.entries.lock().unwrap();
            if entries
                .iter()
                .any(|e| e.transaction_id == entry.transaction_id)
            {
                return Err(LedgerError::DuplicateEntry(entry.transaction_id));
            }
            let mut balances = self.balances.lock().unwrap();
            let current = *balances.get(&entry.account_id).unwrap_or(&Decimal::ZERO);
            if current != expected_before {
                return Err(LedgerError::BalanceConflict);
            }
            balances.insert(entry.account_id, entry.amount_after);
            entries.push(entry.clone());
            Ok(entry)
        }

        async fn list_entries(
            &self,
            business_id: BusinessId,
            account_id: Option<AccountId>,
            page: PageRequest,
        ) -> Result<PageResponse<LedgerEntry>, LedgerError> {
            let entries: Vec<_> = self
                .entries
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.business_id == business_id)
                .filter(|e| account_id.is_none_or(|a| e.account_id == a))
                .cloned()
                .collect();
            let total = entries.len() as u64;
            Ok(PageResponse::new(entries, page.page, page.per_page, total))
        }

        async fn list_all_for_account(
            &self,
            account_id: AccountId,
        ) -> Result<Vec<LedgerEntry>, LedgerError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.account_id == account_id)
                .cloned()
                .collect())
        }

        async fn find_by_transaction(
            &self,
            transaction_id: TransactionId,
        ) -> Result<Option<LedgerEntry>, LedgerError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.transaction_id == transaction_id)
                .cloned())
        }
    }

    fn request(account_id: AccountId, change: Decimal) -> AppendRequest {
        AppendRequest {
            business_id: BusinessId::new(),
            account_id,
            transaction_id: TransactionId::new(),
            change_amount: change,
            transaction_type: if change.is_sign_positive() {
                LedgerTransactionType::Income
            } else {
                LedgerTransactionType::Expense
            },
            created_by: UserId::new(),
            description: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn append_computes_before_and_after() {
        let repo = Arc::new(InMemoryLedger::default());
        let service = LedgerService::new(repo.clone());
        let account = AccountId::new();

        let first = service.append(request(account, dec!(100.00))).await.unwrap();
        assert_eq!(first.amount_before, Decimal::ZERO);
        assert_eq!(first.amount_after, dec!(100.00));

        let second = service.append(request(account, dec!(-30.00))).await.unwrap();
        assert_eq!(second.amount_before, dec!(100.00));
        assert_eq!(second.amount_after, dec!(70.00));
    }

    #[tokio::test]
    async fn append_is_idempotent_per_transaction() {
        let repo = Arc::new(InMemoryLedger::default());
        let service = LedgerService::new(repo.clone());
        let account = AccountId::new();

        let req = request(account, dec!(50.00));
        let tx_id = req.transaction_id;
        service.append(req.clone()).await.unwrap();

        let mut retry = req;
        retry.transaction_id = tx_id;
        let err = service.append(retry).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateEntry(id) if id == tx_id));
    }

    #[tokio::test]
    async fn balance_matches_sum_of_changes() {
        let repo = Arc::new(InMemoryLedger::default());
        let service = LedgerService::new(repo.clone());
        let account = AccountId::new();

        service.append(request(account, dec!(100.00))).await.unwrap();
        service.append(request(account, dec!(-40.00))).await.unwrap();
        service.append(request(account, dec!(10.00))).await.unwrap();

        let reconciled = service
            .calculate_account_balance_from_ledger(account)
            .await
            .unwrap();
        assert_eq!(reconciled, dec!(70.00));
        assert_eq!(
            repo.get_account_balance(account).await.unwrap(),
            reconciled
        );
    }

    #[tokio::test]
    async fn balance_history_tracks_running_total() {
        let repo = Arc::new(InMemoryLedger::default());
        let service = LedgerService::new(repo);
        let account = AccountId::new();

        service.append(request(account, dec!(20.00))).await.unwrap();
        service.append(request(account, dec!(5.00))).await.unwrap();

        let history = service.get_account_balance_history(account).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].balance, dec!(20.00));
        assert_eq!(history[1].balance, dec!(25.00));
    }
}
