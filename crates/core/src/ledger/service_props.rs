//! Property tests for the Ledger Service (§8 P1).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ledgerstream_shared::types::{AccountId, BusinessId, PageRequest, PageResponse, TransactionId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::service::{LedgerRepository, LedgerService};
use super::types::{AppendRequest, LedgerEntry, LedgerTransactionType};

#[derive(Default)]
struct InMemoryLedger {
    balances: Mutex<HashMap<AccountId, Decimal>>,
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

fn run_appends(changes: Vec<i64>) -> (Decimal, Decimal) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let repo = Arc::new(InMemoryLedger::default());
        let service = LedgerService::new(repo.clone());
        let business_id = BusinessId::new();
        let account_id = AccountId::new();

        for change in changes {
            let change_amount = Decimal::new(change, 2);
            let request = AppendRequest {
                business_id,
                account_id,
                transaction_id: TransactionId::new(),
                change_amount,
                transaction_type: if change_amount.is_sign_negative() {
                    LedgerTransactionType::Expense
                } else {
                    LedgerTransactionType::Income
                },
                created_by: UserId::new(),
                description: "prop test".to_string(),
            };
            service.append(request).await.unwrap();
        }

        let stored = repo.get_account_balance(account_id).await.unwrap();
        let reconciled = service
            .calculate_account_balance_from_ledger(account_id)
            .await
            .unwrap();
        (stored, reconciled)
    })
}

proptest! {
    /// P1: after every successful append, `current_balance == Σ change_amount`.
    #[test]
    fn prop_balance_equals_sum_of_changes(changes in proptest::collection::vec(-100_000i64..100_000, 0..20)) {
        let (stored, reconciled) = run_appends(changes);
        prop_assert_eq!(stored, reconciled);
    }
}
