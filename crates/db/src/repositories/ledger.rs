//! Ledger repository: the atomic append-and-rebalance unit the Ledger
//! Service requires (spec.md §3 `LedgerEntry`, §4.9, §9 "Ledger atomicity").

use ledgerstream_core::ledger::{LedgerEntry, LedgerError, LedgerRepository, LedgerTransactionType};
use ledgerstream_shared::types::{AccountId, BusinessId, LedgerEntryId, PageRequest, PageResponse, TransactionId};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait};

use crate::entities::{accounts, ledger_entries};
use crate::entities::sea_orm_active_enums::LedgerTransactionType as DbLedgerTransactionType;

/// `SeaORM`-backed `LedgerRepository`.
///
/// `try_append` runs inside a `SERIALIZABLE` database transaction: the
/// balance read and the entry insert happen atomically, so a concurrent
/// writer either serializes behind this one or the transaction aborts
/// and `LedgerService::append` retries with a freshly read balance.
#[derive(Debug, Clone)]
pub struct SeaOrmLedgerRepository {
    db: DatabaseConnection,
}

impl SeaOrmLedgerRepository {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl LedgerRepository for SeaOrmLedgerRepository {
    async fn get_account_balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        let latest = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::AccountId.eq(account_id.into_inner()))
            .order_by_desc(ledger_entries::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        Ok(latest.map_or(Decimal::ZERO, |e| e.amount_after))
    }

    async fn try_append(&self, entry: LedgerEntry, expected_before: Decimal) -> Result<LedgerEntry, LedgerError> {
        let txn = self.db.begin().await.map_err(|e| LedgerError::Storage(e.to_string()))?;

        let existing = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TransactionId.eq(entry.transaction_id.into_inner()))
            .one(&txn)
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        if existing.is_some() {
            return Err(LedgerError::DuplicateEntry(entry.transaction_id));
        }

        let current = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::AccountId.eq(entry.account_id.into_inner()))
            .order_by_desc(ledger_entries::Column::CreatedAt)
            .one(&txn)
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?
            .map_or(Decimal::ZERO, |e| e.amount_after);

        if current != expected_before {
            return Err(LedgerError::BalanceConflict);
        }

        let active = ledger_entries::ActiveModel {
            id: Set(entry.id.into_inner()),
            business_id: Set(entry.business_id.into_inner()),
            account_id: Set(entry.account_id.into_inner()),
            transaction_id: Set(entry.transaction_id.into_inner()),
            amount_before: Set(entry.amount_before),
            change_amount: Set(entry.change_amount),
            amount_after: Set(entry.amount_after),
            transaction_type: Set(to_db_type(entry.transaction_type)),
            description: Set(entry.description.clone()),
            created_by: Set(entry.created_by.into_inner()),
            created_at: Set(entry.created_at.into()),
        };

        // The pre-check above plus this transaction's isolation level is what
        // `LedgerService::append`'s retry loop relies on to make the duplicate
        // check race-safe (§9 "Ledger atomicity").
        let model = active.insert(&txn).await.map_err(|e| LedgerError::Storage(e.to_string()))?;

        // §4.9 step 4: the account row is the other writer P1 depends on —
        // `get_account_balance` derives from `ledger_entries`, but the
        // `accounts` columns themselves must stay in lockstep too.
        let account = accounts::Entity::find_by_id(entry.account_id.into_inner())
            .one(&txn)
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?
            .ok_or(LedgerError::AccountNotFound)?;

        let mut account: accounts::ActiveModel = account.into();
        account.current_balance = Set(entry.amount_after);
        account.available_balance = Set(Some(entry.amount_after));
        account.updated_at = Set(entry.created_at.into());
        account.update(&txn).await.map_err(|e| LedgerError::Storage(e.to_string()))?;

        txn.commit().await.map_err(|e| LedgerError::Storage(e.to_string()))?;

        Ok(from_model(model))
    }

    async fn list_entries(
        &self,
        business_id: BusinessId,
        account_id: Option<AccountId>,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerEntry>, LedgerError> {
        let mut query = ledger_entries::Entity::find().filter(ledger_entries::Column::BusinessId.eq(business_id.into_inner()));
        if let Some(account_id) = account_id {
            query = query.filter(ledger_entries::Column::AccountId.eq(account_id.into_inner()));
        }

        let paginator = query
            .clone()
            .order_by_desc(ledger_entries::Column::CreatedAt)
            .paginate(&self.db, page.limit());
        let total = paginator.num_items().await.map_err(|e| LedgerError::Storage(e.to_string()))?;
        let page_index = page.page.saturating_sub(1);
        let rows = paginator
            .fetch_page(u64::from(page_index))
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        Ok(PageResponse::new(rows.into_iter().map(from_model).collect(), page.page, page.per_page, total))
    }

    async fn list_all_for_account(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let rows = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::AccountId.eq(account_id.into_inner()))
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        Ok(rows.into_iter().map(from_model).collect())
    }

    async fn find_by_transaction(&self, transaction_id: TransactionId) -> Result<Option<LedgerEntry>, LedgerError> {
        let row = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TransactionId.eq(transaction_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        Ok(row.map(from_model))
    }
}

fn to_db_type(transaction_type: LedgerTransactionType) -> DbLedgerTransactionType {
    match transaction_type {
        LedgerTransactionType::Income => DbLedgerTransactionType::Income,
        LedgerTransactionType::Expense => DbLedgerTransactionType::Expense,
    }
}

fn from_db_type(transaction_type: DbLedgerTransactionType) -> LedgerTransactionType {
    match transaction_type {
        DbLedgerTransactionType::Income => LedgerTransactionType::Income,
        DbLedgerTransactionType::Expense => LedgerTransactionType::Expense,
    }
}

fn from_model(model: ledger_entries::Model) -> LedgerEntry {
    LedgerEntry {
        id: LedgerEntryId::from_uuid(model.id),
        business_id: BusinessId::from_uuid(model.business_id),
        account_id: AccountId::from_uuid(model.account_id),
        transaction_id: TransactionId::from_uuid(model.transaction_id),
        amount_before: model.amount_before,
        change_amount: model.change_amount,
        amount_after: model.amount_after,
        transaction_type: from_db_type(model.transaction_type),
        description: model.description,
        created_by: ledgerstream_shared::types::UserId::from_uuid(model.created_by),
        created_at: model.created_at.with_timezone(&chrono::Utc),
    }
}
