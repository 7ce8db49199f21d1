//! Transaction repository: persists transactions materialized by the
//! Transaction Creator (spec.md §3 `Transaction`, §4.8).

use chrono::Utc;
use ledgerstream_core::transaction::{Transaction, TransactionError, TransactionRepository, TransactionStatus as CoreTransactionStatus};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::entities::sea_orm_active_enums::TransactionStatus as DbTransactionStatus;
use crate::entities::transactions;

/// `SeaORM`-backed `TransactionRepository`.
#[derive(Debug, Clone)]
pub struct SeaOrmTransactionRepository {
    db: DatabaseConnection,
}

impl SeaOrmTransactionRepository {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl TransactionRepository for SeaOrmTransactionRepository {
    async fn insert(&self, transaction: Transaction) -> Result<Transaction, TransactionError> {
        let now = Utc::now().into();
        let active = transactions::ActiveModel {
            id: Set(transaction.id.into_inner()),
            business_id: Set(transaction.business_id.into_inner()),
            account_id: Set(transaction.account_id.into_inner()),
            category_id: Set(transaction.category_id.map(ledgerstream_shared::types::CategoryId::into_inner)),
            user_id: Set(transaction.user_id.into_inner()),
            amount: Set(transaction.amount),
            transaction_date: Set(transaction.date),
            description: Set(transaction.description.clone()),
            vendor: Set(transaction.vendor.clone()),
            payment_method: Set(transaction.payment_method.clone()),
            is_income: Set(transaction.is_income),
            status: Set(to_db_status(transaction.status)),
            notes: Set(transaction.notes.clone()),
            source_document_id: Set(transaction.source_document_id.map(ledgerstream_shared::types::DocumentId::into_inner)),
            #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
            transaction_index: Set(transaction.transaction_index.map(|i| i as i32)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        active
            .insert(&self.db)
            .await
            .map_err(|e| TransactionError::Storage(e.to_string()))?;

        Ok(transaction)
    }
}

fn to_db_status(status: CoreTransactionStatus) -> DbTransactionStatus {
    match status {
        CoreTransactionStatus::Draft => DbTransactionStatus::Draft,
        CoreTransactionStatus::Pending => DbTransactionStatus::Pending,
        CoreTransactionStatus::Approved => DbTransactionStatus::Approved,
        CoreTransactionStatus::Rejected => DbTransactionStatus::Rejected,
    }
}

/// Converts a persisted row back into the core domain type.
#[must_use]
pub fn from_model(model: transactions::Model) -> Transaction {
    Transaction {
        id: ledgerstream_shared::types::TransactionId::from_uuid(model.id),
        business_id: ledgerstream_shared::types::BusinessId::from_uuid(model.business_id),
        account_id: ledgerstream_shared::types::AccountId::from_uuid(model.account_id),
        category_id: model.category_id.map(ledgerstream_shared::types::CategoryId::from_uuid),
        user_id: ledgerstream_shared::types::UserId::from_uuid(model.user_id),
        amount: model.amount,
        date: model.transaction_date,
        description: model.description,
        vendor: model.vendor,
        payment_method: model.payment_method,
        is_income: model.is_income,
        status: from_db_status(model.status),
        notes: model.notes,
        source_document_id: model.source_document_id.map(ledgerstream_shared::types::DocumentId::from_uuid),
        #[allow(clippy::cast_sign_loss)]
        transaction_index: model.transaction_index.map(|i| i as usize),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn from_db_status(status: DbTransactionStatus) -> CoreTransactionStatus {
    match status {
        DbTransactionStatus::Draft => CoreTransactionStatus::Draft,
        DbTransactionStatus::Pending => CoreTransactionStatus::Pending,
        DbTransactionStatus::Approved => CoreTransactionStatus::Approved,
        DbTransactionStatus::Rejected => CoreTransactionStatus::Rejected,
    }
}
