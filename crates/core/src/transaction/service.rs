//! Transaction Creator (§4.8): validates required fields, decides status,
//! and materializes one or many transactions.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use ledgerstream_shared::types::TransactionId;
use tracing::info;

use super::error::TransactionError;
use super::types::{CreateTransactionInput, CreationOutcome, Transaction, TransactionStatus};

/// Confidence floor below which a multi-transaction record is skipped
/// entirely rather than created in `draft` (§4.8).
const MULTI_TRANSACTION_CONFIDENCE_FLOOR: f32 = 0.85;

/// Confidence band boundaries for the second decision layer (§4.8).
const APPROVED_THRESHOLD: f32 = 0.95;
const PENDING_THRESHOLD: f32 = 0.85;

/// Repository seam: persists created transactions.
pub trait TransactionRepository: Send + Sync {
    fn insert(&self, transaction: Transaction) -> impl Future<Output = Result<Transaction, TransactionError>> + Send;
}

/// Materializes transactions from LLM extraction output.
pub struct TransactionCreator<R: TransactionRepository> {
    repo: Arc<R>,
}

impl<R: TransactionRepository> TransactionCreator<R> {
    #[must_use]
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// §4.8 auto-creation pre-check: confidence at/above threshold AND
    /// vendor, amount, and date all present.
    #[must_use]
    pub fn should_create(input: &CreateTransactionInput, confidence_threshold: f32) -> bool {
        input.confidence >= confidence_threshold
            && input.vendor.is_some()
            && input.amount.is_some()
            && input.date.is_some()
    }

    /// Creates a single transaction, applying the required-field gate and
    /// confidence-band decision.
    pub async fn create_one(&self, input: CreateTransactionInput) -> Result<Transaction, TransactionError> {
        let (status, notes) = Self::decide_status(&input);

        let amount = input.amount.unwrap_or_default();
        let description = input.description.clone().unwrap_or_default();

        let transaction = Transaction {
            id: TransactionId::new(),
            business_id: input.business_id,
            account_id: input.account_id,
            category_id: input.category_id,
            user_id: input.user_id,
            amount: amount.abs(),
            date: input.date.unwrap_or_else(|| Utc::now().date_naive()),
            description,
            vendor: input.vendor.clone(),
            payment_method: input.payment_method.clone(),
            is_income: input.is_income.unwrap_or(false),
            status,
            notes,
            source_document_id: input.source_document_id,
            transaction_index: input.transaction_index,
            created_at: Utc::now(),
        };

        info!(transaction_id = %transaction.id, status = ?transaction.status, "created transaction");
        self.repo.insert(transaction).await
    }

    /// Iterates a multi-transaction result, skipping records below the
    /// confidence floor and annotating each kept record with its
    /// `_transaction_index` note (§4.8).
    pub async fn create_many(
        &self,
        inputs: Vec<CreateTransactionInput>,
    ) -> Result<Vec<CreationOutcome>, TransactionError> {
        let mut outcomes = Vec::with_capacity(inputs.len());

        for (position, mut input) in inputs.into_iter().enumerate() {
            if input.confidence < MULTI_TRANSACTION_CONFIDENCE_FLOOR {
                outcomes.push(CreationOutcome::Skipped {
                    reason: format!(
                        "confidence {:.2} below floor {MULTI_TRANSACTION_CONFIDENCE_FLOOR:.2}",
                        input.confidence
                    ),
                });
                continue;
            }

            input.transaction_index = Some(position);
            let mut transaction = self.create_one(input).await?;
            transaction
                .notes
                .push_str(&format!(" Transaction #{} from multi-transaction document.", position + 1));
            outcomes.push(CreationOutcome::Created(transaction));
        }

        Ok(outcomes)
    }

    /// §4.8 decision: required-field gate first, then the confidence band.
    fn decide_status(input: &CreateTransactionInput) -> (TransactionStatus, String) {
        let mut missing = Vec::new();

        if input.category_id.is_none() {
            missing.push("category");
        }
        if input.payment_method.is_none() {
            missing.push("payment_method");
        }

        let description = input.description.as_deref().unwrap_or_default().to_lowercase();
        let is_transfer_or_deposit = description.contains("transfer") || description.contains("deposit");
        if input.vendor.is_none() && !is_transfer_or_deposit {
            missing.push("vendor");
        }

        let has_positive_amount = input.amount.is_some_and(|a| a.is_sign_positive() && !a.is_zero());
        if !has_positive_amount {
            missing.push("amount");
        }

        if !missing.is_empty() {
            let upper: Vec<String> = missing.iter().map(|f| f.to_uppercase()).collect();
            return (
                TransactionStatus::Pending,
                format!("MISSING REQUIRED FIELDS: {}", upper.join(", ")),
            );
        }

        let status = if input.confidence >= APPROVED_THRESHOLD {
            TransactionStatus::Approved
        } else if input.confidence >= PENDING_THRESHOLD {
            TransactionStatus::Pending
        } else {
            TransactionStatus::Draft
        };

        (status, String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use ledgerstream_shared::types::{AccountId, BusinessId, CategoryId, UserId};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRepo {
        inserted: Mutex<Vec<Transaction>>,
    }

    impl TransactionRepository for RecordingRepo {
        async fn insert(&self, transaction: Transaction) -> Result<Transaction, TransactionError> {
            self.inserted.lock().unwrap().push(transaction.clone());
            Ok(transaction)
        }
    }

    fn base_input() -> CreateTransactionInput {
        CreateTransactionInput {
            business_id: BusinessId::new(),
            account_id: AccountId::new(),
            user_id: UserId::new(),
            source_document_id: None,
            vendor: Some("Office Depot".to_string()),
            amount: Some(dec!(113.03)),
            date: NaiveDate::from_ymd_opt(2025, 10, 7),
            description: Some("Office supplies".to_string()),
            category_id: Some(CategoryId::new()),
            payment_method: Some("Mastercard ****5678".to_string()),
            is_income: Some(false),
            confidence: 0.97,
            transaction_index: None,
        }
    }

    #[tokio::test]
    async fn high_confidence_complete_record_is_approved() {
        let creator = TransactionCreator::new(Arc::new(RecordingRepo::default()));
        let transaction = creator.create_one(base_input()).await.unwrap();
        assert_eq!(transaction.status, TransactionStatus::Approved);
        assert!(!transaction.is_income);
    }

    #[tokio::test]
    async fn missing_category_forces_pending_regardless_of_confidence() {
        let creator = TransactionCreator::new(Arc::new(RecordingRepo::default()));
        let mut input = base_input();
        input.category_id = None;
        let transaction = creator.create_one(input).await.unwrap();
        assert_eq!(transaction.status, TransactionStatus::Pending);
        assert!(transaction.notes.contains("CATEGORY"));
    }

    #[tokio::test]
    async fn transfer_description_waives_vendor_requirement() {
        let creator = TransactionCreator::new(Arc::new(RecordingRepo::default()));
        let mut input = base_input();
        input.vendor = None;
        input.description = Some("internal transfer between accounts".to_string());
        let transaction = creator.create_one(input).await.unwrap();
        assert!(!transaction.notes.contains("VENDOR"));
    }

    #[tokio::test]
    async fn mid_confidence_complete_record_is_pending() {
        let creator = TransactionCreator::new(Arc::new(RecordingRepo::default()));
        let mut input = base_input();
        input.confidence = 0.90;
        let transaction = creator.create_one(input).await.unwrap();
        assert_eq!(transaction.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn low_confidence_complete_record_is_draft() {
        let creator = TransactionCreator::new(Arc::new(RecordingRepo::default()));
        let mut input = base_input();
        input.confidence = 0.50;
        let transaction = creator.create_one(input).await.unwrap();
        assert_eq!(transaction.status, TransactionStatus::Draft);
    }

    #[tokio::test]
    async fn is_income_is_taken_from_input_not_inferred_from_sign() {
        let creator = TransactionCreator::new(Arc::new(RecordingRepo::default()));
        let mut input = base_input();
        input.is_income = Some(true);
        let transaction = creator.create_one(input).await.unwrap();
        assert!(transaction.is_income);

        let creator = TransactionCreator::new(Arc::new(RecordingRepo::default()));
        let expense = creator.create_one(base_input()).await.unwrap();
        assert!(!expense.is_income);
    }

    #[tokio::test]
    async fn create_many_skips_records_below_confidence_floor() {
        let creator = TransactionCreator::new(Arc::new(RecordingRepo::default()));
        let mut low_confidence = base_input();
        low_confidence.confidence = 0.5;
        let outcomes = creator.create_many(vec![base_input(), low_confidence]).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], CreationOutcome::Created(_)));
        assert!(matches!(outcomes[1], CreationOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn create_many_annotates_transaction_index() {
        let creator = TransactionCreator::new(Arc::new(RecordingRepo::default()));
        let outcomes = creator.create_many(vec![base_input(), base_input()]).await.unwrap();
        if let CreationOutcome::Created(t) = &outcomes[1] {
            assert!(t.notes.contains("Transaction #2 from multi-transaction document"));
        } else {
            panic!("expected created transaction");
        }
    }
}
