//! Scenario tests (§8): end-to-end runs of the Orchestrator over stubbed
//! repositories and a canned LLM client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use ledgerstream_shared::types::{AccountId, BusinessId, CategoryId, DocumentId, TransactionId, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::category::{CategoryError, CategoryRef, CategoryRepository, CategoryResolver};
use crate::chunk::ChunkerConfig;
use crate::extraction::{ExtractionError, Extractor, RawExtraction};
use crate::ledger::{LedgerEntry, LedgerError, LedgerRepository, LedgerService};
use crate::llm::{LlmClient, LlmClientError, LlmExtractor};
use crate::processor::DocumentProcessor;
use crate::storage::{StorageConfig, StorageProvider, StorageService};
use crate::transaction::{Transaction, TransactionCreator, TransactionError, TransactionRepository};

use super::service::Orchestrator;
use super::types::{AccountRef, AccountRepository, DocumentCompletion, DocumentRecord, DocumentRepository, OrchestratorConfig};
use super::OrchestratorError;

struct EchoExtractor;

impl Extractor for EchoExtractor {
    fn extensions(&self) -> &[&str] {
        &["txt"]
    }

    fn mime_types(&self) -> &[&str] {
        &["text/plain"]
    }

    fn extract(&self, path: &std::path::Path) -> Result<RawExtraction, ExtractionError> {
        let raw_text = std::fs::read_to_string(path).map_err(|e| ExtractionError::Failed(e.to_string()))?;
        Ok(RawExtraction {
            raw_text,
            structured_tables: Vec::new(),
            metadata: serde_json::json!({}),
        })
    }
}

#[derive(Clone)]
struct DocumentState {
    record: DocumentRecord,
    status: super::types::ExtractionStatus,
    processed_at: Option<DateTime<Utc>>,
    completion: Option<DocumentCompletion>,
}

#[derive(Default)]
struct StubDocuments {
    inner: Mutex<HashMap<DocumentId, DocumentState>>,
}

impl StubDocuments {
    fn seed(&self, record: DocumentRecord) {
        self.inner.lock().unwrap().insert(
            record.id,
            DocumentState {
                record,
                status: super::types::ExtractionStatus::Pending,
                processed_at: None,
                completion: None,
            },
        );
    }

    fn status_of(&self, id: DocumentId) -> super::types::ExtractionStatus {
        self.inner.lock().unwrap().get(&id).unwrap().status
    }

    fn completion_of(&self, id: DocumentId) -> DocumentCompletion {
        self.inner.lock().unwrap().get(&id).unwrap().completion.clone().unwrap()
    }
}

impl DocumentRepository for StubDocuments {
    async fn get(&self, document_id: DocumentId) -> Result<DocumentRecord, OrchestratorError> {
        self.inner
            .lock()
            .unwrap()
            .get(&document_id)
            .map(|s| s.record.clone())
            .ok_or_else(|| OrchestratorError::Repository("not found".to_string()))
    }

    async fn mark_processing(&self, document_id: DocumentId) -> Result<(), OrchestratorError> {
        self.inner.lock().unwrap().get_mut(&document_id).unwrap().status = super::types::ExtractionStatus::Processing;
        Ok(())
    }

    async fn mark_failed(&self, document_id: DocumentId, _processing_error: String) -> Result<(), OrchestratorError> {
        let mut guard = self.inner.lock().unwrap();
        let state = guard.get_mut(&document_id).unwrap();
        state.status = super::types::ExtractionStatus::Failed;
        state.processed_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_completed(&self, document_id: DocumentId, completion: DocumentCompletion) -> Result<(), OrchestratorError> {
        let mut guard = self.inner.lock().unwrap();
        let state = guard.get_mut(&document_id).unwrap();
        state.status = super::types::ExtractionStatus::Completed;
        state.processed_at = Some(Utc::now());
        state.completion = Some(completion);
        Ok(())
    }

    async fn find_stale_processing(&self, _stale_after: DateTime<Utc>) -> Result<Vec<DocumentId>, OrchestratorError> {
        Ok(Vec::new())
    }

    async fn find_pending(&self, _limit: u64) -> Result<Vec<DocumentId>, OrchestratorError> {
        Ok(Vec::new())
    }
}

struct StubAccounts {
    account_id: AccountId,
}

impl AccountRepository for StubAccounts {
    async fn list_active_accounts(&self, _business_id: BusinessId) -> Result<Vec<AccountRef>, OrchestratorError> {
        Ok(vec![AccountRef {
            id: self.account_id,
            is_primary: true,
            is_active: true,
        }])
    }
}

struct StubCategories {
    categories: Vec<CategoryRef>,
}

impl CategoryRepository for StubCategories {
    async fn list_active_categories(&self, _business_id: BusinessId) -> Result<Vec<CategoryRef>, CategoryError> {
        Ok(self.categories.clone())
    }
}

#[derive(Default)]
struct StubTransactions {
    inserted: Mutex<Vec<Transaction>>,
}

impl TransactionRepository for StubTransactions {
    async fn insert(&self, transaction: Transaction) -> Result<Transaction, TransactionError> {
        self.inserted.lock().unwrap().push(transaction.clone());
        Ok(transaction)
    }
}

#[derive(Default)]
struct StubLedger {
    balances: Mutex<HashMap<AccountId, Decimal>>,
    entries: Mutex<Vec<LedgerEntry>>,
}

impl LedgerRepository for StubLedger {
    async fn get_account_balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        Ok(*self.balances.lock().unwrap().get(&account_id).unwrap_or(&Decimal::ZERO))
    }

    async fn try_append(&self, entry: LedgerEntry, expected_before: Decimal) -> Result<LedgerEntry, LedgerError> {
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|e| e.transaction_id == entry.transaction_id) {
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
        _business_id: BusinessId,
        _account_id: Option<AccountId>,
        page: ledgerstream_shared::types::PageRequest,
    ) -> Result<ledgerstream_shared::types::PageResponse<LedgerEntry>, LedgerError> {
        let entries = self.entries.lock().unwrap().clone();
        let total = entries.len() as u64;
        Ok(ledgerstream_shared::types::PageResponse::new(entries, page.page, page.per_page, total))
    }

    async fn list_all_for_account(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.entries.lock().unwrap().iter().filter(|e| e.account_id == account_id).cloned().collect())
    }

    async fn find_by_transaction(&self, transaction_id: TransactionId) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.entries.lock().unwrap().iter().find(|e| e.transaction_id == transaction_id).cloned())
    }
}

struct CannedLlm {
    response: String,
}

impl LlmClient for CannedLlm {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmClientError> {
        Ok(self.response.clone())
    }
}

fn receipt_response() -> String {
    serde_json::json!({
        "vendor": "Office Depot",
        "amount": "113.03",
        "date": "2025-10-07",
        "description": "Office supplies",
        "category": "Office Supplies",
        "payment_method": "Mastercard ****5678",
        "is_income": false,
        "field_confidence": {
            "vendor": 0.95,
            "amount": 0.97,
            "date": 0.96,
            "category": 0.93,
            "payment_method": 0.92,
        }
    })
    .to_string()
}

#[allow(clippy::too_many_arguments)]
fn build_orchestrator(
    storage: Arc<StorageService>,
    documents: Arc<StubDocuments>,
    accounts: Arc<StubAccounts>,
    categories: Vec<CategoryRef>,
    llm_response: String,
    transactions: Arc<StubTransactions>,
    ledger: Arc<StubLedger>,
) -> Orchestrator<StubDocuments, StubAccounts, StubCategories, StubTransactions, StubLedger, CannedLlm> {
    let processor = Arc::new(DocumentProcessor::new().register("echo", Box::new(EchoExtractor)));
    let category_resolver = Arc::new(CategoryResolver::new(Arc::new(StubCategories { categories })));
    let llm_extractor = Arc::new(LlmExtractor::new(CannedLlm { response: llm_response }));
    let transaction_creator = Arc::new(TransactionCreator::new(transactions));
    let ledger_service = Arc::new(LedgerService::new(ledger));

    Orchestrator::new(
        documents,
        accounts,
        storage,
        processor,
        ChunkerConfig::default(),
        category_resolver,
        llm_extractor,
        transaction_creator,
        ledger_service,
        OrchestratorConfig::default(),
    )
}

fn temp_storage() -> Arc<StorageService> {
    let dir = std::env::temp_dir().join(format!("ledgerstream-orchestrator-test-{}", uuid::Uuid::new_v4()));
    let config = StorageConfig::new(StorageProvider::local_fs(dir));
    Arc::new(StorageService::from_config(config).unwrap())
}

#[tokio::test]
async fn scenario_1_auto_approve_receipt() {
    let storage = temp_storage();
    storage.upload("receipt.txt", b"Office Depot\nSubtotal: 100.00\nTotal: $113.03\nThank you".to_vec(), "text/plain").await.unwrap();

    let business_id = BusinessId::new();
    let account_id = AccountId::new();
    let document_id = DocumentId::new();

    let documents = Arc::new(StubDocuments::default());
    documents.seed(DocumentRecord {
        id: document_id,
        business_id,
        uploaded_by: UserId::new(),
        storage_path: "receipt.txt".to_string(),
        file_name: "receipt.txt".to_string(),
        mime_type: "text/plain".to_string(),
    });

    let categories = vec![CategoryRef {
        id: CategoryId::new(),
        name: "Office Supplies".to_string(),
        description: None,
        category_type: "expense".to_string(),
    }];

    let transactions = Arc::new(StubTransactions::default());
    let ledger = Arc::new(StubLedger::default());

    let orchestrator = build_orchestrator(
        storage,
        documents.clone(),
        Arc::new(StubAccounts { account_id }),
        categories,
        receipt_response(),
        transactions.clone(),
        ledger.clone(),
    );

    orchestrator.process_document(document_id).await.unwrap();

    assert_eq!(documents.status_of(document_id), super::types::ExtractionStatus::Completed);
    let completion = documents.completion_of(document_id);
    assert!(completion.confidence_score >= 0.90);
    assert!(completion.auto_created_transaction);
    assert_eq!(completion.linked_transaction_ids.len(), 1);

    let created = transactions.inserted.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].status, crate::transaction::TransactionStatus::Approved);
    assert_eq!(created[0].amount, dec!(113.03));

    let balance = ledger.get_account_balance(account_id).await.unwrap();
    assert_eq!(balance, dec!(-113.03));
}

#[tokio::test]
async fn scenario_2_missing_category_forces_pending() {
    let storage = temp_storage();
    storage.upload("receipt.txt", b"Office Depot\nSubtotal: 100.00\nTotal: $113.03\nThank you".to_vec(), "text/plain").await.unwrap();

    let business_id = BusinessId::new();
    let account_id = AccountId::new();
    let document_id = DocumentId::new();

    let documents = Arc::new(StubDocuments::default());
    documents.seed(DocumentRecord {
        id: document_id,
        business_id,
        uploaded_by: UserId::new(),
        storage_path: "receipt.txt".to_string(),
        file_name: "receipt.txt".to_string(),
        mime_type: "text/plain".to_string(),
    });

    // No categories registered, so the resolver can never match one.
    let transactions = Arc::new(StubTransactions::default());
    let ledger = Arc::new(StubLedger::default());

    let orchestrator = build_orchestrator(
        storage,
        documents.clone(),
        Arc::new(StubAccounts { account_id }),
        Vec::new(),
        receipt_response(),
        transactions.clone(),
        ledger.clone(),
    );

    orchestrator.process_document(document_id).await.unwrap();

    assert_eq!(documents.status_of(document_id), super::types::ExtractionStatus::Completed);
    let completion = documents.completion_of(document_id);
    assert_eq!(completion.linked_transaction_ids.len(), 1);

    let created = transactions.inserted.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].status, crate::transaction::TransactionStatus::Pending);
    assert!(created[0].notes.contains("MISSING REQUIRED FIELDS: CATEGORY"));

    // Pending transactions are never auto-posted to the ledger.
    assert_eq!(ledger.get_account_balance(account_id).await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
async fn missing_stored_file_marks_document_failed() {
    let storage = temp_storage();
    // Upload nothing at this path: the storage download itself will fail.
    let business_id = BusinessId::new();
    let account_id = AccountId::new();
    let document_id = DocumentId::new();

    let documents = Arc::new(StubDocuments::default());
    documents.seed(DocumentRecord {
        id: document_id,
        business_id,
        uploaded_by: UserId::new(),
        storage_path: "missing.txt".to_string(),
        file_name: "missing.txt".to_string(),
        mime_type: "text/plain".to_string(),
    });

    let orchestrator = build_orchestrator(
        storage,
        documents.clone(),
        Arc::new(StubAccounts { account_id }),
        Vec::new(),
        receipt_response(),
        Arc::new(StubTransactions::default()),
        Arc::new(StubLedger::default()),
    );

    orchestrator.process_document(document_id).await.unwrap();

    assert_eq!(documents.status_of(document_id), super::types::ExtractionStatus::Failed);
}
