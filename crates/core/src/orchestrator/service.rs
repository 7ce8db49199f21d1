//! Orchestrator (§4.10): drives one document through extraction,
//! classification, chunking, LLM extraction, scoring, transaction
//! creation, and ledger posting.

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::NamedTempFile;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

use crate::category::{CategoryRepository, CategoryResolver};
use crate::chunk::{ChunkPayload, Chunker, ChunkerConfig};
use crate::classify::Classifier;
use crate::extraction::{Extractor, RawExtraction};
use crate::ledger::{AppendRequest, LedgerRepository, LedgerService, LedgerTransactionType};
use crate::llm::{ExtractedRecord, ExtractionOutcome, LlmClient, LlmExtractor, MultiTransactionResult};
use crate::processor::{DispatchRecord, DispatchStatus, DocumentProcessor};
use crate::scoring::{ActionBand, ConfidenceScorer};
use crate::storage::StorageService;
use crate::transaction::{CreateTransactionInput, CreationOutcome, Transaction, TransactionCreator, TransactionRepository, TransactionStatus};

use super::error::OrchestratorError;
use super::types::{pick_primary_account, AccountRepository, DocumentCompletion, DocumentRepository, OrchestratorConfig};

/// Everything one run of the Orchestrator needs, wired together at the
/// composition root (§9 "Global singletons": explicitly-constructed
/// handles, not statics).
pub struct Orchestrator<DR, AR, CR, TR, LR, C>
where
    DR: DocumentRepository,
    AR: AccountRepository,
    CR: CategoryRepository,
    TR: TransactionRepository,
    LR: LedgerRepository,
    C: LlmClient,
{
    documents: Arc<DR>,
    accounts: Arc<AR>,
    storage: Arc<StorageService>,
    processor: Arc<DocumentProcessor>,
    classifier: Classifier,
    chunker: Chunker,
    categories: Arc<CategoryResolver<CR>>,
    llm: Arc<LlmExtractor<C>>,
    transactions: Arc<TransactionCreator<TR>>,
    ledger: Arc<LedgerService<LR>>,
    /// Bounds how many OCR extractions run concurrently (§5), independent
    /// of `pool_size`, so a burst of scanned images can't starve the other
    /// document types the same worker pool is driving.
    ocr_subpool: Arc<Semaphore>,
    config: OrchestratorConfig,
}

impl<DR, AR, CR, TR, LR, C> Orchestrator<DR, AR, CR, TR, LR, C>
where
    DR: DocumentRepository,
    AR: AccountRepository,
    CR: CategoryRepository,
    TR: TransactionRepository,
    LR: LedgerRepository,
    C: LlmClient,
{
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        documents: Arc<DR>,
        accounts: Arc<AR>,
        storage: Arc<StorageService>,
        processor: Arc<DocumentProcessor>,
        chunker_config: ChunkerConfig,
        categories: Arc<CategoryResolver<CR>>,
        llm: Arc<LlmExtractor<C>>,
        transactions: Arc<TransactionCreator<TR>>,
        ledger: Arc<LedgerService<LR>>,
        config: OrchestratorConfig,
    ) -> Self {
        let ocr_subpool = Arc::new(Semaphore::new(config.ocr_subpool_permits.max(1)));
        Self {
            documents,
            accounts,
            storage,
            processor,
            classifier: Classifier::new(),
            chunker: Chunker::new(chunker_config),
            categories,
            llm,
            transactions,
            ledger,
            ocr_subpool,
            config,
        }
    }

    /// Runs the full §4.10 pipeline for `document_id`. Never returns an
    /// error to the caller for a document-local failure — those are
    /// caught and written onto the document as `failed`/`processing_error`
    /// (§7). Only repository/storage failures that prevent even reading
    /// the document propagate.
    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn process_document(&self, document_id: ledgerstream_shared::types::DocumentId) -> Result<(), OrchestratorError> {
        let document = self.documents.get(document_id).await?;
        self.documents.mark_processing(document_id).await?;

        let budget = Duration::from_secs(self.config.document_timeout_secs);
        match timeout(budget, self.run_pipeline(&document)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                warn!(document_id = %document_id, error = %err, "document processing failed");
                self.documents.mark_failed(document_id, err.to_string()).await?;
                Ok(())
            }
            Err(_) => {
                error!(document_id = %document_id, "document processing exceeded budget");
                self.documents
                    .mark_failed(document_id, "timeout".to_string())
                    .await?;
                Ok(())
            }
        }
    }

    /// Dispatches to the claiming extractor, routing image (OCR) documents
    /// through the bounded `ocr_subpool` on a blocking thread so a burst of
    /// scans can't starve the rest of the worker pool (§5).
    async fn dispatch_document(&self, path: &std::path::Path, mime_type: &str) -> Result<DispatchRecord, OrchestratorError> {
        if !mime_type.starts_with("image/") {
            return Ok(self.processor.process(path, mime_type));
        }

        let _permit = self
            .ocr_subpool
            .acquire()
            .await
            .map_err(|e| OrchestratorError::Storage(e.to_string()))?;

        let processor = Arc::clone(&self.processor);
        let path = path.to_path_buf();
        let mime_type = mime_type.to_string();
        tokio::task::spawn_blocking(move || processor.process(&path, &mime_type))
            .await
            .map_err(|e| OrchestratorError::Storage(e.to_string()))
    }

    async fn run_pipeline(&self, document: &super::types::DocumentRecord) -> Result<(), OrchestratorError> {
        let bytes = self
            .storage
            .download(&document.storage_path)
            .await
            .map_err(|e| OrchestratorError::Storage(e.to_string()))?;

        let mut temp_file = NamedTempFile::new().map_err(|e| OrchestratorError::Storage(e.to_string()))?;
        temp_file
            .write_all(&bytes)
            .map_err(|e| OrchestratorError::Storage(e.to_string()))?;
        // `temp_file` deletes itself on drop regardless of how this
        // function returns (§4.10 step 7).

        let dispatch = self.dispatch_document(temp_file.path(), &document.mime_type).await?;
        let raw = match dispatch.status {
            DispatchStatus::Completed(raw) => raw,
            DispatchStatus::Failed(reason) => return Err(OrchestratorError::Extraction(crate::extraction::ExtractionError::Failed(reason))),
        };

        // Classify against the document's original name, not the random
        // temp-file path it was downloaded to — filename-pattern scoring
        // depends on it.
        let classification = self.classifier.classify(
            std::path::Path::new(&document.file_name),
            &raw.raw_text,
            Some(&raw.metadata),
        );

        let category_listing = self.categories.list_for_prompt(document.business_id).await?;

        let outcome = self.run_chunks(&raw, &classification.document_type, classification.is_multi_transaction, &category_listing).await?;

        let expected_transactions = raw
            .metadata
            .get("row_count")
            .and_then(serde_json::Value::as_u64)
            .map(|n| n as usize);
        let score = ConfidenceScorer::score_outcome(&outcome, expected_transactions);

        info!(
            document_type = %classification.document_type,
            confidence = score.confidence,
            action_band = ?score.action_band,
            "document extraction scored"
        );

        let mut completion = DocumentCompletion {
            document_type: classification.document_type.clone(),
            confidence_score: score.confidence,
            ..Default::default()
        };

        if score.confidence >= self.config.extraction_confidence_threshold {
            self.create_transactions(document, &outcome, score.action_band, &mut completion).await?;
        }

        self.documents.mark_completed(document.id, completion).await?;
        Ok(())
    }

    /// Processes each chunk strictly in order, per §5's ordering guarantee,
    /// and merges the per-chunk outcomes preserving document order.
    async fn run_chunks(
        &self,
        raw: &RawExtraction,
        document_type: &str,
        force_multi: bool,
        category_listing: &str,
    ) -> Result<ExtractionOutcome, OrchestratorError> {
        let detected_count = raw
            .metadata
            .get("row_count")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0) as usize;

        if !self.chunker.should_chunk(&raw.raw_text, detected_count) {
            let text = raw.raw_text.clone();
            let single_outcome = self.llm.extract(document_type, &text, category_listing, force_multi).await;
            return Ok(single_outcome);
        }

        let chunks = self.chunker.chunk(&raw.raw_text, Some(&raw.metadata));
        let mut records: Vec<ExtractedRecord> = Vec::new();

        for chunk in chunks {
            let chunk_text = match &chunk.payload {
                ChunkPayload::Text(text) => text.clone(),
                ChunkPayload::Transactions { batch, .. } => json!({ "transactions": batch }).to_string(),
            };

            let outcome = self
                .llm
                .extract(document_type, &chunk_text, category_listing, force_multi)
                .await;
            records.extend(outcome.into_records());
        }

        Ok(ExtractionOutcome::Multi(MultiTransactionResult {
            total_raw_transactions: Some(records.len()),
            valid_transactions: Some(records.len()),
            transactions: records,
        }))
    }

    async fn create_transactions(
        &self,
        document: &super::types::DocumentRecord,
        outcome: &ExtractionOutcome,
        action_band: ActionBand,
        completion: &mut DocumentCompletion,
    ) -> Result<(), OrchestratorError> {
        let accounts = self.accounts.list_active_accounts(document.business_id).await?;
        let Some(account_id) = pick_primary_account(&accounts) else {
            warn!(business_id = %document.business_id, "no active account to post against, skipping transaction creation");
            return Ok(());
        };

        let created = match outcome {
            ExtractionOutcome::Single(record) => {
                let input = self.build_input(document, account_id, record, ConfidenceScorer::score_record(record).confidence).await?;
                if !TransactionCreator::<TR>::should_create(&input, self.config.transaction_confidence_threshold) {
                    return Ok(());
                }
                let transaction = self.transactions.create_one(input).await?;
                vec![CreationOutcome::Created(transaction)]
            }
            ExtractionOutcome::Multi(result) => {
                let mut inputs = Vec::with_capacity(result.transactions.len());
                for record in &result.transactions {
                    let confidence = ConfidenceScorer::score_record(record).confidence;
                    inputs.push(self.build_input(document, account_id, record, confidence).await?);
                }
                self.transactions.create_many(inputs).await?
            }
        };

        let mut linked_ids = Vec::new();
        for (index, outcome) in created.into_iter().enumerate() {
            if let CreationOutcome::Created(transaction) = outcome {
                linked_ids.push(transaction.id);
                if index == 0 {
                    completion.transaction_id = Some(transaction.id);
                }
                if action_band == ActionBand::AutoApprove && transaction.status == TransactionStatus::Approved {
                    self.post_to_ledger(document, &transaction).await?;
                }
            }
        }

        if !linked_ids.is_empty() {
            completion.multi_transaction_count = Some(linked_ids.len());
            completion.auto_created_transaction = true;
            completion.linked_transaction_ids = linked_ids;
        }

        Ok(())
    }

    async fn build_input(
        &self,
        document: &super::types::DocumentRecord,
        account_id: ledgerstream_shared::types::AccountId,
        record: &ExtractedRecord,
        confidence: f32,
    ) -> Result<CreateTransactionInput, OrchestratorError> {
        let category_id = match &record.category {
            Some(name) => self.categories.resolve(document.business_id, name).await?,
            None => None,
        };

        Ok(CreateTransactionInput {
            business_id: document.business_id,
            account_id,
            user_id: self.config.system_user_id,
            source_document_id: Some(document.id),
            vendor: record.vendor.clone(),
            amount: record.amount,
            date: record.date,
            description: record.description.clone(),
            category_id,
            payment_method: record.payment_method.clone(),
            is_income: record.is_income,
            confidence,
            transaction_index: None,
        })
    }

    /// Routes a freshly auto-approved transaction's balance change through
    /// the Ledger inline (§4.10 step 5).
    async fn post_to_ledger(&self, document: &super::types::DocumentRecord, transaction: &Transaction) -> Result<(), OrchestratorError> {
        let transaction_type = if transaction.is_income {
            LedgerTransactionType::Income
        } else {
            LedgerTransactionType::Expense
        };
        let change_amount = if transaction.is_income {
            transaction.amount
        } else {
            -transaction.amount
        };

        // Idempotent re-run (P5): re-appending for a transaction that
        // already has an entry is a no-op, not a failure.
        match self
            .ledger
            .append(AppendRequest {
                business_id: document.business_id,
                account_id: transaction.account_id,
                transaction_id: transaction.id,
                change_amount,
                transaction_type,
                created_by: self.config.system_user_id,
                description: transaction.description.clone(),
            })
            .await
        {
            Ok(_) | Err(crate::ledger::LedgerError::DuplicateEntry(_)) => Ok(()),
            Err(other) => Err(OrchestratorError::from(other)),
        }
    }
}
