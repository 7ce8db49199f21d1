//! Orchestrator repository seams and configuration (§4.10, §5, §6).

use std::future::Future;

use chrono::{DateTime, Utc};
use ledgerstream_shared::types::{AccountId, BusinessId, DocumentId, TransactionId, UserId};

use super::error::OrchestratorError;

/// Document status vocabulary (§6 wire values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// The minimal document shape the Orchestrator needs to drive one run.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub business_id: BusinessId,
    pub uploaded_by: UserId,
    pub storage_path: String,
    pub file_name: String,
    pub mime_type: String,
}

/// Fields the Orchestrator writes back onto a document when it reaches a
/// terminal status (§4.10 step 6, §4.8 document linkage).
#[derive(Debug, Clone, Default)]
pub struct DocumentCompletion {
    pub document_type: String,
    pub confidence_score: f32,
    pub transaction_id: Option<TransactionId>,
    pub linked_transaction_ids: Vec<TransactionId>,
    pub multi_transaction_count: Option<usize>,
    pub auto_created_transaction: bool,
}

/// Repository seam for document status transitions, implemented by the
/// db crate.
pub trait DocumentRepository: Send + Sync {
    fn get(&self, document_id: DocumentId) -> impl Future<Output = Result<DocumentRecord, OrchestratorError>> + Send;

    fn mark_processing(&self, document_id: DocumentId) -> impl Future<Output = Result<(), OrchestratorError>> + Send;

    fn mark_failed(
        &self,
        document_id: DocumentId,
        processing_error: String,
    ) -> impl Future<Output = Result<(), OrchestratorError>> + Send;

    fn mark_completed(
        &self,
        document_id: DocumentId,
        completion: DocumentCompletion,
    ) -> impl Future<Output = Result<(), OrchestratorError>> + Send;

    /// Every document still `processing` with `processed_at` older than
    /// `stale_after`, for the sweep (§5, P4).
    fn find_stale_processing(
        &self,
        stale_after: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<DocumentId>, OrchestratorError>> + Send;

    /// Up to `limit` documents still `pending`, oldest first, for the
    /// discovery loop that feeds the worker pool (§5: the pool processes
    /// documents handed to it; nothing in this workspace accepts uploads
    /// directly, so the pool discovers work by polling this).
    fn find_pending(&self, limit: u64) -> impl Future<Output = Result<Vec<DocumentId>, OrchestratorError>> + Send;
}

/// A business's account, as seen when resolving the posting target for
/// an auto-created transaction (§4.10 step 5: "primary active account").
#[derive(Debug, Clone, Copy)]
pub struct AccountRef {
    pub id: AccountId,
    pub is_primary: bool,
    pub is_active: bool,
}

/// Repository seam for resolving the account a document's transactions
/// post against.
pub trait AccountRepository: Send + Sync {
    /// All active accounts for the business; the Orchestrator picks the
    /// one with `is_primary = true`, falling back to an arbitrary active
    /// account when none is marked primary (§4.10 step 5).
    fn list_active_accounts(
        &self,
        business_id: BusinessId,
    ) -> impl Future<Output = Result<Vec<AccountRef>, OrchestratorError>> + Send;
}

/// Picks the business's primary active account, or an arbitrary active
/// one if none is marked primary.
#[must_use]
pub fn pick_primary_account(accounts: &[AccountRef]) -> Option<AccountId> {
    accounts
        .iter()
        .find(|a| a.is_active && a.is_primary)
        .or_else(|| accounts.iter().find(|a| a.is_active))
        .map(|a| a.id)
}

/// Orchestrator-wide configuration (§4.11/§6).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Background worker pool size (§5: default 4, range 4-8).
    pub pool_size: usize,
    /// Bounded OCR subpool permits (§5).
    pub ocr_subpool_permits: usize,
    /// Per-document timeout budget in seconds (§5: default 600s).
    pub document_timeout_secs: u64,
    /// Threshold above which `should_create_transaction` proceeds
    /// (§6: default 0.7).
    pub extraction_confidence_threshold: f32,
    /// Per-record confidence floor for `TransactionCreator::should_create`
    /// (§6: default 0.85, same value as the auto-approval threshold).
    pub transaction_confidence_threshold: f32,
    /// Stale-`processing` sweep threshold in seconds (§5: default 3600s).
    pub stale_processing_after_secs: i64,
    /// How often the stale-sweep task runs, in seconds (§5: default 300s).
    pub stale_sweep_interval_secs: u64,
    /// How often the pending-document discovery task polls, in seconds.
    pub discovery_poll_interval_secs: u64,
    /// Attributed to transactions and ledger entries the Orchestrator
    /// creates without a human in the loop.
    pub system_user_id: UserId,
    /// Max bytes passed to extraction validation (§6: default 50 MB).
    pub max_file_size_bytes: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            ocr_subpool_permits: 2,
            document_timeout_secs: 600,
            extraction_confidence_threshold: 0.7,
            transaction_confidence_threshold: 0.85,
            stale_processing_after_secs: 3600,
            stale_sweep_interval_secs: 300,
            discovery_poll_interval_secs: 5,
            system_user_id: UserId::new(),
            max_file_size_bytes: 50 * 1024 * 1024,
        }
    }
}
