//! Bounded background worker pool (§5) and stale-`processing` sweep (P4).
//!
//! Models the "coroutine-style background task" source pattern (§9) as an
//! explicit `mpsc` job queue drained by `pool_size` long-lived tasks,
//! rather than fire-and-forget spawns — every job stays reachable for the
//! sweep to find if its task dies mid-flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ledgerstream_shared::types::DocumentId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::error::OrchestratorError;
use super::service::Orchestrator;
use super::types::{AccountRepository, DocumentRepository, OrchestratorConfig};
use crate::category::CategoryRepository;
use crate::ledger::LedgerRepository;
use crate::llm::LlmClient;
use crate::transaction::TransactionRepository;

/// A bounded pool of workers draining a job queue of document ids.
///
/// Each `process_document` call is independent and may run in parallel
/// with others; `pool_size` is the only concurrency knob (§5).
pub struct WorkerPool {
    sender: mpsc::Sender<DocumentId>,
    workers: Vec<JoinHandle<()>>,
    sweep: Option<JoinHandle<()>>,
    discovery: Option<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `config.pool_size` worker tasks draining a shared job queue,
    /// one discovery task polling for `pending` documents, and one sweep
    /// task marking orphaned `processing` documents failed.
    pub fn spawn<DR, AR, CR, TR, LR, C>(orchestrator: Arc<Orchestrator<DR, AR, CR, TR, LR, C>>, documents: Arc<DR>, config: &OrchestratorConfig) -> Self
    where
        DR: DocumentRepository + 'static,
        AR: AccountRepository + 'static,
        CR: CategoryRepository + 'static,
        TR: TransactionRepository + 'static,
        LR: LedgerRepository + 'static,
        C: LlmClient + 'static,
    {
        let (sender, receiver) = mpsc::channel::<DocumentId>(config.pool_size * 4);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..config.pool_size)
            .map(|worker_id| {
                let orchestrator = orchestrator.clone();
                let receiver = receiver.clone();
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(document_id) = next else {
                            break;
                        };
                        info!(worker_id, document_id = %document_id, "dequeued document");
                        if let Err(err) = orchestrator.process_document(document_id).await {
                            error!(worker_id, document_id = %document_id, error = %err, "worker failed to process document");
                        }
                    }
                })
            })
            .collect();

        let sweep_interval = Duration::from_secs(config.stale_sweep_interval_secs);
        let sweep_after_secs = config.stale_processing_after_secs;
        let sweep = Some(tokio::spawn(Self::run_sweep(documents.clone(), sweep_interval, sweep_after_secs)));

        let discovery_interval = Duration::from_secs(config.discovery_poll_interval_secs);
        let discovery_sender = sender.clone();
        let discovery = Some(tokio::spawn(Self::run_discovery(documents, discovery_sender, discovery_interval, config.pool_size)));

        Self { sender, workers, sweep, discovery }
    }

    /// Enqueues a document for processing. Backpressures if every worker
    /// is busy and the channel is full.
    ///
    /// # Errors
    ///
    /// Returns an error if every worker has stopped (the channel closed).
    pub async fn enqueue(&self, document_id: DocumentId) -> Result<(), OrchestratorError> {
        self.sender
            .send(document_id)
            .await
            .map_err(|_| OrchestratorError::Repository("worker pool channel closed".to_string()))
    }

    /// Closes the queue and waits for in-flight documents to finish.
    pub async fn shutdown(self) {
        if let Some(discovery) = self.discovery {
            discovery.abort();
        }
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.await;
        }
        if let Some(sweep) = self.sweep {
            sweep.abort();
        }
    }

    /// Polls for `pending` documents and hands each to the job queue.
    /// `batch` bounds how many a single tick claims, keeping one slow
    /// poll from flooding the channel past the workers' ability to drain it.
    async fn run_discovery<DR: DocumentRepository>(documents: Arc<DR>, sender: mpsc::Sender<DocumentId>, interval: Duration, batch: usize) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            #[allow(clippy::cast_possible_truncation)]
            let limit = batch as u64;
            match documents.find_pending(limit).await {
                Ok(pending) => {
                    for document_id in pending {
                        if sender.send(document_id).await.is_err() {
                            warn!("discovery task stopping: worker pool channel closed");
                            return;
                        }
                    }
                }
                Err(err) => error!(error = %err, "pending-document discovery failed"),
            }
        }
    }

    async fn run_sweep<DR: DocumentRepository>(documents: Arc<DR>, interval: Duration, stale_after_secs: i64) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let cutoff = Utc::now() - chrono::Duration::seconds(stale_after_secs);
            match documents.find_stale_processing(cutoff).await {
                Ok(stale) => {
                    for document_id in stale {
                        warn!(document_id = %document_id, "reconciling orphaned processing document");
                        if let Err(err) = documents.mark_failed(document_id, "orphaned".to_string()).await {
                            error!(document_id = %document_id, error = %err, "failed to reconcile stale document");
                        }
                    }
                }
                Err(err) => error!(error = %err, "stale-processing sweep failed"),
            }
        }
    }
}
