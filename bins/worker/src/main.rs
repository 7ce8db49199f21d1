//! ledgerstream worker
//!
//! Entry point for the background ingestion-to-ledger worker: no HTTP
//! surface, just a bounded pool of Orchestrator tasks draining a queue of
//! document ids discovered by polling `documents` for `pending` rows.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledgerstream_core::category::CategoryResolver;
use ledgerstream_core::extraction::{ImageExtractor, MockOcrEngine, PdfExtractor, SpreadsheetExtractor};
use ledgerstream_core::ledger::LedgerService;
use ledgerstream_core::llm::{LlmExtractor, OpenAiCompatibleClient};
use ledgerstream_core::orchestrator::{Orchestrator, OrchestratorConfig, WorkerPool};
use ledgerstream_core::processor::DocumentProcessor;
use ledgerstream_core::storage::{StorageConfig, StorageProvider, StorageService};
use ledgerstream_core::transaction::TransactionCreator;
use ledgerstream_db::repositories::{
    SeaOrmAccountRepository, SeaOrmCategoryRepository, SeaOrmDocumentRepository, SeaOrmLedgerRepository,
    SeaOrmTransactionRepository,
};
use ledgerstream_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "ledgerstream=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().expect("failed to load configuration");

    let db = ledgerstream_db::connect(&config.database.url).await?;
    info!("connected to database");

    let documents = Arc::new(SeaOrmDocumentRepository::new(db.clone()));
    let accounts = Arc::new(SeaOrmAccountRepository::new(db.clone()));
    let categories_repo = Arc::new(SeaOrmCategoryRepository::new(db.clone()));
    let transactions_repo = Arc::new(SeaOrmTransactionRepository::new(db.clone()));
    let ledger_repo = Arc::new(SeaOrmLedgerRepository::new(db));

    let storage = Arc::new(create_storage_service(&config)?);

    let processor = Arc::new(
        DocumentProcessor::new()
            .register("pdf", Box::new(PdfExtractor::new(config.storage.max_file_size_mb * 1024 * 1024)))
            .register(
                "spreadsheet",
                Box::new(SpreadsheetExtractor::new(config.storage.max_file_size_mb * 1024 * 1024)),
            )
            .register(
                "image",
                Box::new(ImageExtractor::new(MockOcrEngine, config.storage.max_file_size_mb * 1024 * 1024)),
            ),
    );

    let categories = Arc::new(CategoryResolver::new(categories_repo));
    let transactions = Arc::new(TransactionCreator::new(transactions_repo));
    let ledger = Arc::new(LedgerService::new(ledger_repo));

    let llm_client = OpenAiCompatibleClient::new(
        config.llm.provider_url.clone(),
        config.llm.api_key.clone(),
        config.llm.model.clone(),
        config.llm.temperature,
        Duration::from_secs(config.llm.request_timeout_secs),
    );
    let llm = Arc::new(LlmExtractor::new(llm_client));

    let orchestrator_config = OrchestratorConfig {
        pool_size: config.worker.pool_size,
        ocr_subpool_permits: config.worker.ocr_subpool_size,
        document_timeout_secs: config.worker.document_timeout_secs,
        extraction_confidence_threshold: decimal_to_f32(config.extraction.confidence_threshold),
        transaction_confidence_threshold: decimal_to_f32(config.extraction.auto_approval_threshold),
        stale_processing_after_secs: i64::try_from(config.worker.stale_after_secs).unwrap_or(i64::MAX),
        stale_sweep_interval_secs: config.worker.stale_sweep_interval_secs,
        discovery_poll_interval_secs: config.worker.discovery_poll_interval_secs,
        system_user_id: ledgerstream_shared::types::UserId::from_uuid(config.worker.system_user_id),
        max_file_size_bytes: config.storage.max_file_size_mb * 1024 * 1024,
    };

    let orchestrator = Arc::new(Orchestrator::new(
        documents.clone(),
        accounts,
        storage,
        processor,
        ledgerstream_core::chunk::ChunkerConfig {
            max_chunk_size: config.chunker.max_chunk_size,
            overlap: config.chunker.overlap,
            max_transactions_per_chunk: config.chunker.max_transactions_per_chunk,
        },
        categories,
        llm,
        transactions,
        ledger,
        orchestrator_config.clone(),
    ));

    let pool = WorkerPool::spawn(orchestrator, documents, &orchestrator_config);
    info!(pool_size = orchestrator_config.pool_size, "worker pool started");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining in-flight documents");
    pool.shutdown().await;

    Ok(())
}

/// `temperature` is kept as a `Decimal` everywhere except the LLM wire
/// protocol and this config-boundary comparison, which both need `f32`.
fn decimal_to_f32(value: rust_decimal::Decimal) -> f32 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f32().unwrap_or(0.7)
}

/// Builds the storage service from `STORAGE_TYPE` and its provider-specific
/// environment variables, layering the configured file-size cap and
/// allowed MIME list from `config/default.toml` on top.
fn create_storage_service(config: &AppConfig) -> anyhow::Result<StorageService> {
    let storage_type = std::env::var("STORAGE_TYPE").unwrap_or_else(|_| "local".to_string());

    let provider = match storage_type.as_str() {
        "s3" => {
            let endpoint = std::env::var("STORAGE_S3_ENDPOINT")?;
            let access_key = std::env::var("STORAGE_S3_ACCESS_KEY")?;
            let secret_key = std::env::var("STORAGE_S3_SECRET_KEY")?;
            let region = std::env::var("STORAGE_S3_REGION").unwrap_or_else(|_| "auto".to_string());
            info!(endpoint = %endpoint, bucket = %config.storage.bucket, "configuring S3-compatible storage");
            StorageProvider::s3(endpoint, config.storage.bucket.clone(), access_key, secret_key, region)
        }
        "azure" => {
            let account = std::env::var("STORAGE_AZURE_ACCOUNT")?;
            let access_key = std::env::var("STORAGE_AZURE_ACCESS_KEY")?;
            info!(account = %account, container = %config.storage.bucket, "configuring Azure Blob storage");
            StorageProvider::azure_blob(account, access_key, config.storage.bucket.clone())
        }
        _ => {
            let path = std::env::var("STORAGE_LOCAL_PATH").unwrap_or_else(|_| "./documents".to_string());
            info!(path = %path, "configuring local filesystem storage");
            StorageProvider::local_fs(&path)
        }
    };

    let storage_config = StorageConfig::new(provider)
        .with_max_file_size(config.storage.max_file_size_mb * 1024 * 1024)
        .with_allowed_mime_types(config.storage.allowed_mime_types.clone());

    Ok(StorageService::from_config(storage_config)?)
}
