//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Application name, kept for logging/observability parity.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Application version, kept for logging/observability parity.
    #[serde(default = "default_app_version")]
    pub app_version: String,
    /// Debug mode toggle.
    #[serde(default)]
    pub debug: bool,
    /// Deployment environment (`development`, `staging`, `production`, ...).
    #[serde(default = "default_environment")]
    pub environment: String,
    /// API path prefix, kept for documentation parity even though this
    /// workspace serves no HTTP surface.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// LLM provider configuration.
    pub llm: LlmConfig,
    /// Extraction pipeline configuration.
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Chunker configuration.
    #[serde(default)]
    pub chunker: ChunkerConfig,
    /// Background worker pool configuration.
    #[serde(default)]
    pub worker: WorkerConfig,
}

fn default_app_name() -> String {
    "ledgerstream".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Object storage configuration (documents bucket).
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Bucket/container name documents are stored under.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Maximum accepted file size, in megabytes.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    /// MIME types the Document Processor will dispatch to an extractor.
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

fn default_bucket() -> String {
    "documents".to_string()
}

fn default_max_file_size_mb() -> u64 {
    50
}

fn default_allowed_mime_types() -> Vec<String> {
    vec![
        "application/pdf".to_string(),
        "image/png".to_string(),
        "image/jpeg".to_string(),
        "image/tiff".to_string(),
        "text/csv".to_string(),
        "application/vnd.ms-excel".to_string(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
    ]
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            max_file_size_mb: default_max_file_size_mb(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible chat-completions endpoint.
    pub provider_url: String,
    /// Bearer token for the LLM provider.
    pub api_key: String,
    /// Model identifier; the core is model-agnostic.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens per completion request.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature, kept as a `Decimal` at the config boundary so
    /// this crate never stores a bare float; converted to `f32` only where
    /// the LLM wire protocol requires it.
    #[serde(default = "default_temperature")]
    pub temperature: rust_decimal::Decimal,
    /// Request timeout, in seconds, for a single completion attempt.
    #[serde(default = "default_llm_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Embedding vector dimensionality, carried for schema parity though
    /// unused by the core pipeline (no vector search is implemented here).
    #[serde(default = "default_vector_dims")]
    pub vector_dims: u32,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> rust_decimal::Decimal {
    rust_decimal_macros::dec!(0.3)
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_vector_dims() -> u32 {
    1024
}

/// Extraction pipeline thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Minimum confidence score a document is expected to reach; logged
    /// when a result falls short, but routing itself follows §4.7's bands.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: rust_decimal::Decimal,
    /// Threshold at/above which a transaction auto-approves.
    #[serde(default = "default_auto_approval_threshold")]
    pub auto_approval_threshold: rust_decimal::Decimal,
}

fn default_confidence_threshold() -> rust_decimal::Decimal {
    rust_decimal_macros::dec!(0.7)
}

fn default_auto_approval_threshold() -> rust_decimal::Decimal {
    rust_decimal_macros::dec!(0.85)
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            auto_approval_threshold: default_auto_approval_threshold(),
        }
    }
}

/// Chunker parameters (§4.4).
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkerConfig {
    /// Char budget per chunk under the `size` strategy; `should_chunk`
    /// triggers at `2 ×` this value.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    /// Overlap, in chars, carried backward into the next chunk.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    /// Maximum transactions per chunk under the `transactions` strategy.
    #[serde(default = "default_max_transactions_per_chunk")]
    pub max_transactions_per_chunk: usize,
}

fn default_max_chunk_size() -> usize {
    4000
}

fn default_overlap() -> usize {
    200
}

fn default_max_transactions_per_chunk() -> usize {
    30
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            overlap: default_overlap(),
            max_transactions_per_chunk: default_max_transactions_per_chunk(),
        }
    }
}

/// Background worker pool configuration (§5).
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Number of long-lived Orchestrator worker tasks.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Size of the bounded OCR subpool (CPU-bound work).
    #[serde(default = "default_ocr_subpool_size")]
    pub ocr_subpool_size: usize,
    /// Per-document processing timeout budget, in seconds.
    #[serde(default = "default_document_timeout_secs")]
    pub document_timeout_secs: u64,
    /// How often the stale-`processing`-status sweep runs, in seconds.
    #[serde(default = "default_stale_sweep_interval_secs")]
    pub stale_sweep_interval_secs: u64,
    /// A document stuck in `processing` longer than this is reclaimed as
    /// `failed` with `processing_error = "orphaned"`.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    /// How often the pending-document discovery task polls, in seconds.
    #[serde(default = "default_discovery_poll_interval_secs")]
    pub discovery_poll_interval_secs: u64,
    /// User id attributed to transactions and ledger entries the
    /// Orchestrator creates without a human in the loop. Fixed across
    /// restarts so those rows stay attributable to one identity.
    #[serde(default = "default_system_user_id")]
    pub system_user_id: uuid::Uuid,
}

fn default_pool_size() -> usize {
    4
}

fn default_ocr_subpool_size() -> usize {
    2
}

fn default_document_timeout_secs() -> u64 {
    600
}

fn default_stale_sweep_interval_secs() -> u64 {
    300
}

fn default_stale_after_secs() -> u64 {
    3600
}

fn default_discovery_poll_interval_secs() -> u64 {
    5
}

fn default_system_user_id() -> uuid::Uuid {
    uuid::Uuid::nil()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            ocr_subpool_size: default_ocr_subpool_size(),
            document_timeout_secs: default_document_timeout_secs(),
            stale_sweep_interval_secs: default_stale_sweep_interval_secs(),
            stale_after_secs: default_stale_after_secs(),
            discovery_poll_interval_secs: default_discovery_poll_interval_secs(),
            system_user_id: default_system_user_id(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Layering follows `config/default.toml` → `config/{RUN_MODE}.toml` →
    /// `LEDGERSTREAM__`-prefixed environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or deserialized.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("LEDGERSTREAM").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
