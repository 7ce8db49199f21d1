//! Orchestrator (§4.10): the background job tying every other component
//! into one document-processing pipeline, plus the worker pool and
//! stale-status sweep that run it (§5, P4).

mod error;
mod pool;
mod service;
#[cfg(test)]
mod service_tests;
mod types;

pub use error::OrchestratorError;
pub use pool::WorkerPool;
pub use service::Orchestrator;
pub use types::{
    pick_primary_account, AccountRef, AccountRepository, DocumentCompletion, DocumentRecord,
    DocumentRepository, ExtractionStatus, OrchestratorConfig,
};
