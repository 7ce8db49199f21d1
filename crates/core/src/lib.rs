//! Core ingestion-to-ledger pipeline for ledgerstream.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, validation rules, and calculations
//! live here.
//!
//! # Modules
//!
//! - `extraction` - Format Extractors (PDF, image/OCR, spreadsheet)
//! - `processor` - Document Processor dispatch registry
//! - `classify` - Document classifier and multi-transaction detector
//! - `chunk` - Splits oversized documents for per-chunk LLM extraction
//! - `category` - Category Resolver with a short-TTL cache
//! - `llm` - LLM-driven structured extraction with retry
//! - `scoring` - Confidence Scorer yielding an action-band recommendation
//! - `ledger` - Append-only ledger posting with idempotent balance updates
//! - `storage` - Vendor-agnostic object storage (OpenDAL)
//! - `transaction` - Transaction Creator: required-field gate and status decision
//! - `orchestrator` - Background job wiring extraction through to ledger posting

pub mod category;
pub mod chunk;
pub mod classify;
pub mod extraction;
pub mod ledger;
pub mod llm;
pub mod orchestrator;
pub mod processor;
pub mod scoring;
pub mod storage;
pub mod transaction;
