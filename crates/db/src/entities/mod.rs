//! `SeaORM` entity definitions for the ledgerstream schema (spec.md §3).

pub mod accounts;
pub mod businesses;
pub mod categories;
pub mod documents;
pub mod ledger_entries;
pub mod sea_orm_active_enums;
pub mod transactions;
