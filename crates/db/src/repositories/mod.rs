//! Repository abstractions for data access.
//!
//! Each repository implements a `ledgerstream-core` trait on top of
//! `SeaORM`, hiding the schema from the rest of the application.

pub mod account;
pub mod category;
pub mod document;
pub mod ledger;
pub mod transaction;

pub use account::SeaOrmAccountRepository;
pub use category::SeaOrmCategoryRepository;
pub use document::SeaOrmDocumentRepository;
pub use ledger::SeaOrmLedgerRepository;
pub use transaction::SeaOrmTransactionRepository;
