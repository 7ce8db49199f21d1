//! Initial database migration.
//!
//! Creates the enums and tables for the six entities in spec.md §3:
//! `businesses`, `accounts`, `categories`, `documents`, `transactions`,
//! `ledger_entries`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: BUSINESSES
        // ============================================================
        db.execute_unprepared(BUSINESSES_SQL).await?;

        // ============================================================
        // PART 3: ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 4: CATEGORIES
        // ============================================================
        db.execute_unprepared(CATEGORIES_SQL).await?;

        // ============================================================
        // PART 5: DOCUMENTS
        // ============================================================
        db.execute_unprepared(DOCUMENTS_SQL).await?;

        // ============================================================
        // PART 6: TRANSACTIONS
        // ============================================================
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 7: LEDGER ENTRIES
        // ============================================================
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE business_status AS ENUM ('active', 'suspended', 'closed');

CREATE TYPE account_type AS ENUM (
    'checking',
    'savings',
    'credit_card',
    'investment',
    'loan',
    'cash',
    'other'
);

CREATE TYPE category_type AS ENUM ('income', 'expense');

CREATE TYPE extraction_status AS ENUM ('pending', 'processing', 'completed', 'failed');

CREATE TYPE transaction_status AS ENUM ('draft', 'pending', 'approved', 'rejected');

CREATE TYPE ledger_transaction_type AS ENUM ('income', 'expense');
";

const BUSINESSES_SQL: &str = r"
CREATE TABLE businesses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    currency CHAR(3) NOT NULL,
    status business_status NOT NULL DEFAULT 'active',
    fiscal_year_start SMALLINT NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_fiscal_year_start CHECK (fiscal_year_start BETWEEN 1 AND 12)
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    account_type account_type NOT NULL,
    currency CHAR(3) NOT NULL,
    current_balance NUMERIC(19, 2) NOT NULL DEFAULT 0,
    available_balance NUMERIC(19, 2),
    is_primary BOOLEAN NOT NULL DEFAULT false,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_accounts_business ON accounts(business_id) WHERE is_active = true;
CREATE UNIQUE INDEX idx_accounts_primary ON accounts(business_id) WHERE is_primary = true AND is_active = true;
";

const CATEGORIES_SQL: &str = r"
CREATE TABLE categories (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    category_type category_type NOT NULL,
    name VARCHAR(255) NOT NULL,
    parent_id UUID REFERENCES categories(id),
    is_system BOOLEAN NOT NULL DEFAULT false,
    display_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (business_id, parent_id, name)
);

CREATE INDEX idx_categories_business ON categories(business_id);
CREATE INDEX idx_categories_parent ON categories(parent_id) WHERE parent_id IS NOT NULL;
";

const DOCUMENTS_SQL: &str = r"
CREATE TABLE documents (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    uploaded_by UUID NOT NULL,
    file_path VARCHAR(1024) NOT NULL,
    mime_type VARCHAR(255) NOT NULL,
    document_name VARCHAR(512) NOT NULL,
    extraction_status extraction_status NOT NULL DEFAULT 'pending',
    document_type VARCHAR(100),
    raw_text TEXT,
    structured_data JSONB,
    confidence_score REAL,
    processing_error TEXT,
    processed_at TIMESTAMPTZ,
    transaction_id UUID,
    auto_created_transaction BOOLEAN NOT NULL DEFAULT false,
    linked_transaction_ids JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_documents_business ON documents(business_id);
CREATE INDEX idx_documents_status ON documents(business_id, extraction_status);
CREATE INDEX idx_documents_processing ON documents(extraction_status, processed_at) WHERE extraction_status = 'processing';
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES accounts(id),
    category_id UUID REFERENCES categories(id),
    user_id UUID NOT NULL,
    amount NUMERIC(19, 2) NOT NULL,
    transaction_date DATE NOT NULL,
    description TEXT NOT NULL,
    vendor VARCHAR(255),
    payment_method VARCHAR(100),
    is_income BOOLEAN NOT NULL,
    status transaction_status NOT NULL DEFAULT 'draft',
    notes TEXT NOT NULL DEFAULT '',
    source_document_id UUID REFERENCES documents(id),
    transaction_index INTEGER,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_amount_positive CHECK (amount > 0)
);

CREATE INDEX idx_transactions_business ON transactions(business_id, transaction_date);
CREATE INDEX idx_transactions_account ON transactions(account_id);
CREATE INDEX idx_transactions_status ON transactions(business_id, status);
CREATE INDEX idx_transactions_source_document ON transactions(source_document_id) WHERE source_document_id IS NOT NULL;

ALTER TABLE documents
    ADD CONSTRAINT fk_documents_transaction FOREIGN KEY (transaction_id) REFERENCES transactions(id);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES accounts(id),
    transaction_id UUID NOT NULL UNIQUE REFERENCES transactions(id),
    amount_before NUMERIC(19, 2) NOT NULL,
    change_amount NUMERIC(19, 2) NOT NULL,
    amount_after NUMERIC(19, 2) NOT NULL,
    transaction_type ledger_transaction_type NOT NULL,
    description TEXT NOT NULL,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_amount_after CHECK (amount_after = amount_before + change_amount)
);

CREATE INDEX idx_ledger_entries_account ON ledger_entries(account_id, created_at);
CREATE INDEX idx_ledger_entries_business ON ledger_entries(business_id);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS ledger_entries;
ALTER TABLE IF EXISTS documents DROP CONSTRAINT IF EXISTS fk_documents_transaction;
DROP TABLE IF EXISTS transactions;
DROP TABLE IF EXISTS documents;
DROP TABLE IF EXISTS categories;
DROP TABLE IF EXISTS accounts;
DROP TABLE IF EXISTS businesses;
DROP TYPE IF EXISTS ledger_transaction_type;
DROP TYPE IF EXISTS transaction_status;
DROP TYPE IF EXISTS extraction_status;
DROP TYPE IF EXISTS category_type;
DROP TYPE IF EXISTS account_type;
DROP TYPE IF EXISTS business_status;
";
