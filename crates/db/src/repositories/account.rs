//! Account repository: resolves the active accounts a business can post
//! transactions against (spec.md §3 `Account`, §4.10 step 5).

use ledgerstream_core::orchestrator::{AccountRef, AccountRepository, OrchestratorError};
use ledgerstream_shared::types::BusinessId;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::accounts;

/// `SeaORM`-backed `AccountRepository`.
#[derive(Debug, Clone)]
pub struct SeaOrmAccountRepository {
    db: DatabaseConnection,
}

impl SeaOrmAccountRepository {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl AccountRepository for SeaOrmAccountRepository {
    async fn list_active_accounts(&self, business_id: BusinessId) -> Result<Vec<AccountRef>, OrchestratorError> {
        let accounts = accounts::Entity::find()
            .filter(accounts::Column::BusinessId.eq(business_id.into_inner()))
            .filter(accounts::Column::IsActive.eq(true))
            .all(&self.db)
            .await
            .map_err(|e| OrchestratorError::Repository(e.to_string()))?;

        Ok(accounts
            .into_iter()
            .map(|a| AccountRef {
                id: ledgerstream_shared::types::AccountId::from_uuid(a.id),
                is_primary: a.is_primary,
                is_active: a.is_active,
            })
            .collect())
    }
}
