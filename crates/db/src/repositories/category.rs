//! Category repository: loads a business's active categories for the
//! Category Resolver (spec.md §3 `Category`, §4.5).

use ledgerstream_core::category::{CategoryError, CategoryRef, CategoryRepository};
use ledgerstream_shared::types::BusinessId;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::categories;
use crate::entities::sea_orm_active_enums::CategoryType;

/// `SeaORM`-backed `CategoryRepository`.
#[derive(Debug, Clone)]
pub struct SeaOrmCategoryRepository {
    db: DatabaseConnection,
}

impl SeaOrmCategoryRepository {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl CategoryRepository for SeaOrmCategoryRepository {
    async fn list_active_categories(&self, business_id: BusinessId) -> Result<Vec<CategoryRef>, CategoryError> {
        let rows = categories::Entity::find()
            .filter(categories::Column::BusinessId.eq(business_id.into_inner()))
            .order_by_asc(categories::Column::DisplayOrder)
            .all(&self.db)
            .await
            .map_err(|e| CategoryError::Storage(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| CategoryRef {
                id: ledgerstream_shared::types::CategoryId::from_uuid(row.id),
                name: row.name,
                description: None,
                category_type: category_type_label(row.category_type).to_string(),
            })
            .collect())
    }
}

fn category_type_label(category_type: CategoryType) -> &'static str {
    match category_type {
        CategoryType::Income => "income",
        CategoryType::Expense => "expense",
    }
}
