//! `SeaORM` entity for the `documents` table (spec.md §3 `Document`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ExtractionStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub business_id: Uuid,
    pub uploaded_by: Uuid,
    pub file_path: String,
    pub mime_type: String,
    pub document_name: String,
    pub extraction_status: ExtractionStatus,
    pub document_type: Option<String>,
    pub raw_text: Option<String>,
    pub structured_data: Option<Json>,
    pub confidence_score: Option<f32>,
    pub processing_error: Option<String>,
    pub processed_at: Option<DateTimeWithTimeZone>,
    pub transaction_id: Option<Uuid>,
    pub auto_created_transaction: bool,
    pub linked_transaction_ids: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::businesses::Entity",
        from = "Column::BusinessId",
        to = "super::businesses::Column::Id"
    )]
    Businesses,
}

impl Related<super::businesses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Businesses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
