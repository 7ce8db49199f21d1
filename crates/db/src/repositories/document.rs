//! Document repository: the status-transition seam the Orchestrator
//! drives a document through (spec.md §3 `Document`, §4.10, §5 stale sweep).

use chrono::{DateTime, Utc};
use ledgerstream_core::orchestrator::{DocumentCompletion, DocumentRecord, DocumentRepository, OrchestratorError};
use ledgerstream_shared::types::{DocumentId, TransactionId};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait};

use crate::entities::documents;
use crate::entities::sea_orm_active_enums::ExtractionStatus;

/// `SeaORM`-backed `DocumentRepository`.
#[derive(Debug, Clone)]
pub struct SeaOrmDocumentRepository {
    db: DatabaseConnection,
}

impl SeaOrmDocumentRepository {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find(&self, document_id: DocumentId) -> Result<documents::Model, OrchestratorError> {
        documents::Entity::find_by_id(document_id.into_inner())
            .one(&self.db)
            .await
            .map_err(|e| OrchestratorError::Repository(e.to_string()))?
            .ok_or_else(|| OrchestratorError::Repository(format!("document {document_id} not found")))
    }
}

impl DocumentRepository for SeaOrmDocumentRepository {
    async fn get(&self, document_id: DocumentId) -> Result<DocumentRecord, OrchestratorError> {
        let model = self.find(document_id).await?;
        Ok(DocumentRecord {
            id: DocumentId::from_uuid(model.id),
            business_id: ledgerstream_shared::types::BusinessId::from_uuid(model.business_id),
            uploaded_by: ledgerstream_shared::types::UserId::from_uuid(model.uploaded_by),
            storage_path: model.file_path,
            file_name: model.document_name,
            mime_type: model.mime_type,
        })
    }

    async fn mark_processing(&self, document_id: DocumentId) -> Result<(), OrchestratorError> {
        let model = self.find(document_id).await?;
        let mut active: documents::ActiveModel = model.into();
        active.extraction_status = Set(ExtractionStatus::Processing);
        active.updated_at = Set(Utc::now().into());
        active
            .update(&self.db)
            .await
            .map_err(|e| OrchestratorError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn mark_failed(&self, document_id: DocumentId, processing_error: String) -> Result<(), OrchestratorError> {
        let model = self.find(document_id).await?;
        let now = Utc::now().into();
        let mut active: documents::ActiveModel = model.into();
        active.extraction_status = Set(ExtractionStatus::Failed);
        active.processing_error = Set(Some(processing_error));
        active.processed_at = Set(Some(now));
        active.updated_at = Set(now);
        active
            .update(&self.db)
            .await
            .map_err(|e| OrchestratorError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn mark_completed(&self, document_id: DocumentId, completion: DocumentCompletion) -> Result<(), OrchestratorError> {
        let model = self.find(document_id).await?;
        let now = Utc::now().into();
        let linked_ids: Vec<uuid::Uuid> = completion
            .linked_transaction_ids
            .iter()
            .map(|id| id.into_inner())
            .collect();

        let mut active: documents::ActiveModel = model.into();
        active.extraction_status = Set(ExtractionStatus::Completed);
        active.document_type = Set(Some(completion.document_type));
        active.confidence_score = Set(Some(completion.confidence_score));
        active.transaction_id = Set(completion.transaction_id.map(TransactionId::into_inner));
        active.auto_created_transaction = Set(completion.auto_created_transaction);
        active.linked_transaction_ids = Set(Some(
            serde_json::to_value(linked_ids).map_err(|e| OrchestratorError::Repository(e.to_string()))?,
        ));
        active.processed_at = Set(Some(now));
        active.updated_at = Set(now);
        active
            .update(&self.db)
            .await
            .map_err(|e| OrchestratorError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn find_stale_processing(&self, stale_after: DateTime<Utc>) -> Result<Vec<DocumentId>, OrchestratorError> {
        let rows = documents::Entity::find()
            .filter(documents::Column::ExtractionStatus.eq(ExtractionStatus::Processing))
            .filter(documents::Column::UpdatedAt.lt(stale_after))
            .all(&self.db)
            .await
            .map_err(|e| OrchestratorError::Repository(e.to_string()))?;

        Ok(rows.into_iter().map(|row| DocumentId::from_uuid(row.id)).collect())
    }

    async fn find_pending(&self, limit: u64) -> Result<Vec<DocumentId>, OrchestratorError> {
        let txn = self.db.begin().await.map_err(|e| OrchestratorError::Repository(e.to_string()))?;

        let rows = documents::Entity::find()
            .filter(documents::Column::ExtractionStatus.eq(ExtractionStatus::Pending))
            .order_by_asc(documents::Column::CreatedAt)
            .limit(limit)
            .all(&txn)
            .await
            .map_err(|e| OrchestratorError::Repository(e.to_string()))?;

        let now = Utc::now().into();
        let mut claimed = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            let mut active: documents::ActiveModel = row.into();
            active.extraction_status = Set(ExtractionStatus::Processing);
            active.updated_at = Set(now);
            active.update(&txn).await.map_err(|e| OrchestratorError::Repository(e.to_string()))?;
            claimed.push(DocumentId::from_uuid(id));
        }

        txn.commit().await.map_err(|e| OrchestratorError::Repository(e.to_string()))?;
        Ok(claimed)
    }
}
