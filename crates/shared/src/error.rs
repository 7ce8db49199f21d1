//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types, per the error taxonomy every component converges on.
///
/// Nothing in this workspace serves HTTP directly, but `status_code`/
/// `error_code` remain the uniform vocabulary a future API layer (or the
/// worker's own structured logging) would key off of.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad input, a missing required field, or an unknown enum value.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller's role/permission does not allow the requested action.
    #[error("Access denied: {0}")]
    PermissionDenied(String),

    /// A format extractor failed; terminal for the document.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// The LLM provider returned a transport error or unparseable response
    /// after exhausting its own retry budget.
    #[error("LLM provider error: {0}")]
    Llm(String),

    /// An external call exceeded its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// A ledger append was rejected by the unique `transaction_id` constraint.
    ///
    /// Callers treat this as a no-op, not a failure.
    #[error("Duplicate ledger entry for transaction: {0}")]
    DuplicateEntry(String),

    /// A ledger post-check failed: `amount_after != amount_before + change`,
    /// or a second entry was about to be written for a transaction that
    /// already has one. Fatal for that approval.
    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Any other external collaborator (object storage, etc).
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal error with no better classification.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code this error would surface as, were an API
    /// layer built over this core.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) => 404,
            Self::DuplicateEntry(_) => 409,
            Self::Extraction(_) | Self::InvariantViolation(_) => 422,
            Self::Timeout(_) => 504,
            Self::Llm(_) | Self::Database(_) | Self::ExternalService(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::Extraction(_) => "EXTRACTION_ERROR",
            Self::Llm(_) => "LLM_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
            Self::Database(_) => "DATABASE_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for the error kinds §7 says are retried by the caller rather
    /// than surfaced immediately.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Llm(_) | Self::Timeout(_))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}
