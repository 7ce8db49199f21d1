use super::*;

#[test]
fn test_app_error_status_codes() {
    assert_eq!(AppError::Validation("test".into()).status_code(), 400);
    assert_eq!(AppError::NotFound("test".into()).status_code(), 404);
    assert_eq!(AppError::PermissionDenied("test".into()).status_code(), 403);
    assert_eq!(AppError::Extraction("test".into()).status_code(), 422);
    assert_eq!(AppError::Llm("test".into()).status_code(), 500);
    assert_eq!(AppError::Timeout("test".into()).status_code(), 504);
    assert_eq!(AppError::DuplicateEntry("test".into()).status_code(), 409);
    assert_eq!(
        AppError::InvariantViolation("test".into()).status_code(),
        422
    );
    assert_eq!(AppError::Database("test".into()).status_code(), 500);
    assert_eq!(AppError::ExternalService("test".into()).status_code(), 500);
    assert_eq!(AppError::Internal("test".into()).status_code(), 500);
}

#[test]
fn test_app_error_error_codes() {
    assert_eq!(
        AppError::Validation("test".into()).error_code(),
        "VALIDATION_ERROR"
    );
    assert_eq!(AppError::NotFound("test".into()).error_code(), "NOT_FOUND");
    assert_eq!(
        AppError::PermissionDenied("test".into()).error_code(),
        "PERMISSION_DENIED"
    );
    assert_eq!(
        AppError::Extraction("test".into()).error_code(),
        "EXTRACTION_ERROR"
    );
    assert_eq!(AppError::Llm("test".into()).error_code(), "LLM_ERROR");
    assert_eq!(AppError::Timeout("test".into()).error_code(), "TIMEOUT");
    assert_eq!(
        AppError::DuplicateEntry("test".into()).error_code(),
        "DUPLICATE_ENTRY"
    );
    assert_eq!(
        AppError::InvariantViolation("test".into()).error_code(),
        "INVARIANT_VIOLATION"
    );
    assert_eq!(
        AppError::Database("test".into()).error_code(),
        "DATABASE_ERROR"
    );
    assert_eq!(
        AppError::ExternalService("test".into()).error_code(),
        "EXTERNAL_SERVICE_ERROR"
    );
    assert_eq!(
        AppError::Internal("test".into()).error_code(),
        "INTERNAL_ERROR"
    );
}

#[test]
fn test_app_error_retryable() {
    assert!(AppError::Llm("x".into()).is_retryable());
    assert!(AppError::Timeout("x".into()).is_retryable());
    assert!(!AppError::Validation("x".into()).is_retryable());
    assert!(!AppError::DuplicateEntry("x".into()).is_retryable());
}

#[test]
fn test_app_error_display() {
    assert_eq!(
        format!("{}", AppError::Validation("msg".into())),
        "Validation error: msg"
    );
    assert_eq!(
        format!("{}", AppError::NotFound("msg".into())),
        "Not found: msg"
    );
    assert_eq!(
        format!("{}", AppError::DuplicateEntry("tx-1".into())),
        "Duplicate ledger entry for transaction: tx-1"
    );
    assert_eq!(
        format!("{}", AppError::InvariantViolation("msg".into())),
        "Ledger invariant violated: msg"
    );
}
