/*!
 * Tests for error types and their conversions
 */

use ibut::errors::{AppError, BatchError, LanguageError, ProviderError};

#[test]
fn test_display_shouldIncludeDetails() {
    let error = ProviderError::ApiError { status_code: 500, message: "boom".into() };
    assert_eq!(error.to_string(), "API responded with error: 500 - boom");

    let error = LanguageError::MalformedDirection("zhen".into());
    assert!(error.to_string().contains("'zhen'"));

    let error = BatchError::InvalidRecord { line: 7, message: "bad".into() };
    assert_eq!(error.to_string(), "Invalid record at line 7: bad");
}

#[test]
fn test_appError_shouldWrapDomainErrors() {
    let app: AppError = LanguageError::InvalidCode("zz".into()).into();
    assert!(matches!(app, AppError::Language(_)));
    assert_eq!(app.to_string(), "Language error: Invalid language code: zz");

    let app: AppError = ProviderError::EmptyResponse.into();
    assert!(matches!(app, AppError::Provider(_)));

    let app: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
    assert!(matches!(app, AppError::File(_)));

    let app: AppError = anyhow::anyhow!("something else").into();
    assert!(matches!(app, AppError::Unknown(_)));
}
