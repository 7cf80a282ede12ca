use shiplog::core::error::AppError;
use shiplog::core::types::{ErrorCategory, ErrorSeverity};

#[test]
fn test_error_categories_format_in_display() {
    let cases = [
        (ErrorCategory::ValidationError, "ValidationError"),
        (ErrorCategory::UpstreamError, "UpstreamError"),
        (ErrorCategory::ConfigError, "ConfigError"),
        (ErrorCategory::TimeoutError, "TimeoutError"),
        (ErrorCategory::LoggingError, "LoggingError"),
        (ErrorCategory::SerializationError, "SerializationError"),
        (ErrorCategory::IoError, "IoError"),
        (ErrorCategory::InternalError, "InternalError"),
    ];

    for (category, expected) in cases {
        let error = AppError::new(category, "something went wrong");
        assert!(
            error.to_string().contains(expected),
            "display for {:?} should mention {}",
            category,
            expected
        );
    }
}

#[test]
fn test_validation_errors_are_warnings() {
    let error = AppError::new(ErrorCategory::ValidationError, "Score must be 0 or 1");
    assert_eq!(error.severity(), ErrorSeverity::Warning);
}

#[test]
fn test_upstream_errors_are_errors() {
    let error = AppError::new(ErrorCategory::UpstreamError, "rate limited");
    assert_eq!(error.severity(), ErrorSeverity::Error);
}

#[test]
fn test_error_codes_are_unique_by_default() {
    let a = AppError::new(ErrorCategory::InternalError, "one");
    let b = AppError::new(ErrorCategory::InternalError, "two");
    assert_ne!(a.code, b.code);
    assert!(a.code.starts_with("ERR-"));
}

#[test]
fn test_with_code_and_context_builders() {
    let error = AppError::new(ErrorCategory::UpstreamError, "commit listing failed")
        .with_code("GH-500")
        .with_context("octocat/Hello-World");
    assert_eq!(error.code, "GH-500");
    assert!(error.to_string().contains("octocat/Hello-World"));
}

#[test]
fn test_detail_is_message_only() {
    let error = AppError::new(ErrorCategory::LoggingError, "collaborator unreachable")
        .with_code("LOG-1");
    assert_eq!(error.detail(), "collaborator unreachable");
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
    let error: AppError = io_error.into();
    assert_eq!(error.category, ErrorCategory::IoError);
    assert!(error.source.is_some());
}

#[test]
fn test_serde_error_conversion() {
    let serde_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: AppError = serde_error.into();
    assert_eq!(error.category, ErrorCategory::SerializationError);
}

#[test]
fn test_anyhow_error_conversion() {
    let error: AppError = anyhow::anyhow!("wrapped failure").into();
    assert_eq!(error.category, ErrorCategory::InternalError);
    assert_eq!(error.message, "wrapped failure");
}

#[test]
fn test_display_includes_cause() {
    let source = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
    let error = AppError::with_source(
        ErrorCategory::IoError,
        "failed to persist report",
        Box::new(source),
    );
    let rendered = error.to_string();
    assert!(rendered.contains("failed to persist report"));
    assert!(rendered.contains("disk on fire"));
}
