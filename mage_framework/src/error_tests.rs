/// Tests for the framework error taxonomy
///
/// These tests validate the fatal/recoverable classification and the
/// Display formatting used by the top-level error report.

use super::*;

// ============================================================================
// Tests: ErrorKind classification
// ============================================================================

#[test]
fn test_surface_out_of_date_is_recoverable() {
    let err = Error::SurfaceOutOfDate;
    assert_eq!(err.kind(), ErrorKind::Recoverable);
    assert!(err.is_recoverable());
}

#[test]
fn test_configuration_errors_are_fatal() {
    let err = Error::Configuration("unsupported layout transition".to_string());
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert!(!err.is_recoverable());
}

#[test]
fn test_backend_errors_are_fatal() {
    assert_eq!(Error::Backend("vkCreateDevice failed".to_string()).kind(), ErrorKind::Fatal);
    assert_eq!(Error::OutOfMemory.kind(), ErrorKind::Fatal);
    assert_eq!(Error::Io("missing file".to_string()).kind(), ErrorKind::Fatal);
}

#[test]
fn test_resource_not_found_is_fatal() {
    let err = Error::ResourceNotFound("model 'house'".to_string());
    assert_eq!(err.kind(), ErrorKind::Fatal);
}

// ============================================================================
// Tests: Display formatting
// ============================================================================

#[test]
fn test_display_includes_message() {
    let err = Error::Configuration("no graphics queue".to_string());
    assert!(err.to_string().contains("no graphics queue"));
}

#[test]
fn test_display_surface_out_of_date_mentions_resize() {
    assert!(Error::SurfaceOutOfDate.to_string().contains("resize"));
}

#[test]
fn test_error_is_std_error() {
    fn assert_std_error<E: std::error::Error>(_: &E) {}
    assert_std_error(&Error::OutOfMemory);
}
