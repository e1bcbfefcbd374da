/// Tests for the logging system
///
/// The global logger is process-wide, so the capture test runs as a single
/// test function to avoid interleaving with other logger mutations.

use super::*;
use std::sync::{Arc, Mutex};

/// Test logger that captures entries instead of printing them
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
fn test_custom_logger_receives_entries() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    set_logger(CaptureLogger { entries: entries.clone() });

    dispatch(LogSeverity::Info, "mage::test", "hello".to_string());
    dispatch_detailed(LogSeverity::Error, "mage::test", "boom".to_string(), file!(), line!());

    reset_logger();

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 2);

    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].source, "mage::test");
    assert_eq!(captured[0].message, "hello");
    assert!(captured[0].file.is_none());

    assert_eq!(captured[1].severity, LogSeverity::Error);
    assert!(captured[1].file.is_some());
    assert!(captured[1].line.is_some());
}

#[test]
fn test_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}
