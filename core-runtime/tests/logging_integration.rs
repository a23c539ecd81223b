//! Integration tests for logging system

use core_runtime::logging::{
    init_logging, redact_if_sensitive, redact_uri, LogEntry, LogFormat, LogLevel, LoggerSink,
    LoggingConfig,
};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl LoggerSink for CollectingSink {
    fn log(&self, entry: LogEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

#[test]
fn test_logging_config_builder() {
    // Logging can only be initialized once per process, so the builder is
    // tested separately from `init_logging`.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug)
        .with_spans(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Debug);
    assert!(config.enable_spans);
    assert!(config.logger_sink.is_none());
}

#[test]
fn test_init_logging_forwards_to_sink_and_rejects_second_init() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_filter("logging_integration=debug")
        .with_logger_sink(sink.clone());

    init_logging(config).expect("first initialization succeeds");

    tracing::debug!(position_ms = 1500u64, "seek requested");

    {
        let entries = sink.entries.lock().unwrap();
        let entry = entries
            .iter()
            .find(|e| e.message == "seek requested")
            .expect("event forwarded to sink");
        assert_eq!(entry.level, LogLevel::Debug);
        assert_eq!(entry.fields.get("position_ms"), Some(&"1500".to_string()));
    }

    assert!(init_logging(LoggingConfig::default()).is_err());
}

#[test]
fn test_redaction_helpers() {
    assert_eq!(redact_if_sensitive("drm_license_key", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("uri_scheme", "https"), "https");

    assert_eq!(
        redact_uri("https://cdn.example.com/a/b/manifest.mpd?token=secret"),
        "https://cdn.example.com/a/b/manifest.mpd"
    );
    assert_eq!(redact_uri("content://media/external/video/42"), "content://media/external/video/42");
}
