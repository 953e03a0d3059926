//! Diagnostic logger sink
//!
//! The repository reports domain-level diagnostics, such as a lookup that
//! matched nothing, through an `Arc<dyn Logger>` handed to it at
//! construction. `tracing` stays the process-wide transport: the binary
//! wires a [`TracingLogger`] that forwards every entry to the installed
//! subscriber. The sink exists so those diagnostics are part of a
//! component's contract. A test can hand in a [`MemoryLogger`] and assert
//! that a warning was emitted with the right metadata, without installing a
//! global subscriber. [`NullLogger`] silences a component entirely.
//!
//! Adapter internals keep calling `tracing` macros directly; they have no
//! diagnostics callers need to observe.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Metadata attached to a log entry
pub type Meta = HashMap<String, String>;

/// Destination for a component's diagnostics
///
/// Implementors provide [`Logger::log`]; the per-level methods forward to it.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, meta: Option<&Meta>);

    fn debug(&self, message: &str, meta: Option<&Meta>) {
        self.log(LogLevel::Debug, message, meta);
    }

    fn info(&self, message: &str, meta: Option<&Meta>) {
        self.log(LogLevel::Info, message, meta);
    }

    fn warn(&self, message: &str, meta: Option<&Meta>) {
        self.log(LogLevel::Warn, message, meta);
    }

    fn error(&self, message: &str, meta: Option<&Meta>) {
        self.log(LogLevel::Error, message, meta);
    }
}

/// Forwards to the `tracing` facade, tagging every event with a context name
#[derive(Debug, Clone)]
pub struct TracingLogger {
    context: String,
}

impl TracingLogger {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

/// Render metadata as `key=value` pairs in key order
fn render_meta(meta: Option<&Meta>) -> String {
    meta.map(|meta| {
        meta.iter()
            .collect::<BTreeMap<_, _>>()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    })
    .unwrap_or_default()
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, meta: Option<&Meta>) {
        let meta = render_meta(meta);
        match level {
            LogLevel::Debug => tracing::debug!(context = %self.context, meta = %meta, "{}", message),
            LogLevel::Info => tracing::info!(context = %self.context, meta = %meta, "{}", message),
            LogLevel::Warn => tracing::warn!(context = %self.context, meta = %meta, "{}", message),
            LogLevel::Error => tracing::error!(context = %self.context, meta = %meta, "{}", message),
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: LogLevel, _message: &str, _meta: Option<&Meta>) {}
}

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A log call captured by [`MemoryLogger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub meta: Meta,
}

/// Keeps every log call in memory so tests can assert on diagnostics.
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Entries logged at the given level
    pub fn at_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level == level)
            .collect()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: LogLevel, message: &str, meta: Option<&Meta>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                message: message.to_string(),
                meta: meta.cloned().unwrap_or_default(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_meta_is_sorted() {
        let mut meta = HashMap::new();
        meta.insert("filter".to_string(), "{}".to_string());
        meta.insert("collection".to_string(), "reservations".to_string());

        assert_eq!(render_meta(Some(&meta)), "collection=reservations filter={}");
        assert_eq!(render_meta(None), "");
    }

    #[test]
    fn test_memory_logger_captures_levels() {
        let logger = MemoryLogger::new();
        let shared = logger.clone();

        logger.info("started", None);
        let mut meta = HashMap::new();
        meta.insert("key".to_string(), "value".to_string());
        shared.warn("something odd", Some(&meta));

        assert_eq!(logger.entries().len(), 2);

        let warnings = logger.at_level(LogLevel::Warn);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "something odd");
        assert_eq!(warnings[0].meta.get("key").map(String::as_str), Some("value"));
    }

    #[test]
    fn test_tracing_logger_context() {
        let logger = TracingLogger::new("ReservationRepository");
        assert_eq!(logger.context(), "ReservationRepository");
        // No subscriber installed: must not panic
        logger.warn("Document was not found", None);
    }

    #[test]
    fn test_level_methods_route_through_log() {
        #[derive(Default)]
        struct Levels(Mutex<Vec<LogLevel>>);

        impl Logger for Levels {
            fn log(&self, level: LogLevel, _message: &str, _meta: Option<&Meta>) {
                self.0.lock().unwrap().push(level);
            }
        }

        let sink = Levels::default();
        sink.debug("d", None);
        sink.info("i", None);
        sink.warn("w", None);
        sink.error("e", None);

        assert_eq!(
            *sink.0.lock().unwrap(),
            vec![LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Error]
        );
    }
}
