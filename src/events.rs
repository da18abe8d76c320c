//! Structured diagnostic events
//!
//! Stages never talk to a process-wide logger. They receive an [`EventSink`] and emit
//! [`DiagnosticEvent`]s; [`TracingSink`] forwards them to `tracing`, [`MemorySink`] keeps
//! them for inspection.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Severity attached to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
}

/// A structured event emitted by a pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    /// Stage that emitted the event (e.g. "model_selection")
    pub stage: String,
    pub level: EventLevel,
    pub message: String,
    /// Key/value context, rendered as structured fields by the tracing sink
    pub fields: Vec<(String, String)>,
}

impl DiagnosticEvent {
    pub fn new(stage: &str, level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            stage: stage.to_string(),
            level,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn info(stage: &str, message: impl Into<String>) -> Self {
        Self::new(stage, EventLevel::Info, message)
    }

    pub fn warn(stage: &str, message: impl Into<String>) -> Self {
        Self::new(stage, EventLevel::Warn, message)
    }

    pub fn debug(stage: &str, message: impl Into<String>) -> Self {
        Self::new(stage, EventLevel::Debug, message)
    }

    pub fn with_field(mut self, key: &str, value: impl ToString) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    fn rendered_fields(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Receiver for stage events
pub trait EventSink: Send + Sync {
    fn record(&self, event: DiagnosticEvent);
}

/// Forwards events to the `tracing` subscriber installed by the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: DiagnosticEvent) {
        let fields = event.rendered_fields();
        match event.level {
            EventLevel::Debug => debug!(stage = %event.stage, fields = %fields, "{}", event.message),
            EventLevel::Info => info!(stage = %event.stage, fields = %fields, "{}", event.message),
            EventLevel::Warn => warn!(stage = %event.stage, fields = %fields, "{}", event.message),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }

    /// Events emitted by one stage, in emission order
    pub fn for_stage(&self, stage: &str) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.stage == stage)
            .cloned()
            .collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: DiagnosticEvent) {
        self.events.lock().push(event);
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: DiagnosticEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.record(DiagnosticEvent::info("profiling", "first"));
        sink.record(DiagnosticEvent::warn("leakage", "second").with_field("feature", "age"));
        sink.record(DiagnosticEvent::debug("profiling", "third"));

        let all = sink.events();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].fields, vec![("feature".to_string(), "age".to_string())]);

        let profiling = sink.for_stage("profiling");
        assert_eq!(profiling.len(), 2);
        assert_eq!(profiling[1].message, "third");
    }

    #[test]
    fn test_rendered_fields() {
        let event = DiagnosticEvent::info("model_selection", "done")
            .with_field("model", "RandomForest")
            .with_field("score", 0.5);
        assert_eq!(event.rendered_fields(), "model=RandomForest score=0.5");
    }
}
