//! Note event recording for audit and debugging.
//!
//! Every mutating `NoteStore` operation emits one event, successful or not.

use chrono::{DateTime, Utc};

/// The kind of note operation that generated an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteEventKind {
    Initialize,
    Append,
    Edit,
    Delete,
    Purge,
}

impl std::fmt::Display for NoteEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initialize => "initialize",
            Self::Append => "append",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Purge => "purge",
        };
        f.write_str(s)
    }
}

/// Outcome of a note operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteEventOutcome {
    Success,
    /// Completed without changing anything (e.g. deleting a missing note).
    Unchanged,
    Error(String),
}

impl std::fmt::Display for NoteEventOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Unchanged => f.write_str("unchanged"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NoteEvent {
    pub timestamp: DateTime<Utc>,
    pub plugin_id: String,
    pub kind: NoteEventKind,
    pub outcome: NoteEventOutcome,
    pub index: Option<String>,
    pub user: Option<String>,
}

impl NoteEvent {
    pub fn new(
        plugin_id: impl Into<String>,
        kind: NoteEventKind,
        outcome: NoteEventOutcome,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            plugin_id: plugin_id.into(),
            kind,
            outcome,
            index: None,
            user: None,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// Receives note events.
pub trait NoteEventSink {
    fn record(&self, event: NoteEvent);
}

/// In-memory event sink for testing.
#[derive(Default)]
pub struct InMemoryEventSink {
    events: std::sync::Mutex<Vec<NoteEvent>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NoteEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self) -> usize {
        match self.events.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl NoteEventSink for InMemoryEventSink {
    fn record(&self, event: NoteEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Forwards events to `tracing` under the `notes::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl NoteEventSink for TracingEventSink {
    fn record(&self, event: NoteEvent) {
        let index = event.index.as_deref().unwrap_or("-");
        let user = event.user.as_deref().unwrap_or("-");
        match &event.outcome {
            NoteEventOutcome::Error(message) => tracing::warn!(
                target: "notes::audit",
                plugin_id = %event.plugin_id,
                kind = %event.kind,
                index,
                user,
                error = %message,
                "note operation failed"
            ),
            outcome => tracing::info!(
                target: "notes::audit",
                plugin_id = %event.plugin_id,
                kind = %event.kind,
                index,
                user,
                outcome = %outcome,
                "note operation"
            ),
        }
    }
}

/// No-op event sink that discards all events.
pub struct NullEventSink;

impl NoteEventSink for NullEventSink {
    fn record(&self, _event: NoteEvent) {}
}
