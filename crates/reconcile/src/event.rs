//! Structured reconciliation events and the sinks that receive them.
//!
//! Every decision the engine makes (a field changed, an entry was created, a
//! remote entry is unmanaged) becomes an [`Event`] handed to the caller's
//! [`EventSink`] before any write is issued. Dry runs and real runs produce
//! the same stream.

use log::Level;
use std::cell::RefCell;
use std::fmt;

/// What happened at a tree path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Local and remote values differ; the local value will be written.
    Changed { old: String, new: String },
    /// Local and remote values already agree.
    UpToDate { value: String },
    /// Field not declared locally; the remote value is kept.
    Unmanaged { value: String },
    /// Collection entry already exists remotely.
    Exists { name: String },
    /// Collection entry is being created.
    Created { name: String },
    /// Remote collection entry is being deleted.
    Deleted { name: String },
    /// Remote collection entry is not declared locally and is left alone.
    Retained { name: String },
}

/// A single reconciliation decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Dotted tree path, e.g. `lidarr.settings.general.logging.log_level`.
    pub path: String,
    pub kind: EventKind,
}

impl Event {
    pub fn new(path: impl Into<String>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Log level this event is reported at.
    pub fn level(&self) -> Level {
        match self.kind {
            EventKind::Changed { .. }
            | EventKind::Created { .. }
            | EventKind::Deleted { .. }
            | EventKind::Retained { .. } => Level::Info,
            EventKind::UpToDate { .. } | EventKind::Unmanaged { .. } | EventKind::Exists { .. } => {
                Level::Debug
            }
        }
    }

    /// Whether this event implies a write to the remote instance.
    pub fn is_change(&self) -> bool {
        matches!(
            self.kind,
            EventKind::Changed { .. } | EventKind::Created { .. } | EventKind::Deleted { .. }
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = &self.path;
        match &self.kind {
            EventKind::Changed { old, new } => write!(f, "{path}: {old} -> {new}"),
            EventKind::UpToDate { value } => write!(f, "{path}: {value} (up to date)"),
            EventKind::Unmanaged { value } => write!(f, "{path}: {value} (unmanaged)"),
            EventKind::Exists { name } => write!(f, "{path}: '{name}' (exists)"),
            EventKind::Created { name } => write!(f, "{path}: '{name}' -> (created)"),
            EventKind::Deleted { name } => write!(f, "{path}: '{name}' -> (deleted)"),
            EventKind::Retained { name } => write!(f, "{path}: '{name}' (unmanaged)"),
        }
    }
}

/// Receiver for reconciliation events.
pub trait EventSink {
    fn emit(&self, event: Event);
}

/// Forwards events to the `log` facade at their own level.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: Event) {
        log::log!(event.level(), "{event}");
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, in order.
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Rendered log lines of events at or above info level.
    pub fn info_lines(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.level() <= Level::Info)
            .map(ToString::to_string)
            .collect()
    }

    /// Number of events that imply a write.
    pub fn change_count(&self) -> usize {
        self.events.borrow().iter().filter(|e| e.is_change()).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}
