//! Terminal rendering of reconciliation events.

use colored::Colorize;
use reconcile::{Event, EventKind, EventSink};
use std::cell::Cell;

/// Prints events as a colored plan and counts the changes.
///
/// Debug-level events (up to date, unmanaged, exists) are only printed when
/// `verbose` is set; otherwise they go to the log.
pub struct ConsoleSink {
    verbose: bool,
    changes: Cell<usize>,
}

impl ConsoleSink {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            changes: Cell::new(0),
        }
    }

    /// Events seen so far that imply a write.
    pub fn changes(&self) -> usize {
        self.changes.get()
    }
}

/// Marker and line for one event.
pub fn render(event: &Event) -> String {
    let line = event.to_string();
    match event.kind {
        EventKind::Changed { .. } => format!("{} {}", "~".yellow().bold(), line),
        EventKind::Created { .. } => format!("{} {}", "+".green().bold(), line.green()),
        EventKind::Deleted { .. } => format!("{} {}", "-".red().bold(), line.red()),
        EventKind::Retained { .. } => format!("{} {}", "?".blue(), line),
        EventKind::UpToDate { .. } | EventKind::Unmanaged { .. } | EventKind::Exists { .. } => {
            format!("  {}", line.dimmed())
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: Event) {
        if event.is_change() {
            self.changes.set(self.changes.get() + 1);
        }
        if event.level() <= log::Level::Info || self.verbose {
            println!("{}", render(&event));
        } else {
            log::debug!("{event}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_changes() {
        let sink = ConsoleSink::new(false);
        sink.emit(Event::new(
            "lidarr.settings.general.logging.log_level",
            EventKind::Changed {
                old: "'INFO'".into(),
                new: "'DEBUG'".into(),
            },
        ));
        sink.emit(Event::new(
            "lidarr.settings.tags.definitions[0]",
            EventKind::Exists {
                name: "flac".into(),
            },
        ));
        sink.emit(Event::new(
            "lidarr.settings.media_management.root_folders[-1]",
            EventKind::Retained {
                name: "/old".into(),
            },
        ));
        assert_eq!(sink.changes(), 1);
    }

    #[test]
    fn test_render_keeps_event_text() {
        colored::control::set_override(false);
        let event = Event::new(
            "lidarr.settings.tags.definitions[0]",
            EventKind::Created {
                name: "flac".into(),
            },
        );
        assert_eq!(render(&event), "+ lidarr.settings.tags.definitions[0]: 'flac' -> (created)");
    }
}
