//! Observable events
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events in shelfwatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Store lifecycle
    /// Data files opened and indexes rebuilt
    StoreOpened,
    /// Data files synced and released
    StoreClosed,
    /// Data file failed checksum or framing (FATAL)
    DataCorruption,

    // Tracking cycle
    /// Cycle snapshot rows written
    SnapshotRecorded,
    /// Items of other patrons dropped from a cycle
    PatronItemsSkipped,
    /// First cycle for a patron; nothing to compare against
    BaselineOnly,
    /// Transition rows written
    TransitionRecorded,
    /// One transition judged unexpected
    UnexpectedTransition,
    /// Which rule decided a disappearance
    DisappearanceClassified,
    /// Checkout due date did not match any known format
    DueDateUnparseable,

    // Retention
    /// Retention policy applied
    RetentionApplied,
}

impl Event {
    pub const ALL: [Event; 12] = [
        Event::ConfigLoaded,
        Event::StoreOpened,
        Event::StoreClosed,
        Event::DataCorruption,
        Event::SnapshotRecorded,
        Event::PatronItemsSkipped,
        Event::BaselineOnly,
        Event::TransitionRecorded,
        Event::UnexpectedTransition,
        Event::DisappearanceClassified,
        Event::DueDateUnparseable,
        Event::RetentionApplied,
    ];

    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::StoreOpened => "STORE_OPENED",
            Event::StoreClosed => "STORE_CLOSED",
            Event::DataCorruption => "DATA_CORRUPTION",

            Event::SnapshotRecorded => "SNAPSHOT_RECORDED",
            Event::PatronItemsSkipped => "PATRON_ITEMS_SKIPPED",
            Event::BaselineOnly => "BASELINE_ONLY",
            Event::TransitionRecorded => "TRANSITION_RECORDED",
            Event::UnexpectedTransition => "UNEXPECTED_TRANSITION",
            Event::DisappearanceClassified => "DISAPPEARANCE_CLASSIFIED",
            Event::DueDateUnparseable => "DUE_DATE_UNPARSEABLE",

            Event::RetentionApplied => "RETENTION_APPLIED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::DataCorruption)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        for event in Event::ALL {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::DataCorruption.is_fatal());
        assert!(!Event::UnexpectedTransition.is_fatal());
        assert!(!Event::BaselineOnly.is_fatal());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::BaselineOnly), "BASELINE_ONLY");
        assert_eq!(format!("{}", Event::RetentionApplied), "RETENTION_APPLIED");
    }
}
