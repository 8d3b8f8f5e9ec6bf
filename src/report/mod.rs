//! Report Queries
//!
//! Read-only projections over the stores for the presentation layer. Windows
//! are exclusive of their cutoff (`timestamp > now - days_back`).

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::item::ItemState;
use crate::snapshot::SnapshotStore;
use crate::storage::StorageResult;
use crate::transition::{ItemTransition, TransitionKind, TransitionStore};

/// Default window for transition reports, in days
pub const DEFAULT_REPORT_DAYS: u32 = 30;

/// Default window for recently seen item ids, in days
pub const DEFAULT_RECENT_ITEMS_DAYS: u32 = 90;

/// One item in a missing-items event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingItem {
    pub title: String,
    pub item_id: String,
    pub from_state: Option<ItemState>,
    pub notes: String,
}

/// Unexpected disappearances of one patron observed in one scrape cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingItemsEvent {
    pub timestamp: DateTime<Utc>,
    pub patron_name: String,
    pub missing_items: Vec<MissingItem>,
    pub total_missing: usize,
}

/// Instant `days_back` days before `now`.
///
/// A window reaching past the earliest representable instant covers all
/// history and starts there.
pub fn window_start(now: DateTime<Utc>, days_back: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(days_back)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Queries over a pair of stores.
pub struct ReportQueries<'a> {
    snapshots: &'a SnapshotStore,
    transitions: &'a TransitionStore,
}

impl<'a> ReportQueries<'a> {
    pub fn new(snapshots: &'a SnapshotStore, transitions: &'a TransitionStore) -> Self {
        Self {
            snapshots,
            transitions,
        }
    }

    /// Unexpected transitions of the last `days_back` days, newest first.
    pub fn get_unexpected_transitions(&self, days_back: u32) -> StorageResult<Vec<ItemTransition>> {
        self.get_unexpected_transitions_since(window_start(Utc::now(), days_back))
    }

    pub fn get_unexpected_transitions_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StorageResult<Vec<ItemTransition>> {
        self.transitions.unexpected_since(cutoff)
    }

    /// Unexpected disappearances of the last `days_back` days, grouped into
    /// one event per `(patron, cycle)`, newest first.
    pub fn get_missing_items_report(&self, days_back: u32) -> StorageResult<Vec<MissingItemsEvent>> {
        self.get_missing_items_report_since(window_start(Utc::now(), days_back))
    }

    pub fn get_missing_items_report_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StorageResult<Vec<MissingItemsEvent>> {
        let rows = self.transitions.unexpected_since(cutoff)?;
        Ok(group_missing(
            rows.into_iter()
                .filter(|t| t.transition_kind == TransitionKind::Disappeared),
        ))
    }

    /// Distinct item ids seen in the last `days_back` days.
    pub fn get_recent_item_ids(&self, days_back: u32) -> StorageResult<Vec<String>> {
        self.get_recent_item_ids_since(window_start(Utc::now(), days_back))
    }

    pub fn get_recent_item_ids_since(&self, cutoff: DateTime<Utc>) -> StorageResult<Vec<String>> {
        self.snapshots.recent_item_ids_since(cutoff)
    }
}

/// Group rows by `(patron_name, transitioned_at)`, keeping first-seen order.
fn group_missing(rows: impl Iterator<Item = ItemTransition>) -> Vec<MissingItemsEvent> {
    let mut events: Vec<MissingItemsEvent> = Vec::new();
    let mut positions: HashMap<(String, DateTime<Utc>), usize> = HashMap::new();

    for row in rows {
        let key = (row.patron_name.clone(), row.transitioned_at);
        let pos = *positions.entry(key).or_insert_with(|| {
            events.push(MissingItemsEvent {
                timestamp: row.transitioned_at,
                patron_name: row.patron_name.clone(),
                missing_items: Vec::new(),
                total_missing: 0,
            });
            events.len() - 1
        });

        let event = &mut events[pos];
        event.missing_items.push(MissingItem {
            title: row.title,
            item_id: row.item_id,
            from_state: row.from_state,
            notes: row.notes,
        });
        event.total_missing = event.missing_items.len();
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(id: u64, patron: &str, day: u32, item: &str) -> ItemTransition {
        let ts = Utc.with_ymd_and_hms(2024, 12, day, 8, 0, 0).unwrap();
        ItemTransition {
            id,
            item_id: item.into(),
            patron_name: patron.into(),
            title: format!("Title {}", item),
            from_state: Some(ItemState::HoldReady),
            to_state: None,
            transition_kind: TransitionKind::Disappeared,
            is_expected: false,
            notes: "Hold disappeared while ready for pickup".into(),
            transitioned_at: ts,
            created_at: ts,
        }
    }

    #[test]
    fn test_same_patron_and_time_form_one_event() {
        let events = group_missing(vec![row(1, "Alice", 2, "a"), row(2, "Alice", 2, "b")].into_iter());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].total_missing, 2);
        assert_eq!(events[0].missing_items[0].item_id, "a");
        assert_eq!(events[0].missing_items[1].item_id, "b");
    }

    #[test]
    fn test_different_patron_or_time_split_events() {
        let events = group_missing(
            vec![row(3, "Bob", 3, "c"), row(1, "Alice", 2, "a"), row(2, "Bob", 2, "b")].into_iter(),
        );
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].patron_name, "Bob");
        assert_eq!(events[1].patron_name, "Alice");
        assert!(events.iter().all(|e| e.total_missing == 1));
    }

    #[test]
    fn test_event_json_shape() {
        let events = group_missing(vec![row(1, "Alice", 2, "a")].into_iter());
        let value = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(value["patron_name"], "Alice");
        assert_eq!(value["total_missing"], 1);
        assert_eq!(value["missing_items"][0]["from_state"], "hold_ready");
        assert!(value["timestamp"].as_str().unwrap().starts_with("2024-12-02T08:00:00"));
    }

    #[test]
    fn test_window_start() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(window_start(now, 30), Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_window_start_saturates() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(window_start(now, u32::MAX), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_unbounded_window_reports_all_history() {
        let dir = tempfile::TempDir::new().unwrap();
        let snapshots = SnapshotStore::open(dir.path()).unwrap();
        let transitions = TransitionStore::open(dir.path()).unwrap();
        let reports = ReportQueries::new(&snapshots, &transitions);

        assert!(reports.get_unexpected_transitions(u32::MAX).unwrap().is_empty());
        assert!(reports.get_missing_items_report(u32::MAX).unwrap().is_empty());
        assert!(reports.get_recent_item_ids(u32::MAX).unwrap().is_empty());
    }
}
