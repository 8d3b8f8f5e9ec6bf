//! Transition detection
//!
//! Compares a patron's current items with the rows of their previous cycle,
//! keyed by `item_id`. When several rows share an `item_id` within one side,
//! the first one is used: the lowest row id on the previous side and the
//! earliest entry in the current list. Both sides resolve the same way, so a
//! repeated id in the current list cannot override what was listed first.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::classifier::{
    classify_appearance, classify_disappearance_traced, classify_state_change, DisappearanceContext,
};
use super::record::{ItemTransition, PendingTransition, TransitionKind};
use super::store::TransitionStore;
use crate::item::{parse_due_date, ItemKind, ObservedItem};
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::snapshot::{ItemSnapshot, SnapshotStore};
use crate::storage::StorageResult;

/// Diff two adjacent cycles of one patron and classify every change.
///
/// Output order: disappearances and state changes in previous-row order,
/// then appearances in current-item order. Unchanged items produce nothing.
/// Items belonging to other patrons are ignored.
pub fn diff_cycles(
    previous: &[ItemSnapshot],
    current: &[ObservedItem],
    patron_name: &str,
    observed_at: DateTime<Utc>,
) -> Vec<PendingTransition> {
    let today = observed_at.date_naive();

    let mut previous_by_id: HashMap<&str, &ItemSnapshot> = HashMap::new();
    let mut previous_order: Vec<&ItemSnapshot> = Vec::new();
    let mut sorted: Vec<&ItemSnapshot> = previous.iter().collect();
    sorted.sort_by_key(|row| row.id);
    for row in sorted {
        if !previous_by_id.contains_key(row.item_id.as_str()) {
            previous_by_id.insert(row.item_id.as_str(), row);
            previous_order.push(row);
        }
    }

    let mut current_by_id: HashMap<&str, &ObservedItem> = HashMap::new();
    let mut current_order: Vec<&ObservedItem> = Vec::new();
    for item in current.iter().filter(|item| item.patron_name() == patron_name) {
        if !current_by_id.contains_key(item.item_id()) {
            current_by_id.insert(item.item_id(), item);
            current_order.push(item);
        }
    }

    let mut transitions = Vec::new();

    for prev in previous_order {
        match current_by_id.get(prev.item_id.as_str()) {
            None => {
                let ctx = DisappearanceContext::from_snapshot(prev, today);
                if prev.item_kind == ItemKind::Checkout {
                    if let Some(raw) = prev.due_date.as_deref() {
                        if parse_due_date(raw).is_none() {
                            Logger::warn(
                                Event::DueDateUnparseable.as_str(),
                                &[("item_id", prev.item_id.as_str()), ("due_date", raw)],
                            );
                        }
                    }
                }
                let (rule, verdict) = classify_disappearance_traced(&ctx);
                Logger::trace(
                    Event::DisappearanceClassified.as_str(),
                    &[("item_id", prev.item_id.as_str()), ("rule", rule)],
                );
                transitions.push(PendingTransition {
                    item_id: prev.item_id.clone(),
                    patron_name: patron_name.to_string(),
                    title: prev.title.clone(),
                    from_state: Some(prev.state),
                    to_state: None,
                    transition_kind: TransitionKind::Disappeared,
                    verdict,
                });
            }
            Some(item) if item.state() != prev.state => {
                transitions.push(PendingTransition {
                    item_id: prev.item_id.clone(),
                    patron_name: patron_name.to_string(),
                    title: prev.title.clone(),
                    from_state: Some(prev.state),
                    to_state: Some(item.state()),
                    transition_kind: TransitionKind::StateChange,
                    verdict: classify_state_change(prev.state, item.state()),
                });
            }
            Some(_) => {}
        }
    }

    for item in current_order {
        if !previous_by_id.contains_key(item.item_id()) {
            transitions.push(PendingTransition {
                item_id: item.item_id().to_string(),
                patron_name: patron_name.to_string(),
                title: item.title().to_string(),
                from_state: None,
                to_state: Some(item.state()),
                transition_kind: TransitionKind::Appeared,
                verdict: classify_appearance(),
            });
        }
    }

    transitions
}

/// Detect and record transitions for `patron_name`'s cycle at `observed_at`.
///
/// Expects the current cycle to have been written to `snapshots` already, so
/// that the previous cycle is the second most recent. With no previous cycle
/// this records nothing: the first cycle only establishes a baseline.
pub fn detect_transitions(
    snapshots: &SnapshotStore,
    transitions: &TransitionStore,
    current_items: &[ObservedItem],
    patron_name: &str,
    observed_at: DateTime<Utc>,
) -> StorageResult<Vec<ItemTransition>> {
    // An earlier cycle with no rows is still a baseline; only a missing one is not.
    if snapshots.cycle_count(patron_name)? < 2 {
        log_event_with_fields(Event::BaselineOnly, &[("patron", patron_name)]);
        return Ok(Vec::new());
    }

    let previous = snapshots.get_previous_snapshots(patron_name)?;
    record_transitions(transitions, &previous, current_items, patron_name, observed_at)
}

/// Diff `current_items` against the baseline rows `previous` and append the
/// result as one batch.
pub fn record_transitions(
    transitions: &TransitionStore,
    previous: &[ItemSnapshot],
    current_items: &[ObservedItem],
    patron_name: &str,
    observed_at: DateTime<Utc>,
) -> StorageResult<Vec<ItemTransition>> {
    let pending = diff_cycles(previous, current_items, patron_name, observed_at);
    let recorded = transitions.append(patron_name, observed_at, pending)?;

    for transition in recorded.iter().filter(|t| !t.is_expected) {
        Logger::warn(
            Event::UnexpectedTransition.as_str(),
            &[
                ("item_id", transition.item_id.as_str()),
                ("kind", transition.transition_kind.as_str()),
                ("notes", transition.notes.as_str()),
                ("patron", patron_name),
                ("title", transition.title.as_str()),
            ],
        );
    }

    Ok(recorded)
}
