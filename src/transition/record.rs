//! Transition record types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::index::RowId;
use crate::item::ItemState;

/// What kind of change was detected between two cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Appeared,
    Disappeared,
    StateChange,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::Appeared => "appeared",
            TransitionKind::Disappeared => "disappeared",
            TransitionKind::StateChange => "state_change",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification outcome: expected or not, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_expected: bool,
    pub notes: String,
}

impl Verdict {
    pub fn expected(notes: impl Into<String>) -> Self {
        Self {
            is_expected: true,
            notes: notes.into(),
        }
    }

    pub fn unexpected(notes: impl Into<String>) -> Self {
        Self {
            is_expected: false,
            notes: notes.into(),
        }
    }
}

/// A classified change not yet persisted. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransition {
    pub item_id: String,
    pub patron_name: String,
    pub title: String,
    pub from_state: Option<ItemState>,
    pub to_state: Option<ItemState>,
    pub transition_kind: TransitionKind,
    pub verdict: Verdict,
}

/// A persisted transition. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTransition {
    pub id: RowId,
    pub item_id: String,
    pub patron_name: String,
    pub title: String,
    pub from_state: Option<ItemState>,
    pub to_state: Option<ItemState>,
    pub transition_kind: TransitionKind,
    pub is_expected: bool,
    pub notes: String,
    pub transitioned_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ItemTransition {
    pub(crate) fn from_pending(
        id: RowId,
        pending: PendingTransition,
        transitioned_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            item_id: pending.item_id,
            patron_name: pending.patron_name,
            title: pending.title,
            from_state: pending.from_state,
            to_state: pending.to_state,
            transition_kind: pending.transition_kind,
            is_expected: pending.verdict.is_expected,
            notes: pending.verdict.notes,
            transitioned_at,
            created_at,
        }
    }
}

/// Body of a `TransitionBatch` frame: every transition of one detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TransitionBatchFrame {
    pub patron_name: String,
    pub transitioned_at: DateTime<Utc>,
    pub rows: Vec<ItemTransition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_transition_serializes_with_null_to_state() {
        let ts = Utc.with_ymd_and_hms(2024, 12, 1, 8, 0, 0).unwrap();
        let transition = ItemTransition::from_pending(
            1,
            PendingTransition {
                item_id: "abc".into(),
                patron_name: "Alice".into(),
                title: "Dune".into(),
                from_state: Some(ItemState::HoldReady),
                to_state: None,
                transition_kind: TransitionKind::Disappeared,
                verdict: Verdict::unexpected("Hold disappeared while ready for pickup"),
            },
            ts,
            ts,
        );

        let value = serde_json::to_value(&transition).unwrap();
        assert_eq!(value["transition_kind"], "disappeared");
        assert_eq!(value["from_state"], "hold_ready");
        assert!(value["to_state"].is_null());
        assert_eq!(value["is_expected"], false);
    }
}
