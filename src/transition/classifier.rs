//! Transition classification
//!
//! Pure functions from a detected change to a [`Verdict`]. Disappearances run
//! through [`DISAPPEARANCE_RULES`] in order; the first rule returning a verdict
//! wins and [`default_disappearance`] applies when none does. State changes
//! are looked up in [`EXPECTED_PROGRESSIONS`].

use chrono::NaiveDate;

use super::record::Verdict;
use crate::item::{parse_due_date, ItemKind, ItemState};
use crate::snapshot::ItemSnapshot;

/// Format markers identifying digital media. Case-sensitive.
pub const DIGITAL_FORMAT_MARKERS: &[&str] = &["eBook", "eAudiobook", "Digital"];

/// Days before the due date within which a return counts as normal.
pub const NEAR_DUE_DAYS: i64 = 3;

/// Everything the disappearance rules may look at.
#[derive(Debug, Clone, Copy)]
pub struct DisappearanceContext<'a> {
    pub item_kind: ItemKind,
    pub prior_state: ItemState,
    pub format: Option<&'a str>,
    pub due_date: Option<&'a str>,
    /// Calendar date the disappearance was observed on
    pub today: NaiveDate,
}

impl<'a> DisappearanceContext<'a> {
    pub fn from_snapshot(snapshot: &'a ItemSnapshot, today: NaiveDate) -> Self {
        Self {
            item_kind: snapshot.item_kind,
            prior_state: snapshot.state,
            format: snapshot.format.as_deref(),
            due_date: snapshot.due_date.as_deref(),
            today,
        }
    }

    fn is_digital(&self) -> bool {
        self.format
            .map(|f| DIGITAL_FORMAT_MARKERS.iter().any(|marker| f.contains(marker)))
            .unwrap_or(false)
    }
}

/// One step of the disappearance cascade.
pub struct DisappearanceRule {
    pub name: &'static str,
    pub apply: fn(&DisappearanceContext<'_>) -> Option<Verdict>,
}

/// Disappearance rules in evaluation order.
pub const DISAPPEARANCE_RULES: &[DisappearanceRule] = &[
    DisappearanceRule {
        name: "checkout_due_date",
        apply: returned_around_due_date,
    },
    DisappearanceRule {
        name: "digital_format",
        apply: digital_item,
    },
    DisappearanceRule {
        name: "hold_state",
        apply: hold_left_queue,
    },
];

/// Name reported when no rule matched
pub const DEFAULT_RULE: &str = "default";

/// Checkouts with a parseable due date.
fn returned_around_due_date(ctx: &DisappearanceContext<'_>) -> Option<Verdict> {
    if ctx.item_kind != ItemKind::Checkout {
        return None;
    }
    let due = parse_due_date(ctx.due_date?)?;
    let days_until_due = (due - ctx.today).num_days();

    if days_until_due <= NEAR_DUE_DAYS {
        Some(Verdict::expected(format!(
            "Item returned near due date ({} days until due)",
            days_until_due
        )))
    } else if days_until_due < 0 {
        // Shadowed by the branch above: overdue returns report as "near due date".
        Some(Verdict::expected(format!(
            "Item returned after due date ({} days overdue)",
            -days_until_due
        )))
    } else {
        None
    }
}

/// Digital loans end on their own; a ready digital hold vanishing does not.
fn digital_item(ctx: &DisappearanceContext<'_>) -> Option<Verdict> {
    if !ctx.is_digital() {
        return None;
    }
    if ctx.item_kind == ItemKind::Checkout {
        Some(Verdict::expected("Digital item auto-returned on due date"))
    } else if ctx.prior_state == ItemState::HoldReady {
        Some(Verdict::unexpected(
            "Digital hold disappeared while ready for checkout",
        ))
    } else {
        None
    }
}

fn hold_left_queue(ctx: &DisappearanceContext<'_>) -> Option<Verdict> {
    match ctx.prior_state {
        ItemState::HoldReady => Some(Verdict::unexpected("Hold disappeared while ready for pickup")),
        ItemState::HoldWaiting => Some(Verdict::expected("Hold cancelled or expired while waiting")),
        ItemState::HoldPaused => Some(Verdict::expected("Paused hold cancelled")),
        ItemState::HoldTransit => Some(Verdict::expected("Hold in transit cancelled")),
        ItemState::CheckedOut => None,
    }
}

/// Verdict when no rule matched.
pub fn default_disappearance() -> Verdict {
    Verdict::unexpected("Item disappeared unexpectedly")
}

/// Classify a disappearance, also returning the name of the deciding rule.
pub fn classify_disappearance_traced(ctx: &DisappearanceContext<'_>) -> (&'static str, Verdict) {
    DISAPPEARANCE_RULES
        .iter()
        .find_map(|rule| (rule.apply)(ctx).map(|verdict| (rule.name, verdict)))
        .unwrap_or_else(|| (DEFAULT_RULE, default_disappearance()))
}

/// Classify a disappearance.
pub fn classify_disappearance(ctx: &DisappearanceContext<'_>) -> Verdict {
    classify_disappearance_traced(ctx).1
}

/// Expected `from -> to` progressions. Any other pair is unexpected.
pub const EXPECTED_PROGRESSIONS: &[(ItemState, &[ItemState])] = &[
    (
        ItemState::HoldWaiting,
        &[ItemState::HoldTransit, ItemState::HoldReady, ItemState::HoldPaused],
    ),
    (ItemState::HoldTransit, &[ItemState::HoldReady]),
    (ItemState::HoldReady, &[ItemState::CheckedOut]),
    (ItemState::HoldPaused, &[ItemState::HoldWaiting]),
];

pub fn is_expected_progression(from: ItemState, to: ItemState) -> bool {
    EXPECTED_PROGRESSIONS
        .iter()
        .any(|(source, targets)| *source == from && targets.contains(&to))
}

/// Classify a change of state for an item present in both cycles.
pub fn classify_state_change(from: ItemState, to: ItemState) -> Verdict {
    if is_expected_progression(from, to) {
        Verdict::expected(format!("Normal state progression: {} → {}", from, to))
    } else {
        Verdict::unexpected(format!("Unexpected state change: {} → {}", from, to))
    }
}

/// First sightings are always expected; there is nothing to judge them against.
pub fn classify_appearance() -> Verdict {
    Verdict::expected("New item")
}
