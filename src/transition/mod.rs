//! Transition detection, classification and storage
//!
//! The detector diffs a patron's current items against their previous cycle,
//! the classifier labels each change expected or unexpected with a rationale,
//! and the store persists the classified records.
//!
//! # Invariants
//!
//! - Every transition carries exactly one verdict with non-empty notes
//! - Transitions are only produced when the patron has a previous cycle
//! - Transition rows are never mutated

mod classifier;
mod detector;
mod record;
mod store;

pub use classifier::{
    classify_appearance, classify_disappearance, classify_disappearance_traced,
    classify_state_change, default_disappearance, is_expected_progression, DisappearanceContext,
    DisappearanceRule, DEFAULT_RULE, DIGITAL_FORMAT_MARKERS, DISAPPEARANCE_RULES,
    EXPECTED_PROGRESSIONS, NEAR_DUE_DAYS,
};
pub use detector::{detect_transitions, diff_cycles, record_transitions};
pub use record::{ItemTransition, PendingTransition, TransitionKind, Verdict};
pub use store::{TransitionStore, TRANSITIONS_FILE};
