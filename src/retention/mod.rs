//! Retention policy for snapshot and transition history
//!
//! History is kept forever unless a policy is applied explicitly. Nothing in
//! the tracking path prunes on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::window_start;

/// Most recent cycles per patron that survive any pruning: the latest cycle
/// and the baseline before it.
pub const KEEP_LATEST_CYCLES: usize = 2;

/// How much history to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Never prune
    #[default]
    KeepAll,
    /// Drop snapshot cycles and transitions older than `days`
    MaxAge { days: u32 },
}

impl RetentionPolicy {
    /// Rows strictly older than the returned instant are eligible for removal.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            RetentionPolicy::KeepAll => None,
            RetentionPolicy::MaxAge { days } => Some(window_start(now, *days)),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            RetentionPolicy::MaxAge { days: 0 } => {
                Err("retention max_age days must be > 0".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Rows and batches removed from one store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneCount {
    pub batches: usize,
    pub rows: usize,
}

/// Result of applying a policy to both stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionOutcome {
    pub cutoff: Option<DateTime<Utc>>,
    pub snapshots: PruneCount,
    pub transitions: PruneCount,
}
