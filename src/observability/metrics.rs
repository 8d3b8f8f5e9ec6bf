//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - Reset only on process start

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one tracker.
///
/// All counters use Relaxed atomics; readers see eventually consistent values.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Cycles observed, baseline cycles included
    cycles_observed: AtomicU64,
    /// Cycles that only established a baseline
    baseline_cycles: AtomicU64,
    /// Snapshot rows written
    snapshots_recorded: AtomicU64,
    /// Items dropped because they belonged to another patron
    items_skipped: AtomicU64,
    /// Transition rows written
    transitions_recorded: AtomicU64,
    /// Transition rows with `is_expected == false`
    unexpected_transitions: AtomicU64,
    /// Cycles that failed with a storage error
    storage_failures: AtomicU64,
    /// Rows removed by retention
    rows_pruned: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_cycles(&self) {
        self.cycles_observed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_baseline_cycles(&self) {
        self.baseline_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_snapshots(&self, rows: u64) {
        self.snapshots_recorded.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn add_items_skipped(&self, items: u64) {
        self.items_skipped.fetch_add(items, Ordering::Relaxed);
    }

    pub fn add_transitions(&self, rows: u64, unexpected: u64) {
        self.transitions_recorded.fetch_add(rows, Ordering::Relaxed);
        self.unexpected_transitions
            .fetch_add(unexpected, Ordering::Relaxed);
    }

    pub fn increment_storage_failures(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rows_pruned(&self, rows: u64) {
        self.rows_pruned.fetch_add(rows, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_observed: self.cycles_observed.load(Ordering::Relaxed),
            baseline_cycles: self.baseline_cycles.load(Ordering::Relaxed),
            snapshots_recorded: self.snapshots_recorded.load(Ordering::Relaxed),
            items_skipped: self.items_skipped.load(Ordering::Relaxed),
            transitions_recorded: self.transitions_recorded.load(Ordering::Relaxed),
            unexpected_transitions: self.unexpected_transitions.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            rows_pruned: self.rows_pruned.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub cycles_observed: u64,
    pub baseline_cycles: u64,
    pub snapshots_recorded: u64,
    pub items_skipped: u64,
    pub transitions_recorded: u64,
    pub unexpected_transitions: u64,
    pub storage_failures: u64,
    pub rows_pruned: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.cycles_observed, 0);
        assert_eq!(snapshot.transitions_recorded, 0);
        assert_eq!(snapshot.unexpected_transitions, 0);
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();
        registry.increment_cycles();
        registry.increment_cycles();
        registry.increment_baseline_cycles();
        registry.add_snapshots(5);
        registry.add_items_skipped(1);
        registry.add_transitions(3, 1);
        registry.increment_storage_failures();
        registry.add_rows_pruned(7);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.cycles_observed, 2);
        assert_eq!(snapshot.baseline_cycles, 1);
        assert_eq!(snapshot.snapshots_recorded, 5);
        assert_eq!(snapshot.items_skipped, 1);
        assert_eq!(snapshot.transitions_recorded, 3);
        assert_eq!(snapshot.unexpected_transitions, 1);
        assert_eq!(snapshot.storage_failures, 1);
        assert_eq!(snapshot.rows_pruned, 7);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let registry = MetricsRegistry::new();
        registry.add_transitions(2, 2);
        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json["transitions_recorded"], 2);
        assert_eq!(json["unexpected_transitions"], 2);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let reg = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    reg.increment_cycles();
                    reg.add_snapshots(2);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.cycles_observed, 800);
        assert_eq!(snapshot.snapshots_recorded, 1600);
    }
}
