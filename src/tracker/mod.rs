//! Tracker: the handle the scheduler and the CLI hold
//!
//! Owns both stores for one data directory. A cycle for one patron runs
//! under that patron's lock, so cycles for the same patron never interleave
//! while different patrons proceed in parallel. Only the file appends
//! themselves are serialized, inside each store.

mod errors;

pub use errors::{TrackerError, TrackerResult};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::item::ObservedItem;
use crate::observability::{
    log_event_with_fields, Event, Logger, MetricsRegistry, MetricsSnapshot, ObservationScope,
};
use crate::report::ReportQueries;
use crate::retention::{RetentionOutcome, RetentionPolicy, KEEP_LATEST_CYCLES};
use crate::snapshot::SnapshotStore;
use crate::storage::{StorageError, StorageResult};
use crate::transition::{record_transitions, ItemTransition, TransitionStore};

/// What one `observe_cycle` call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleOutcome {
    pub patron_name: String,
    pub scraped_at: DateTime<Utc>,
    pub snapshots_recorded: usize,
    /// Items in the input that belonged to another patron
    pub items_skipped: usize,
    /// True when no earlier cycle existed to compare against
    pub baseline_only: bool,
    pub expected: usize,
    pub unexpected: usize,
    pub transitions: Vec<ItemTransition>,
}

pub struct Tracker {
    data_dir: PathBuf,
    snapshots: SnapshotStore,
    transitions: TransitionStore,
    patron_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    metrics: MetricsRegistry,
}

impl Tracker {
    /// Open the data directory named by `config`.
    pub fn open(config: &Config) -> TrackerResult<Self> {
        Self::open_dir(config.data_path())
    }

    /// Open or create both stores under `data_dir`, verifying every frame.
    pub fn open_dir(data_dir: &Path) -> TrackerResult<Self> {
        let dir = data_dir.to_string_lossy();
        match Self::open_stores(data_dir) {
            Ok((snapshots, transitions)) => {
                let snapshot_rows = snapshots.len()?.to_string();
                let transition_rows = transitions.len()?.to_string();
                log_event_with_fields(
                    Event::StoreOpened,
                    &[
                        ("data_dir", &*dir),
                        ("snapshots", snapshot_rows.as_str()),
                        ("transitions", transition_rows.as_str()),
                    ],
                );

                Ok(Self {
                    data_dir: data_dir.to_path_buf(),
                    snapshots,
                    transitions,
                    patron_locks: Mutex::new(HashMap::new()),
                    metrics: MetricsRegistry::new(),
                })
            }
            Err(e) => {
                if e.is_fatal() {
                    log_event_with_fields(
                        Event::DataCorruption,
                        &[("data_dir", &*dir), ("error", e.to_string().as_str())],
                    );
                }
                Err(e.into())
            }
        }
    }

    fn open_stores(data_dir: &Path) -> StorageResult<(SnapshotStore, TransitionStore)> {
        fs::create_dir_all(data_dir).map_err(|e| {
            StorageError::io_error(format!("Failed to create data dir {:?}", data_dir), e)
        })?;
        Ok((SnapshotStore::open(data_dir)?, TransitionStore::open(data_dir)?))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn transitions(&self) -> &TransitionStore {
        &self.transitions
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reports(&self) -> ReportQueries<'_> {
        ReportQueries::new(&self.snapshots, &self.transitions)
    }

    fn patron_lock(&self, patron_name: &str) -> TrackerResult<Arc<Mutex<()>>> {
        let mut locks = self
            .patron_locks
            .lock()
            .map_err(|_| TrackerError::LockPoisoned(patron_name.to_string()))?;
        Ok(Arc::clone(
            locks
                .entry(patron_name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        ))
    }

    /// Record one scrape cycle for `patron_name` and detect what changed
    /// since their previous cycle.
    ///
    /// Items of other patrons are ignored. An empty `items` is a valid cycle:
    /// everything the patron had before is reported as disappeared.
    pub fn observe_cycle(
        &self,
        patron_name: &str,
        items: &[ObservedItem],
        scraped_at: DateTime<Utc>,
    ) -> TrackerResult<CycleOutcome> {
        if patron_name.trim().is_empty() {
            return Err(TrackerError::InvalidPatron(patron_name.to_string()));
        }

        let lock = self.patron_lock(patron_name)?;
        let _guard = lock
            .lock()
            .map_err(|_| TrackerError::LockPoisoned(patron_name.to_string()))?;

        let scope = ObservationScope::with_fields("CYCLE", &[("patron", patron_name)]);

        let items_skipped = items
            .iter()
            .filter(|item| item.patron_name() != patron_name)
            .count();
        if items_skipped > 0 {
            Logger::trace(
                Event::PatronItemsSkipped.as_str(),
                &[("patron", patron_name), ("skipped", items_skipped.to_string().as_str())],
            );
        }

        match self.run_cycle(patron_name, items, scraped_at, items_skipped) {
            Ok(outcome) => {
                self.metrics.increment_cycles();
                self.metrics.add_snapshots(outcome.snapshots_recorded as u64);
                self.metrics.add_items_skipped(items_skipped as u64);
                if outcome.baseline_only {
                    self.metrics.increment_baseline_cycles();
                }
                self.metrics
                    .add_transitions(outcome.transitions.len() as u64, outcome.unexpected as u64);

                scope.complete_with_fields(&[
                    ("snapshots", outcome.snapshots_recorded.to_string().as_str()),
                    ("transitions", outcome.transitions.len().to_string().as_str()),
                    ("unexpected", outcome.unexpected.to_string().as_str()),
                ]);
                Ok(outcome)
            }
            Err(e) => {
                self.metrics.increment_storage_failures();
                scope.fail(e.code().code(), e.message(), e.is_fatal());
                Err(e.into())
            }
        }
    }

    /// Transitions are appended before the snapshot. A cycle that fails on
    /// its transitions leaves no trace, so the next cycle is compared against
    /// the same baseline and nothing is lost. A cycle that fails on its
    /// snapshot keeps its transitions; retrying it reports them again.
    fn run_cycle(
        &self,
        patron_name: &str,
        items: &[ObservedItem],
        scraped_at: DateTime<Utc>,
        items_skipped: usize,
    ) -> StorageResult<CycleOutcome> {
        let previous = self.snapshots.cycle_before(patron_name, scraped_at)?;
        let baseline_only = previous.is_none();

        let transitions = match previous {
            Some(previous) => record_transitions(
                &self.transitions,
                &previous,
                items,
                patron_name,
                scraped_at,
            )?,
            None => {
                log_event_with_fields(Event::BaselineOnly, &[("patron", patron_name)]);
                Vec::new()
            }
        };

        let unexpected = transitions.iter().filter(|t| !t.is_expected).count();
        if !transitions.is_empty() {
            log_event_with_fields(
                Event::TransitionRecorded,
                &[
                    ("patron", patron_name),
                    ("rows", transitions.len().to_string().as_str()),
                    ("unexpected", unexpected.to_string().as_str()),
                ],
            );
        }

        let rows = self
            .snapshots
            .record_snapshot(items, patron_name, scraped_at)?;
        log_event_with_fields(
            Event::SnapshotRecorded,
            &[("patron", patron_name), ("rows", rows.len().to_string().as_str())],
        );

        Ok(CycleOutcome {
            patron_name: patron_name.to_string(),
            scraped_at,
            snapshots_recorded: rows.len(),
            items_skipped,
            baseline_only,
            expected: transitions.len() - unexpected,
            unexpected,
            transitions,
        })
    }

    /// Prune history according to `policy`. `KeepAll` touches nothing.
    ///
    /// Each patron keeps at least its two latest snapshot cycles so that the
    /// next detection still has a baseline.
    pub fn apply_retention(
        &self,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> TrackerResult<RetentionOutcome> {
        let cutoff = match policy.cutoff(now) {
            Some(cutoff) => cutoff,
            None => return Ok(RetentionOutcome::default()),
        };

        let scope = ObservationScope::with_fields("RETENTION", &[("cutoff", cutoff.to_rfc3339().as_str())]);

        let pruned = self
            .snapshots
            .prune_cycles_before(cutoff, KEEP_LATEST_CYCLES)
            .and_then(|snapshots| {
                self.transitions
                    .prune_before(cutoff)
                    .map(|transitions| (snapshots, transitions))
            });

        let (snapshots, transitions) = match pruned {
            Ok(counts) => counts,
            Err(e) => {
                self.metrics.increment_storage_failures();
                scope.fail(e.code().code(), e.message(), e.is_fatal());
                return Err(e.into());
            }
        };

        self.metrics
            .add_rows_pruned((snapshots.rows + transitions.rows) as u64);
        log_event_with_fields(
            Event::RetentionApplied,
            &[
                ("snapshot_rows", snapshots.rows.to_string().as_str()),
                ("transition_rows", transitions.rows.to_string().as_str()),
            ],
        );
        scope.complete();

        Ok(RetentionOutcome {
            cutoff: Some(cutoff),
            snapshots,
            transitions,
        })
    }

    /// fsync both files and release the handle.
    pub fn close(self) -> TrackerResult<()> {
        self.snapshots.sync()?;
        self.transitions.sync()?;

        let dir = self.data_dir.to_string_lossy();
        log_event_with_fields(Event::StoreClosed, &[("data_dir", &*dir)]);
        Ok(())
    }
}
