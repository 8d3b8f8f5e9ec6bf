//! Append-only transition store
//!
//! One `TransitionBatch` frame per detection run that found changes. Besides
//! the item, patron and time indexes, a partial index holds only unexpected
//! rows so alerting queries scan the window, not the history.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::record::{ItemTransition, PendingTransition, TransitionBatchFrame};
use crate::index::{IndexTree, RowId};
use crate::retention::PruneCount;
use crate::storage::{Frame, FrameKind, FrameReader, FrameWriter, StorageError, StorageResult};

/// File name of the transition table inside the data directory
pub const TRANSITIONS_FILE: &str = "item_transitions.dat";

#[derive(Debug)]
struct TransitionTable {
    rows: BTreeMap<RowId, ItemTransition>,
    next_id: RowId,
    by_item: IndexTree<String>,
    by_patron: IndexTree<String>,
    by_time: IndexTree<DateTime<Utc>>,
    /// Partial index: only rows with `is_expected == false`
    unexpected: IndexTree<DateTime<Utc>>,
}

impl TransitionTable {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
            by_item: IndexTree::new(),
            by_patron: IndexTree::new(),
            by_time: IndexTree::new(),
            unexpected: IndexTree::new(),
        }
    }

    fn apply(&mut self, frame: TransitionBatchFrame) {
        for row in frame.rows {
            self.by_item.insert(row.item_id.clone(), row.id);
            self.by_patron.insert(row.patron_name.clone(), row.id);
            self.by_time.insert(row.transitioned_at, row.id);
            if !row.is_expected {
                self.unexpected.insert(row.transitioned_at, row.id);
            }
            self.next_id = self.next_id.max(row.id + 1);
            self.rows.insert(row.id, row);
        }
    }

    fn collect(&self, ids: &[RowId]) -> Vec<ItemTransition> {
        ids.iter().filter_map(|id| self.rows.get(id)).cloned().collect()
    }

    /// Rows of `index` newer than `cutoff`: newest timestamp first, row id
    /// ascending within one timestamp.
    fn window(&self, index: &IndexTree<DateTime<Utc>>, cutoff: DateTime<Utc>) -> Vec<ItemTransition> {
        index
            .after_desc(&cutoff)
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.rows.get(id))
            .cloned()
            .collect()
    }
}

/// Transition store over `<data_dir>/item_transitions.dat`.
pub struct TransitionStore {
    writer: Mutex<FrameWriter>,
    table: RwLock<TransitionTable>,
}

impl TransitionStore {
    /// Opens or creates the store, verifying every frame and rebuilding indexes.
    pub fn open(data_dir: &Path) -> StorageResult<Self> {
        let path = data_dir.join(TRANSITIONS_FILE);
        let writer = FrameWriter::open(&path)?;
        let table = Self::load_table(&path)?;

        Ok(Self {
            writer: Mutex::new(writer),
            table: RwLock::new(table),
        })
    }

    fn load_table(path: &Path) -> StorageResult<TransitionTable> {
        let mut reader = FrameReader::open(path)?;
        let mut table = TransitionTable::new();

        loop {
            let offset = reader.current_offset();
            match reader.read_next()? {
                Some(frame) => table.apply(decode_batch(&frame, offset)?),
                None => break,
            }
        }

        Ok(table)
    }

    fn read_table(&self) -> StorageResult<RwLockReadGuard<'_, TransitionTable>> {
        self.table
            .read()
            .map_err(|_| StorageError::lock_poisoned("item_transitions"))
    }

    fn write_table(&self) -> StorageResult<RwLockWriteGuard<'_, TransitionTable>> {
        self.table
            .write()
            .map_err(|_| StorageError::lock_poisoned("item_transitions"))
    }

    /// Persist one detection run's transitions as a single batch.
    ///
    /// An empty run writes nothing.
    pub fn append(
        &self,
        patron_name: &str,
        transitioned_at: DateTime<Utc>,
        pending: Vec<PendingTransition>,
    ) -> StorageResult<Vec<ItemTransition>> {
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::lock_poisoned("item_transitions writer"))?;

        let first_id = self.read_table()?.next_id;
        let created_at = Utc::now();

        let rows: Vec<ItemTransition> = pending
            .into_iter()
            .enumerate()
            .map(|(n, p)| ItemTransition::from_pending(first_id + n as RowId, p, transitioned_at, created_at))
            .collect();

        let body = TransitionBatchFrame {
            patron_name: patron_name.to_string(),
            transitioned_at,
            rows: rows.clone(),
        };
        let frame = Frame::encode(FrameKind::TransitionBatch, &body).map_err(|e| {
            StorageError::write_failed_no_source(format!("Failed to encode transition batch: {}", e))
        })?;

        writer.append(&frame)?;
        self.write_table()?.apply(body);

        Ok(rows)
    }

    /// Unexpected transitions strictly after `cutoff`, newest first.
    pub fn unexpected_since(&self, cutoff: DateTime<Utc>) -> StorageResult<Vec<ItemTransition>> {
        let table = self.read_table()?;
        Ok(table.window(&table.unexpected, cutoff))
    }

    /// All transitions strictly after `cutoff`, newest first.
    pub fn since(&self, cutoff: DateTime<Utc>) -> StorageResult<Vec<ItemTransition>> {
        let table = self.read_table()?;
        Ok(table.window(&table.by_time, cutoff))
    }

    /// Every transition of `item_id`, oldest first.
    pub fn for_item(&self, item_id: &str) -> StorageResult<Vec<ItemTransition>> {
        let table = self.read_table()?;
        Ok(table.collect(table.by_item.lookup(&item_id.to_string())))
    }

    /// Every transition of `patron_name`, oldest first.
    pub fn for_patron(&self, patron_name: &str) -> StorageResult<Vec<ItemTransition>> {
        let table = self.read_table()?;
        Ok(table.collect(table.by_patron.lookup(&patron_name.to_string())))
    }

    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.read_table()?.rows.len())
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// fsync the store file.
    pub fn sync(&self) -> StorageResult<()> {
        self.writer
            .lock()
            .map_err(|_| StorageError::lock_poisoned("item_transitions writer"))?
            .sync()
    }

    #[cfg(test)]
    pub(crate) fn set_fail_appends(&self, fail: bool) {
        if let Ok(mut writer) = self.writer.lock() {
            writer.set_fail_appends(fail);
        }
    }

    /// Drop transitions recorded before `cutoff`. Rewrites the file atomically.
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> StorageResult<PruneCount> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::lock_poisoned("item_transitions writer"))?;
        let mut table = self.write_table()?;

        let removed_rows = table
            .rows
            .values()
            .filter(|row| row.transitioned_at < cutoff)
            .count();
        if removed_rows == 0 {
            return Ok(PruneCount::default());
        }

        let mut batches: BTreeMap<(DateTime<Utc>, String), Vec<ItemTransition>> = BTreeMap::new();
        let mut removed_batches: BTreeSet<(DateTime<Utc>, String)> = BTreeSet::new();
        for row in table.rows.values() {
            let key = (row.transitioned_at, row.patron_name.clone());
            if row.transitioned_at < cutoff {
                removed_batches.insert(key);
            } else {
                batches.entry(key).or_default().push(row.clone());
            }
        }

        let kept: Vec<TransitionBatchFrame> = batches
            .into_iter()
            .map(|((transitioned_at, patron_name), rows)| TransitionBatchFrame {
                patron_name,
                transitioned_at,
                rows,
            })
            .collect();

        let frames = kept
            .iter()
            .map(|body| Frame::encode(FrameKind::TransitionBatch, body))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                StorageError::write_failed_no_source(format!("Failed to encode transition batch: {}", e))
            })?;
        writer.replace_all(&frames)?;

        let mut rebuilt = TransitionTable::new();
        rebuilt.next_id = table.next_id;
        for body in kept {
            rebuilt.apply(body);
        }
        *table = rebuilt;

        Ok(PruneCount {
            batches: removed_batches.len(),
            rows: removed_rows,
        })
    }
}

fn decode_batch(frame: &Frame, offset: u64) -> StorageResult<TransitionBatchFrame> {
    if frame.kind != FrameKind::TransitionBatch {
        return Err(StorageError::corruption_at_offset(
            offset,
            format!("Unexpected frame kind in transition store: {:?}", frame.kind),
        ));
    }
    frame
        .decode()
        .map_err(|e| StorageError::corruption_at_offset(offset, format!("Invalid transition batch: {}", e)))
}
