//! Append-only snapshot store
//!
//! One `SnapshotCycle` frame per patron per scrape cycle. The in-memory table
//! is only updated after the frame is fsynced, under the table write lock, so
//! readers see a cycle's rows all at once or not at all.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::row::{ItemSnapshot, SnapshotCycleFrame};
use crate::index::{IndexTree, RowId};
use crate::item::ObservedItem;
use crate::retention::PruneCount;
use crate::storage::{Frame, FrameKind, FrameReader, FrameWriter, StorageError, StorageResult};

/// File name of the snapshot table inside the data directory
pub const SNAPSHOTS_FILE: &str = "item_snapshots.dat";

#[derive(Debug)]
struct SnapshotTable {
    rows: BTreeMap<RowId, ItemSnapshot>,
    next_id: RowId,
    by_item: IndexTree<String>,
    by_scraped_at: IndexTree<DateTime<Utc>>,
    /// patron -> scraped_at -> row ids. A cycle with no rows is still a key.
    cycles: BTreeMap<String, BTreeMap<DateTime<Utc>, Vec<RowId>>>,
}

impl SnapshotTable {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
            by_item: IndexTree::new(),
            by_scraped_at: IndexTree::new(),
            cycles: BTreeMap::new(),
        }
    }

    fn apply(&mut self, frame: SnapshotCycleFrame) {
        let cycle = self
            .cycles
            .entry(frame.patron_name)
            .or_default()
            .entry(frame.scraped_at)
            .or_default();

        for row in frame.rows {
            cycle.push(row.id);
            self.by_item.insert(row.item_id.clone(), row.id);
            self.by_scraped_at.insert(row.scraped_at, row.id);
            self.next_id = self.next_id.max(row.id + 1);
            self.rows.insert(row.id, row);
        }

        cycle.sort_unstable();
        cycle.dedup();
    }

    fn collect(&self, ids: &[RowId]) -> Vec<ItemSnapshot> {
        ids.iter().filter_map(|id| self.rows.get(id)).cloned().collect()
    }

    /// Rebuild the frames that describe this table, oldest cycle first.
    fn frames_where<F>(&self, mut keep: F) -> Vec<SnapshotCycleFrame>
    where
        F: FnMut(&str, usize, &DateTime<Utc>) -> bool,
    {
        let mut frames = Vec::new();
        for (patron, cycles) in &self.cycles {
            for (rank, (scraped_at, ids)) in cycles.iter().rev().enumerate() {
                if keep(patron, rank, scraped_at) {
                    frames.push(SnapshotCycleFrame {
                        patron_name: patron.clone(),
                        scraped_at: *scraped_at,
                        rows: self.collect(ids),
                    });
                }
            }
        }
        frames.sort_by(|a, b| {
            a.scraped_at
                .cmp(&b.scraped_at)
                .then_with(|| a.patron_name.cmp(&b.patron_name))
        });
        frames
    }
}

/// Snapshot store over `<data_dir>/item_snapshots.dat`.
pub struct SnapshotStore {
    writer: Mutex<FrameWriter>,
    table: RwLock<SnapshotTable>,
}

impl SnapshotStore {
    /// Opens or creates the store, verifying every frame and rebuilding indexes.
    pub fn open(data_dir: &Path) -> StorageResult<Self> {
        let path = data_dir.join(SNAPSHOTS_FILE);
        let writer = FrameWriter::open(&path)?;
        let table = Self::load_table(&path)?;

        Ok(Self {
            writer: Mutex::new(writer),
            table: RwLock::new(table),
        })
    }

    fn load_table(path: &Path) -> StorageResult<SnapshotTable> {
        let mut reader = FrameReader::open(path)?;
        let mut table = SnapshotTable::new();

        loop {
            let offset = reader.current_offset();
            match reader.read_next()? {
                Some(frame) => table.apply(decode_cycle(&frame, offset)?),
                None => break,
            }
        }

        Ok(table)
    }

    fn read_table(&self) -> StorageResult<RwLockReadGuard<'_, SnapshotTable>> {
        self.table
            .read()
            .map_err(|_| StorageError::lock_poisoned("item_snapshots"))
    }

    fn write_table(&self) -> StorageResult<RwLockWriteGuard<'_, SnapshotTable>> {
        self.table
            .write()
            .map_err(|_| StorageError::lock_poisoned("item_snapshots"))
    }

    /// Append one row per item of `patron_name`, all sharing `scraped_at`.
    ///
    /// Items belonging to other patrons are ignored. An empty cycle is still
    /// recorded so it can serve as the next cycle's baseline. Returns the
    /// rows written.
    pub fn record_snapshot(
        &self,
        items: &[ObservedItem],
        patron_name: &str,
        scraped_at: DateTime<Utc>,
    ) -> StorageResult<Vec<ItemSnapshot>> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::lock_poisoned("item_snapshots writer"))?;

        // Ids are only handed out while holding the writer lock.
        let first_id = self.read_table()?.next_id;
        let created_at = Utc::now();

        let rows: Vec<ItemSnapshot> = items
            .iter()
            .filter(|item| item.patron_name() == patron_name)
            .enumerate()
            .map(|(n, item)| ItemSnapshot::from_item(first_id + n as RowId, item, scraped_at, created_at))
            .collect();

        let body = SnapshotCycleFrame {
            patron_name: patron_name.to_string(),
            scraped_at,
            rows: rows.clone(),
        };
        let frame = Frame::encode(FrameKind::SnapshotCycle, &body).map_err(|e| {
            StorageError::write_failed_no_source(format!("Failed to encode snapshot cycle: {}", e))
        })?;

        writer.append(&frame)?;
        self.write_table()?.apply(body);

        Ok(rows)
    }

    /// Rows of the second-most-recent distinct cycle for `patron_name`.
    ///
    /// Called right after the current cycle is written, this is the cycle
    /// before it. Fewer than two cycles on record returns empty. Rows come
    /// back in row id order.
    pub fn get_previous_snapshots(&self, patron_name: &str) -> StorageResult<Vec<ItemSnapshot>> {
        let table = self.read_table()?;
        let previous = table
            .cycles
            .get(patron_name)
            .and_then(|cycles| cycles.values().rev().nth(1));

        Ok(previous.map(|ids| table.collect(ids)).unwrap_or_default())
    }

    /// Rows of the latest cycle for `patron_name` scraped strictly before
    /// `before`, or `None` when there is no such cycle.
    ///
    /// Called before a cycle is written, this is the baseline it will be
    /// compared against.
    pub fn cycle_before(
        &self,
        patron_name: &str,
        before: DateTime<Utc>,
    ) -> StorageResult<Option<Vec<ItemSnapshot>>> {
        let table = self.read_table()?;
        Ok(table
            .cycles
            .get(patron_name)
            .and_then(|cycles| cycles.range(..before).next_back())
            .map(|(_, ids)| table.collect(ids)))
    }

    /// Timestamp of the most recent cycle for `patron_name`.
    pub fn latest_cycle(&self, patron_name: &str) -> StorageResult<Option<DateTime<Utc>>> {
        let table = self.read_table()?;
        Ok(table
            .cycles
            .get(patron_name)
            .and_then(|cycles| cycles.keys().next_back().copied()))
    }

    /// Number of distinct cycles recorded for `patron_name`.
    pub fn cycle_count(&self, patron_name: &str) -> StorageResult<usize> {
        let table = self.read_table()?;
        Ok(table.cycles.get(patron_name).map_or(0, BTreeMap::len))
    }

    /// Every recorded observation of `item_id`, oldest first.
    pub fn history(&self, item_id: &str) -> StorageResult<Vec<ItemSnapshot>> {
        let table = self.read_table()?;
        Ok(table.collect(table.by_item.lookup(&item_id.to_string())))
    }

    /// Distinct item ids observed strictly after `cutoff`, ascending.
    pub fn recent_item_ids_since(&self, cutoff: DateTime<Utc>) -> StorageResult<Vec<String>> {
        let table = self.read_table()?;
        let ids: BTreeSet<String> = table
            .by_scraped_at
            .after_desc(&cutoff)
            .flat_map(|(_, rows)| rows.iter())
            .filter_map(|id| table.rows.get(id))
            .map(|row| row.item_id.clone())
            .collect();
        Ok(ids.into_iter().collect())
    }

    /// Total number of snapshot rows.
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
            .map_err(|_| StorageError::lock_poisoned("item_snapshots writer"))?
            .sync()
    }

    #[cfg(test)]
    pub(crate) fn set_fail_appends(&self, fail: bool) {
        if let Ok(mut writer) = self.writer.lock() {
            writer.set_fail_appends(fail);
        }
    }

    /// Drop cycles scraped before `cutoff`, always keeping each patron's
    /// `keep_latest` most recent cycles. Rewrites the file atomically.
    pub fn prune_cycles_before(
        &self,
        cutoff: DateTime<Utc>,
        keep_latest: usize,
    ) -> StorageResult<PruneCount> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::lock_poisoned("item_snapshots writer"))?;
        let mut table = self.write_table()?;

        let mut removed = PruneCount::default();
        let kept = table.frames_where(|_, rank, scraped_at| {
            let keep = rank < keep_latest || *scraped_at >= cutoff;
            if !keep {
                removed.batches += 1;
            }
            keep
        });
        if removed.batches == 0 {
            return Ok(removed);
        }

        let frames = kept
            .iter()
            .map(|body| Frame::encode(FrameKind::SnapshotCycle, body))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                StorageError::write_failed_no_source(format!("Failed to encode snapshot cycle: {}", e))
            })?;
        writer.replace_all(&frames)?;

        let before = table.rows.len();
        let mut rebuilt = SnapshotTable::new();
        rebuilt.next_id = table.next_id;
        for body in kept {
            rebuilt.apply(body);
        }
        removed.rows = before - rebuilt.rows.len();
        *table = rebuilt;

        Ok(removed)
    }
}

fn decode_cycle(frame: &Frame, offset: u64) -> StorageResult<SnapshotCycleFrame> {
    if frame.kind != FrameKind::SnapshotCycle {
        return Err(StorageError::corruption_at_offset(
            offset,
            format!("Unexpected frame kind in snapshot store: {:?}", frame.kind),
        ));
    }
    frame
        .decode()
        .map_err(|e| StorageError::corruption_at_offset(offset, format!("Invalid snapshot cycle: {}", e)))
}
