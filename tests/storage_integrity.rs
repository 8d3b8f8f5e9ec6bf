//! Storage integrity tests
//!
//! - Corruption is never skipped: a bad frame fails the open
//! - A reopened store rebuilds exactly the state that was committed
//! - A cycle's rows become visible together

mod common;

use std::fs;

use common::{checkout, day, hold, just_before, open_tracker};
use shelfwatch::snapshot::SNAPSHOTS_FILE;
use shelfwatch::storage::StorageErrorCode;
use shelfwatch::transition::TRANSITIONS_FILE;
use shelfwatch::{Tracker, TrackerError};
use tempfile::TempDir;

fn populated(dir: &TempDir) {
    let tracker = Tracker::open_dir(dir.path()).unwrap();
    tracker
        .observe_cycle(
            "Alice",
            &[hold("Alice", "h1", "Ready"), checkout("Alice", "c1", "2024-12-20")],
            day(1),
        )
        .unwrap();
    tracker.observe_cycle("Alice", &[], day(2)).unwrap();
    tracker.close().unwrap();
}

fn assert_corruption(result: Result<Tracker, TrackerError>) {
    match result {
        Err(TrackerError::Storage(e)) => {
            assert_eq!(e.code(), StorageErrorCode::ShelfDataCorruption, "{}", e);
            assert!(e.is_fatal());
        }
        Err(other) => panic!("expected corruption, got {}", other),
        Ok(_) => panic!("corrupted store opened without error"),
    }
}

#[test]
fn test_flipped_byte_in_snapshots_fails_open() {
    let dir = TempDir::new().unwrap();
    populated(&dir);

    let path = dir.path().join(SNAPSHOTS_FILE);
    let mut contents = fs::read(&path).unwrap();
    let mid = contents.len() / 2;
    contents[mid] ^= 0xFF;
    fs::write(&path, contents).unwrap();

    assert_corruption(Tracker::open_dir(dir.path()));
}

#[test]
fn test_flipped_byte_in_transitions_fails_open() {
    let dir = TempDir::new().unwrap();
    populated(&dir);

    let path = dir.path().join(TRANSITIONS_FILE);
    let mut contents = fs::read(&path).unwrap();
    let last = contents.len() - 6;
    contents[last] ^= 0x01;
    fs::write(&path, contents).unwrap();

    assert_corruption(Tracker::open_dir(dir.path()));
}

#[test]
fn test_torn_tail_fails_open() {
    let dir = TempDir::new().unwrap();
    populated(&dir);

    let path = dir.path().join(SNAPSHOTS_FILE);
    let contents = fs::read(&path).unwrap();
    fs::write(&path, &contents[..contents.len() - 3]).unwrap();

    assert_corruption(Tracker::open_dir(dir.path()));
}

#[test]
fn test_reopen_rebuilds_committed_state() {
    let dir = TempDir::new().unwrap();
    populated(&dir);

    let tracker = Tracker::open_dir(dir.path()).unwrap();
    assert_eq!(tracker.snapshots().len().unwrap(), 2);
    assert_eq!(tracker.snapshots().cycle_count("Alice").unwrap(), 2);
    assert_eq!(tracker.snapshots().latest_cycle("Alice").unwrap(), Some(day(2)));

    let transitions = tracker.transitions().for_patron("Alice").unwrap();
    assert_eq!(transitions.len(), 2);
    let ids: Vec<u64> = transitions.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let unexpected = tracker
        .reports()
        .get_unexpected_transitions_since(just_before(day(1)))
        .unwrap();
    // Same cycle, so row id order: the ready hold, then the checkout that
    // vanished 18 days before its due date.
    let ids: Vec<&str> = unexpected.iter().map(|t| t.item_id.as_str()).collect();
    assert_eq!(ids, vec!["h1", "c1"]);
}

#[test]
fn test_row_ids_continue_after_reopen() {
    let dir = TempDir::new().unwrap();
    populated(&dir);

    let tracker = Tracker::open_dir(dir.path()).unwrap();
    let rows = tracker
        .snapshots()
        .record_snapshot(&[hold("Alice", "h9", "Ready")], "Alice", day(3))
        .unwrap();
    assert_eq!(rows[0].id, 3);
}

#[test]
fn test_cycle_rows_share_one_timestamp() {
    let (_dir, tracker) = open_tracker();

    let items = [
        hold("Alice", "h1", "Ready"),
        hold("Alice", "h2", "In transit"),
        checkout("Alice", "c1", "2024-12-20"),
    ];
    let rows = tracker
        .snapshots()
        .record_snapshot(&items, "Alice", day(4))
        .unwrap();

    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.scraped_at == day(4)));
    let ids: Vec<u64> = rows.iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let history = tracker.snapshots().history("h2").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].state.as_str(), "hold_transit");
}

#[test]
fn test_snapshot_rows_are_immutable_history() {
    let (_dir, tracker) = open_tracker();

    tracker
        .observe_cycle("Alice", &[hold("Alice", "h1", "#2 in line")], day(1))
        .unwrap();
    tracker
        .observe_cycle("Alice", &[hold("Alice", "h1", "Ready")], day(2))
        .unwrap();

    let history = tracker.snapshots().history("h1").unwrap();
    let states: Vec<&str> = history.iter().map(|row| row.state.as_str()).collect();
    assert_eq!(states, vec!["hold_waiting", "hold_ready"]);
}
