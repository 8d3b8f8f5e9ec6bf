//! Concurrent cycles
//!
//! Different patrons run in parallel against one tracker; cycles of the same
//! patron are serialized.

mod common;

use std::sync::Arc;
use std::thread;

use chrono::Duration;
use common::{day, hold, just_before, open_tracker};

#[test]
fn test_parallel_patrons_do_not_interfere() {
    let (dir, tracker) = open_tracker();
    let tracker = Arc::new(tracker);
    let patrons = ["Alice", "Bob", "Carol", "Dave"];

    let handles: Vec<_> = patrons
        .iter()
        .map(|patron| {
            let tracker = Arc::clone(&tracker);
            let patron = patron.to_string();
            thread::spawn(move || {
                let items = [
                    hold(&patron, &format!("{}-1", patron), "Ready"),
                    hold(&patron, &format!("{}-2", patron), "Ready"),
                ];
                tracker.observe_cycle(&patron, &items, day(1)).unwrap();
                tracker.observe_cycle(&patron, &items[..1], day(2)).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let outcome = handle.join().unwrap();
        assert_eq!(outcome.transitions.len(), 1);
        assert_eq!(
            outcome.transitions[0].item_id,
            format!("{}-2", outcome.patron_name)
        );
    }

    assert_eq!(tracker.snapshots().len().unwrap(), 12);
    assert_eq!(tracker.transitions().len().unwrap(), 4);

    let events = tracker
        .reports()
        .get_missing_items_report_since(just_before(day(1)))
        .unwrap();
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| e.total_missing == 1));

    drop(tracker);
    let reopened = shelfwatch::Tracker::open_dir(dir.path()).unwrap();
    assert_eq!(reopened.snapshots().len().unwrap(), 12);
    assert_eq!(reopened.transitions().len().unwrap(), 4);
}

#[test]
fn test_same_patron_cycles_are_serialized() {
    let (_dir, tracker) = open_tracker();
    let tracker = Arc::new(tracker);

    tracker
        .observe_cycle("Alice", &[hold("Alice", "h1", "Ready")], day(1))
        .unwrap();

    // Every cycle sees the same items, so however the cycles interleave no
    // transition may be produced.
    let handles: Vec<_> = (1..=8)
        .map(|n| {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                let at = day(1) + Duration::minutes(n);
                tracker
                    .observe_cycle("Alice", &[hold("Alice", "h1", "Ready")], at)
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().transitions.is_empty());
    }

    assert_eq!(tracker.snapshots().cycle_count("Alice").unwrap(), 9);
    assert!(tracker.transitions().is_empty().unwrap());
    assert_eq!(tracker.metrics().cycles_observed, 9);
}
