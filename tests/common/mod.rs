//! Shared builders for integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use shelfwatch::{CheckoutRecord, HoldRecord, ObservedItem, Tracker};
use tempfile::TempDir;

pub fn open_tracker() -> (TempDir, Tracker) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let tracker = Tracker::open_dir(dir.path()).expect("Failed to open tracker");
    (dir, tracker)
}

/// 2024-12-`day` 08:00 UTC
pub fn day(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, day, 8, 0, 0).unwrap()
}

/// One second before `at`, for exclusive report windows.
pub fn just_before(at: DateTime<Utc>) -> DateTime<Utc> {
    at - Duration::seconds(1)
}

pub fn hold(patron: &str, item_id: &str, status: &str) -> ObservedItem {
    ObservedItem::Hold(HoldRecord {
        item_id: item_id.into(),
        patron_name: patron.into(),
        title: format!("Title {}", item_id),
        subtitle: None,
        author: Some("Author".into()),
        item_type: Some("Book".into()),
        format: None,
        status: Some(status.into()),
        checkout_by: None,
        expires_on: None,
        queue_position: None,
    })
}

pub fn digital_hold(patron: &str, item_id: &str, status: &str) -> ObservedItem {
    let mut item = hold(patron, item_id, status);
    if let ObservedItem::Hold(ref mut h) = item {
        h.format = Some("eBook".into());
    }
    item
}

pub fn checkout(patron: &str, item_id: &str, due_date: &str) -> ObservedItem {
    ObservedItem::Checkout(CheckoutRecord {
        item_id: item_id.into(),
        patron_name: patron.into(),
        title: format!("Title {}", item_id),
        subtitle: None,
        author: Some("Author".into()),
        item_type: Some("Book".into()),
        format: None,
        due_date: Some(due_date.into()),
    })
}
