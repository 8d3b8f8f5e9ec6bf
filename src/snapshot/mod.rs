//! Snapshot Store
//!
//! Persists one immutable row per item per scrape cycle per patron and
//! answers "what was observed last time".
//!
//! # Invariants
//!
//! - Rows are never mutated; only an explicit retention pass removes them
//! - All rows of one `(patron, scraped_at)` cycle become visible together
//! - Cycles of one patron are totally ordered by `scraped_at`

mod row;
mod store;

pub use row::ItemSnapshot;
pub use store::{SnapshotStore, SNAPSHOTS_FILE};
