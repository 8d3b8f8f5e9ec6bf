//! shelfwatch - library account item lifecycle tracking
//!
//! Records every checkout and hold a scraper observes for a patron, one
//! immutable snapshot per cycle, and classifies how items move between
//! cycles: appearing, changing state, or disappearing. Disappearances and
//! state changes that do not fit a normal library workflow are flagged as
//! unexpected for alerting.
//!
//! ```ignore
//! use shelfwatch::{Tracker, ScrapeBatch};
//!
//! let tracker = Tracker::open_dir(Path::new("/var/lib/shelfwatch"))?;
//! let outcome = tracker.observe_cycle("Alice", &batch.into_items(), Utc::now())?;
//! let missing = tracker.reports().get_missing_items_report(30)?;
//! tracker.close()?;
//! ```

pub mod cli;
pub mod config;
pub mod index;
pub mod item;
pub mod observability;
pub mod report;
pub mod retention;
pub mod snapshot;
pub mod storage;
pub mod tracker;
pub mod transition;

pub use config::Config;
pub use item::{CheckoutRecord, HoldRecord, ItemState, ObservedItem, ScrapeBatch};
pub use report::{MissingItem, MissingItemsEvent, ReportQueries};
pub use retention::{RetentionOutcome, RetentionPolicy};
pub use snapshot::{ItemSnapshot, SnapshotStore};
pub use tracker::{CycleOutcome, Tracker, TrackerError, TrackerResult};
pub use transition::{ItemTransition, TransitionKind, TransitionStore};
