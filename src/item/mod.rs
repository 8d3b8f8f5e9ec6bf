//! Item domain model
//!
//! Inbound records from the scraper, the state they normalize to, and the
//! identity rule that ties observations of one item across cycles.

mod due_date;
mod fingerprint;
mod record;
mod state;

pub use due_date::parse_due_date;
pub use fingerprint::{item_fingerprint, FINGERPRINT_LEN};
pub use record::{CheckoutRecord, HoldRecord, ObservedItem, ScrapeBatch};
pub use state::{normalize_hold_status, ItemKind, ItemState};
