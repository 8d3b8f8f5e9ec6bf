//! Append-only frame storage shared by the snapshot and transition stores
//!
//! # Design Principles
//!
//! - Append-only (no in-place updates)
//! - One frame per batch, so a batch is written and observed as a unit
//! - Checksum-verified on every read
//! - Corruption halts the open; it is never skipped

mod checksum;
mod errors;
mod reader;
mod record;
mod writer;

pub use checksum::compute_checksum;
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use reader::FrameReader;
pub use record::{Frame, FrameKind};
pub use writer::FrameWriter;
