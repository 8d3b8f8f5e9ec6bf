//! Secondary indexes for the in-memory tables
//!
//! Indexes are rebuilt from the store file on open and maintained on every
//! committed batch. They never outlive the table they index.

mod btree;

pub use btree::{IndexTree, RowId};
