//! Snapshot row and cycle frame types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::index::RowId;
use crate::item::{ItemKind, ItemState, ObservedItem};

/// One observation of one item during one scrape cycle. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: RowId,
    pub item_id: String,
    pub patron_name: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub item_kind: ItemKind,
    pub format: Option<String>,
    pub state: ItemState,
    pub due_date: Option<String>,
    pub checkout_by: Option<String>,
    pub expires_on: Option<String>,
    pub queue_position: Option<u32>,
    pub scraped_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ItemSnapshot {
    /// Build the row for `item`, deriving its state.
    pub fn from_item(
        id: RowId,
        item: &ObservedItem,
        scraped_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut row = Self {
            id,
            item_id: item.item_id().to_string(),
            patron_name: item.patron_name().to_string(),
            title: item.title().to_string(),
            subtitle: None,
            author: None,
            item_kind: item.kind(),
            format: item.media_format().map(str::to_string),
            state: item.state(),
            due_date: None,
            checkout_by: None,
            expires_on: None,
            queue_position: None,
            scraped_at,
            created_at,
        };

        match item {
            ObservedItem::Checkout(c) => {
                row.subtitle = c.subtitle.clone();
                row.author = c.author.clone();
                row.due_date = c.due_date.clone();
            }
            ObservedItem::Hold(h) => {
                row.subtitle = h.subtitle.clone();
                row.author = h.author.clone();
                row.checkout_by = h.checkout_by.clone();
                row.expires_on = h.expires_on.clone();
                row.queue_position = h.queue_position;
            }
        }

        row
    }
}

/// Body of a `SnapshotCycle` frame. `rows` may be empty: the cycle still
/// happened and still counts as a baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SnapshotCycleFrame {
    pub patron_name: String,
    pub scraped_at: DateTime<Utc>,
    pub rows: Vec<ItemSnapshot>,
}
