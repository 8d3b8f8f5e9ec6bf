//! Normalized records delivered by the scraper for one patron per cycle

use serde::{Deserialize, Serialize};

use super::fingerprint::item_fingerprint;
use super::state::{normalize_hold_status, ItemKind, ItemState};

/// An item currently on loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRecord {
    #[serde(default)]
    pub item_id: String,
    pub patron_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Media type as listed by the library ("Book", "eBook", "DVD", ...)
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

/// An item requested by the patron.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldRecord {
    #[serde(default)]
    pub item_id: String,
    pub patron_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// Free-text status as shown on the holds page
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub checkout_by: Option<String>,
    #[serde(default)]
    pub expires_on: Option<String>,
    #[serde(default)]
    pub queue_position: Option<u32>,
}

/// One observed item, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "item_kind", rename_all = "snake_case")]
pub enum ObservedItem {
    Checkout(CheckoutRecord),
    Hold(HoldRecord),
}

impl ObservedItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            ObservedItem::Checkout(_) => ItemKind::Checkout,
            ObservedItem::Hold(_) => ItemKind::Hold,
        }
    }

    pub fn item_id(&self) -> &str {
        match self {
            ObservedItem::Checkout(c) => &c.item_id,
            ObservedItem::Hold(h) => &h.item_id,
        }
    }

    pub fn patron_name(&self) -> &str {
        match self {
            ObservedItem::Checkout(c) => &c.patron_name,
            ObservedItem::Hold(h) => &h.patron_name,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ObservedItem::Checkout(c) => &c.title,
            ObservedItem::Hold(h) => &h.title,
        }
    }

    /// Media format used for classification.
    ///
    /// Prefers the explicit `format` and falls back to the listed `type`,
    /// which is where the library puts "eBook" / "eAudiobook".
    pub fn media_format(&self) -> Option<&str> {
        let (format, item_type) = match self {
            ObservedItem::Checkout(c) => (&c.format, &c.item_type),
            ObservedItem::Hold(h) => (&h.format, &h.item_type),
        };
        format.as_deref().or(item_type.as_deref())
    }

    /// State derived at write time. Checkouts are always `checked_out`.
    pub fn state(&self) -> ItemState {
        match self {
            ObservedItem::Checkout(_) => ItemState::CheckedOut,
            ObservedItem::Hold(h) => normalize_hold_status(h.status.as_deref()),
        }
    }

    /// Fill an empty `item_id` from title, author and patron.
    pub fn ensure_item_id(&mut self) {
        let (id, title, author, patron) = match self {
            ObservedItem::Checkout(c) => (&mut c.item_id, &c.title, &c.author, &c.patron_name),
            ObservedItem::Hold(h) => (&mut h.item_id, &h.title, &h.author, &h.patron_name),
        };
        if id.is_empty() {
            *id = item_fingerprint(title, author.as_deref().unwrap_or(""), patron);
        }
    }
}

impl From<CheckoutRecord> for ObservedItem {
    fn from(record: CheckoutRecord) -> Self {
        ObservedItem::Checkout(record)
    }
}

impl From<HoldRecord> for ObservedItem {
    fn from(record: HoldRecord) -> Self {
        ObservedItem::Hold(record)
    }
}

/// The scraper's payload for one cycle: all checkouts and holds it saw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeBatch {
    #[serde(default)]
    pub checkouts: Vec<CheckoutRecord>,
    #[serde(default)]
    pub holds: Vec<HoldRecord>,
}

impl ScrapeBatch {
    /// Flatten into observed items, checkouts first, filling missing ids.
    pub fn into_items(self) -> Vec<ObservedItem> {
        self.checkouts
            .into_iter()
            .map(ObservedItem::from)
            .chain(self.holds.into_iter().map(ObservedItem::from))
            .map(|mut item| {
                item.ensure_item_id();
                item
            })
            .collect()
    }
}
