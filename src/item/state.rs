//! Item states and provider status normalization

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of an observed item.
///
/// An item missing from a cycle has no state; absence is modelled with
/// `Option<ItemState>` on transitions, never as a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    CheckedOut,
    HoldWaiting,
    HoldTransit,
    HoldReady,
    HoldPaused,
}

impl ItemState {
    pub const ALL: [ItemState; 5] = [
        ItemState::CheckedOut,
        ItemState::HoldWaiting,
        ItemState::HoldTransit,
        ItemState::HoldReady,
        ItemState::HoldPaused,
    ];

    /// Returns the persisted name
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::CheckedOut => "checked_out",
            ItemState::HoldWaiting => "hold_waiting",
            ItemState::HoldTransit => "hold_transit",
            ItemState::HoldReady => "hold_ready",
            ItemState::HoldPaused => "hold_paused",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("unknown item state: {}", s))
    }
}

/// Whether the item is on loan or requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Checkout,
    Hold,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Checkout => "checkout",
            ItemKind::Hold => "hold",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a provider's free-text hold status to a state.
///
/// Case-insensitive and trimmed. Only whole-word `ready`/`available` count as
/// ready, so "Not ready" stays waiting. A missing status is waiting.
pub fn normalize_hold_status(status: Option<&str>) -> ItemState {
    let status = status.map(|s| s.trim().to_lowercase()).unwrap_or_default();

    match status.as_str() {
        "ready" | "available" => ItemState::HoldReady,
        "paused" => ItemState::HoldPaused,
        s if s.contains("transit") || s.contains("shipping") => ItemState::HoldTransit,
        _ => ItemState::HoldWaiting,
    }
}
