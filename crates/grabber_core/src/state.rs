use std::fmt;

use serde::Serialize;

/// Non-terminal stages an item passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStage {
    Pending,
    Fetching,
    Fetched,
    Normalizing,
    Normalized,
    Writing,
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemStage::Pending => "pending",
            ItemStage::Fetching => "fetching",
            ItemStage::Fetched => "fetched",
            ItemStage::Normalizing => "normalizing",
            ItemStage::Normalized => "normalized",
            ItemStage::Writing => "writing",
        };
        f.write_str(name)
    }
}

/// Terminal state of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Saved,
    Skipped,
    Failed,
}

/// A failed item with enough context for a manual retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub url: String,
    pub label: String,
    /// Stage the item was in when it failed.
    pub stage: ItemStage,
    pub reason: String,
}
